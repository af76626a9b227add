// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON codec for status and command payloads.
//!
//! Status payloads come from firmware that is loose about types, so decoding
//! is field-by-field: a field with an unexpected type is treated as unknown
//! and the rest of the document still decodes. Only a payload that is not a
//! JSON object at all is rejected.
//!
//! # Examples
//!
//! ```
//! use aquactl::codec::{decode_status, encode_command};
//! use aquactl::types::{OutgoingCommand, WaterLevel};
//!
//! let status = decode_status(br#"{"temp": 27.0, "water": true, "rssi": -61}"#).unwrap();
//! assert_eq!(status.temperature, Some(27.0));
//! assert_eq!(status.water_level, Some(WaterLevel::Flag(true)));
//!
//! let bytes = encode_command(&OutgoingCommand::new(true, false));
//! assert_eq!(bytes, br#"{"pump":true,"light":false}"#);
//! ```

use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::types::{CommandIntent, DeviceStatus, OutgoingCommand, WaterLevel};

/// Wire keys used in status documents.
mod keys {
    pub const TEMPERATURE: &str = "temp";
    pub const HUMIDITY: &str = "humidity";
    pub const WATER: &str = "water";
    pub const PUMP: &str = "pump";
    pub const LIGHT: &str = "light";
}

/// Decodes a status payload.
///
/// Unknown keys are ignored. A known key with an unusable type decodes as
/// unknown; `water` accepts both strings and booleans.
///
/// # Errors
///
/// Returns [`DecodeError`] if the payload is not a well-formed JSON object.
pub fn decode_status(payload: &[u8]) -> Result<DeviceStatus, DecodeError> {
    let doc = parse_object(payload)?;

    Ok(DeviceStatus {
        temperature: doc.get(keys::TEMPERATURE).and_then(Value::as_f64),
        humidity: doc.get(keys::HUMIDITY).and_then(Value::as_f64),
        water_level: doc.get(keys::WATER).and_then(water_level),
        pump_on: doc.get(keys::PUMP).and_then(Value::as_bool),
        light_on: doc.get(keys::LIGHT).and_then(Value::as_bool),
    })
}

/// Encodes a status snapshot, omitting unknown fields.
///
/// Used by simulators and tests that stand in for the node.
///
/// # Panics
///
/// Never panics: the status holds only strings, booleans and optional
/// numbers, which always serialize. Non-finite numbers become `null`.
#[must_use]
pub fn encode_status(status: &DeviceStatus) -> Vec<u8> {
    serde_json::to_vec(status).expect("DeviceStatus always serializes")
}

/// Encodes a command as `{"pump":<bool>,"light":<bool>}`.
///
/// # Panics
///
/// Never panics: a command is two booleans.
#[must_use]
pub fn encode_command(command: &OutgoingCommand) -> Vec<u8> {
    serde_json::to_vec(command).expect("OutgoingCommand always serializes")
}

/// Decodes a command payload seen on the command topic.
///
/// Missing or non-boolean fields decode as "unchanged".
///
/// # Errors
///
/// Returns [`DecodeError`] if the payload is not a well-formed JSON object.
pub fn decode_command(payload: &[u8]) -> Result<CommandIntent, DecodeError> {
    let doc = parse_object(payload)?;

    Ok(CommandIntent {
        pump: doc.get(keys::PUMP).and_then(Value::as_bool),
        light: doc.get(keys::LIGHT).and_then(Value::as_bool),
    })
}

fn parse_object(payload: &[u8]) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_slice::<Value>(payload)? {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(DecodeError::NotAnObject("array")),
        Value::String(_) => Err(DecodeError::NotAnObject("string")),
        Value::Number(_) => Err(DecodeError::NotAnObject("number")),
        Value::Bool(_) => Err(DecodeError::NotAnObject("boolean")),
        Value::Null => Err(DecodeError::NotAnObject("null")),
    }
}

fn water_level(value: &Value) -> Option<WaterLevel> {
    match value {
        Value::String(label) => Some(WaterLevel::Text(label.clone())),
        Value::Bool(flag) => Some(WaterLevel::Flag(*flag)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_full_status() {
        let payload =
            r#"{"temp":25.5,"humidity":65.0,"water":"Đầy","pump":false,"light":false}"#;
        let status = decode_status(payload.as_bytes()).unwrap();

        assert_eq!(
            status,
            DeviceStatus {
                temperature: Some(25.5),
                humidity: Some(65.0),
                water_level: Some(WaterLevel::Text("Đầy".to_string())),
                pump_on: Some(false),
                light_on: Some(false),
            }
        );
    }

    #[test]
    fn decode_boolean_water_level() {
        let status = decode_status(br#"{"water": true, "temp": 27.0}"#).unwrap();
        assert_eq!(status.water_level, Some(WaterLevel::Flag(true)));
        assert_eq!(status.temperature, Some(27.0));
        assert_eq!(status.pump_on, None);
    }

    #[test]
    fn decode_string_water_level() {
        let status = decode_status(r#"{"water": "Đầy"}"#.as_bytes()).unwrap();
        assert_eq!(status.water_level, Some(WaterLevel::from("Đầy")));
    }

    #[test]
    fn decode_integer_temperature() {
        let status = decode_status(br#"{"temp": 25}"#).unwrap();
        assert_eq!(status.temperature, Some(25.0));
    }

    #[test]
    fn mistyped_fields_become_unknown() {
        let status =
            decode_status(br#"{"temp":"hot","humidity":null,"water":3,"pump":1,"light":true}"#)
                .unwrap();

        assert_eq!(status.temperature, None);
        assert_eq!(status.humidity, None);
        assert_eq!(status.water_level, None);
        assert_eq!(status.pump_on, None);
        assert_eq!(status.light_on, Some(true));
    }

    #[test]
    fn unknown_keys_ignored() {
        let status = decode_status(br#"{"rssi":-70,"uptime":1234,"pump":true}"#).unwrap();
        assert_eq!(status, DeviceStatus::new().with_pump_on(true));
    }

    #[test]
    fn empty_object_decodes_to_empty_status() {
        assert!(decode_status(b"{}").unwrap().is_empty());
    }

    #[test]
    fn malformed_payload_fails() {
        let err = decode_status(b"not-json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));

        assert!(decode_status(br#"{"temp": 25"#).is_err());
        assert!(decode_status(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn non_object_payload_fails() {
        assert!(matches!(
            decode_status(b"[1,2]"),
            Err(DecodeError::NotAnObject("array"))
        ));
        assert!(matches!(
            decode_status(b"42"),
            Err(DecodeError::NotAnObject("number"))
        ));
        assert!(matches!(
            decode_status(b"null"),
            Err(DecodeError::NotAnObject("null"))
        ));
    }

    #[test]
    fn encode_command_has_both_fields() {
        let bytes = encode_command(&OutgoingCommand::new(false, true));
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, serde_json::json!({"pump": false, "light": true}));
    }

    #[test]
    fn decode_command_missing_fields_unchanged() {
        let intent = decode_command(br#"{"pump": true}"#).unwrap();
        assert_eq!(intent, CommandIntent::pump(true));

        let intent = decode_command(br#"{"pump": "yes", "light": false}"#).unwrap();
        assert_eq!(intent, CommandIntent::light(false));
    }

    #[test]
    fn encoded_status_decodes_to_same_snapshot() {
        let status = DeviceStatus::new()
            .with_temperature(26.5)
            .with_humidity(65.0)
            .with_water_level(true)
            .with_pump_on(true);

        assert_eq!(decode_status(&encode_status(&status)).unwrap(), status);
    }

    #[test]
    fn non_finite_reading_encodes_as_null() {
        let status = DeviceStatus::new().with_temperature(f64::NAN).with_light_on(true);
        assert_eq!(encode_status(&status), br#"{"temp":null,"light":true}"#);
    }
}
