// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `aquactl` library.
//!
//! Errors are split by how far they travel:
//!
//! - [`DecodeError`] is raised by the codec and swallowed by the inbound
//!   path after being logged; it never reaches the controller loop.
//! - [`ProtocolError`] covers broker connection and publishing. Connection
//!   loss ends a controller session, a failed publish does not.
//! - [`ConfigError`] is raised while loading settings, before any connection
//!   exists.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error occurred during broker communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while decoding a message payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not well-formed JSON.
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is valid JSON but not a key-value document.
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Errors related to broker communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT client request failed (publish, subscribe, disconnect).
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection was lost.
    #[error("disconnected from broker")]
    Disconnected,

    /// Publishing a message failed.
    #[error("publish to {topic} failed: {message}")]
    PublishFailed {
        /// The topic that was being published to.
        topic: String,
        /// Description of the failure.
        message: String,
    },
}

/// Errors raised while loading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable holds a value that cannot be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// The variable name.
        key: String,
        /// The rejected value.
        value: String,
    },

    /// A required setting is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
