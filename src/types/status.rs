// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device status snapshot.

use serde::Serialize;

use super::WaterLevel;

/// A point-in-time snapshot published by the node on its status topic.
///
/// Every field is optional: a field the node did not report (or reported
/// with an unusable type) is unknown, not `false` or zero. A snapshot is
/// always complete on its own and is never merged with an earlier one.
///
/// # Examples
///
/// ```
/// use aquactl::types::DeviceStatus;
///
/// let status = DeviceStatus::new().with_temperature(25.5).with_pump_on(true);
///
/// assert_eq!(status.temperature, Some(25.5));
/// assert_eq!(status.pump_on, Some(true));
/// assert_eq!(status.humidity, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceStatus {
    /// Water temperature in °C (`temp`).
    #[serde(rename = "temp", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Relative humidity in % (`humidity`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,

    /// Float switch reading (`water`).
    #[serde(rename = "water", skip_serializing_if = "Option::is_none")]
    pub water_level: Option<WaterLevel>,

    /// Pump relay state (`pump`).
    #[serde(rename = "pump", skip_serializing_if = "Option::is_none")]
    pub pump_on: Option<bool>,

    /// Grow light relay state (`light`).
    #[serde(rename = "light", skip_serializing_if = "Option::is_none")]
    pub light_on: Option<bool>,
}

impl DeviceStatus {
    /// Creates an empty snapshot with every field unknown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temperature = Some(celsius);
        self
    }

    /// Sets the humidity.
    #[must_use]
    pub fn with_humidity(mut self, percent: f64) -> Self {
        self.humidity = Some(percent);
        self
    }

    /// Sets the water level.
    #[must_use]
    pub fn with_water_level(mut self, level: impl Into<WaterLevel>) -> Self {
        self.water_level = Some(level.into());
        self
    }

    /// Sets the pump relay state.
    #[must_use]
    pub fn with_pump_on(mut self, on: bool) -> Self {
        self.pump_on = Some(on);
        self
    }

    /// Sets the light relay state.
    #[must_use]
    pub fn with_light_on(mut self, on: bool) -> Self {
        self.light_on = Some(on);
        self
    }

    /// Returns `true` if no field is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.humidity.is_none()
            && self.water_level.is_none()
            && self.pump_on.is_none()
            && self.light_on.is_none()
    }
}
