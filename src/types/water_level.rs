// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Water level reading.

use std::fmt;

use serde::Serialize;

/// Water level as reported by the node's float switch.
///
/// Firmware revisions disagree on the wire type of the `water` field: some
/// publish a label (`"Đầy"`, `"Thấp"`, `"full"`, `"low"`), others publish the
/// raw switch state as a boolean. Both are kept as received so nothing is lost
/// in translation; an absent reading is `None` around this type.
///
/// # Examples
///
/// ```
/// use aquactl::types::WaterLevel;
///
/// let level = WaterLevel::Text("Thấp".to_string());
/// assert_eq!(level.is_low(), Some(true));
///
/// let level = WaterLevel::Flag(true);
/// assert_eq!(level.is_low(), Some(false));
///
/// let level = WaterLevel::Text("half".to_string());
/// assert_eq!(level.is_low(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum WaterLevel {
    /// A textual label.
    Text(String),
    /// The raw float switch state (`true` = water present).
    Flag(bool),
}

impl WaterLevel {
    /// Interprets the reading as low/not-low when the label is a known one.
    ///
    /// Returns `None` for labels outside the known vocabulary.
    #[must_use]
    pub fn is_low(&self) -> Option<bool> {
        match self {
            Self::Flag(present) => Some(!present),
            Self::Text(label) => {
                let label = label.trim().to_lowercase();
                match label.as_str() {
                    "low" | "thấp" | "empty" => Some(true),
                    "full" | "đầy" | "ok" => Some(false),
                    _ => None,
                }
            }
        }
    }

    /// Returns the label if this is a textual reading.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(label) => Some(label),
            Self::Flag(_) => None,
        }
    }

    /// Returns the switch state if this is a boolean reading.
    #[must_use]
    pub const fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(present) => Some(*present),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for WaterLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(label) => f.write_str(label),
            Self::Flag(present) => write!(f, "{present}"),
        }
    }
}

impl From<bool> for WaterLevel {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for WaterLevel {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
