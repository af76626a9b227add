// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Actuator command types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A partial actuator update requested by an operator.
///
/// A missing field means "keep what was last sent", which is not the same
/// as "keep what the node last reported".
///
/// # Examples
///
/// ```
/// use aquactl::types::CommandIntent;
///
/// let intent = CommandIntent::pump(true);
/// assert_eq!(intent.pump, Some(true));
/// assert_eq!(intent.light, None);
/// assert!(!intent.is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandIntent {
    /// Desired pump state, if it should change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pump: Option<bool>,
    /// Desired light state, if it should change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<bool>,
}

impl CommandIntent {
    /// Creates an intent that changes nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pump: None,
            light: None,
        }
    }

    /// Creates an intent that only sets the pump.
    #[must_use]
    pub const fn pump(on: bool) -> Self {
        Self {
            pump: Some(on),
            light: None,
        }
    }

    /// Creates an intent that only sets the light.
    #[must_use]
    pub const fn light(on: bool) -> Self {
        Self {
            pump: None,
            light: Some(on),
        }
    }

    /// Creates an intent that sets both actuators.
    #[must_use]
    pub const fn both(pump: bool, light: bool) -> Self {
        Self {
            pump: Some(pump),
            light: Some(light),
        }
    }

    /// Returns `true` if the intent carries no field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pump.is_none() && self.light.is_none()
    }
}

/// The command document actually published to the node.
///
/// Both fields are always present so the node can act on any single
/// command without knowing what came before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutgoingCommand {
    /// Pump relay state.
    pub pump: bool,
    /// Light relay state.
    pub light: bool,
}

impl OutgoingCommand {
    /// Creates a command.
    #[must_use]
    pub const fn new(pump: bool, light: bool) -> Self {
        Self { pump, light }
    }

    /// Returns a copy with the fields present in `intent` overwritten.
    #[must_use]
    pub fn merge(self, intent: CommandIntent) -> Self {
        Self {
            pump: intent.pump.unwrap_or(self.pump),
            light: intent.light.unwrap_or(self.light),
        }
    }
}

impl fmt::Display for OutgoingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_off = |v: bool| if v { "ON" } else { "OFF" };
        write!(f, "pump={} light={}", on_off(self.pump), on_off(self.light))
    }
}

impl From<OutgoingCommand> for CommandIntent {
    fn from(command: OutgoingCommand) -> Self {
        Self::both(command.pump, command.light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_intent() {
        assert!(CommandIntent::new().is_empty());
        assert!(CommandIntent::default().is_empty());
        assert!(!CommandIntent::light(false).is_empty());
    }

    #[test]
    fn merge_overwrites_present_fields_only() {
        let base = OutgoingCommand::new(true, false);
        assert_eq!(
            base.merge(CommandIntent::light(true)),
            OutgoingCommand::new(true, true)
        );
        assert_eq!(base.merge(CommandIntent::new()), base);
        assert_eq!(
            base.merge(CommandIntent::both(false, false)),
            OutgoingCommand::new(false, false)
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            OutgoingCommand::new(true, false).to_string(),
            "pump=ON light=OFF"
        );
    }
}
