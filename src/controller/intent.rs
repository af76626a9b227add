// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operator intents.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::types::CommandIntent;

/// One operator request handled by the controller loop.
///
/// # Parsing
///
/// Intents parse from the console menu keys or from short phrases:
///
/// | Input | Intent |
/// |-------|--------|
/// | `1`, `pump` | [`TogglePump`](Self::TogglePump) |
/// | `2`, `light` | [`ToggleLight`](Self::ToggleLight) |
/// | `3`, `on` | [`AllOn`](Self::AllOn) |
/// | `4`, `off` | [`AllOff`](Self::AllOff) |
/// | `5`, `refresh` | [`Refresh`](Self::Refresh) |
/// | `0`, `exit`, `quit` | [`Exit`](Self::Exit) |
/// | `pump on`, `light off`, ... | [`Set`](Self::Set) |
///
/// ```
/// use aquactl::controller::Intent;
/// use aquactl::types::CommandIntent;
///
/// assert_eq!("1".parse::<Intent>().unwrap(), Intent::TogglePump);
/// assert_eq!("light off".parse::<Intent>().unwrap(), Intent::Set(CommandIntent::light(false)));
/// assert!("7".parse::<Intent>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Flip the pump relative to the last command sent.
    TogglePump,
    /// Flip the light relative to the last command sent.
    ToggleLight,
    /// Turn both actuators on.
    AllOn,
    /// Turn both actuators off.
    AllOff,
    /// Apply an explicit partial update.
    Set(CommandIntent),
    /// Report the current status again.
    Refresh,
    /// Leave the controller loop.
    Exit,
}

impl Intent {
    /// Returns `true` if handling this intent publishes a command.
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::TogglePump | Self::ToggleLight | Self::AllOn | Self::AllOff | Self::Set(_)
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TogglePump => f.write_str("toggle pump"),
            Self::ToggleLight => f.write_str("toggle light"),
            Self::AllOn => f.write_str("all on"),
            Self::AllOff => f.write_str("all off"),
            Self::Set(intent) => write!(f, "set {intent:?}"),
            Self::Refresh => f.write_str("refresh"),
            Self::Exit => f.write_str("exit"),
        }
    }
}

/// Input that does not name an intent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized intent: {0:?}")]
pub struct ParseIntentError(String);

impl FromStr for Intent {
    type Err = ParseIntentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_lowercase();
        let words: Vec<&str> = input.split_whitespace().collect();

        let intent = match words.as_slice() {
            ["1" | "pump"] => Self::TogglePump,
            ["2" | "light"] => Self::ToggleLight,
            ["3" | "on"] => Self::AllOn,
            ["4" | "off"] => Self::AllOff,
            ["5" | "refresh" | "status"] => Self::Refresh,
            ["0" | "exit" | "quit"] => Self::Exit,
            [actuator, state] => {
                let on = parse_on_off(state).ok_or_else(|| ParseIntentError(s.to_string()))?;
                match *actuator {
                    "pump" => Self::Set(CommandIntent::pump(on)),
                    "light" => Self::Set(CommandIntent::light(on)),
                    _ => return Err(ParseIntentError(s.to_string())),
                }
            }
            _ => return Err(ParseIntentError(s.to_string())),
        };
        Ok(intent)
    }
}

fn parse_on_off(word: &str) -> Option<bool> {
    match word {
        "on" | "1" | "true" => Some(true),
        "off" | "0" | "false" => Some(false),
        _ => None,
    }
}
