// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command composition from partial intents.
//!
//! The [`CommandComposer`] keeps a shadow copy of the last command it
//! produced. Partial intents are folded onto that shadow state, so every
//! published command carries both actuator values and means the same thing
//! no matter how many times it is delivered.
//!
//! The shadow state is independent of what the node reports: relays may lag
//! behind or ignore a command, and that must not change what "leave the light
//! alone" means for the next intent.

use crate::types::{CommandIntent, OutgoingCommand};

/// Builds outgoing commands from operator intents.
///
/// # Examples
///
/// ```
/// use aquactl::CommandComposer;
/// use aquactl::types::{CommandIntent, OutgoingCommand};
///
/// let mut composer = CommandComposer::new();
///
/// assert_eq!(composer.resolve(CommandIntent::pump(true)), OutgoingCommand::new(true, false));
/// assert_eq!(composer.resolve(CommandIntent::light(true)), OutgoingCommand::new(true, true));
/// assert_eq!(composer.bulk_set(false, false), OutgoingCommand::new(false, false));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandComposer {
    last_sent: OutgoingCommand,
    has_sent: bool,
}

impl CommandComposer {
    /// Creates a composer whose shadow state is pump off, light off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `intent` onto the shadow state and returns the resulting command.
    ///
    /// Fields absent from the intent keep their last-sent value. An empty
    /// intent returns the unchanged command.
    pub fn resolve(&mut self, intent: CommandIntent) -> OutgoingCommand {
        self.remember(self.last_sent.merge(intent))
    }

    /// Overwrites both actuator values.
    pub fn bulk_set(&mut self, pump: bool, light: bool) -> OutgoingCommand {
        self.remember(OutgoingCommand::new(pump, light))
    }

    /// Flips the pump relative to the last-sent command.
    pub fn toggle_pump(&mut self) -> OutgoingCommand {
        self.resolve(CommandIntent::pump(!self.last_sent.pump))
    }

    /// Flips the light relative to the last-sent command.
    pub fn toggle_light(&mut self) -> OutgoingCommand {
        self.resolve(CommandIntent::light(!self.last_sent.light))
    }

    /// Returns the shadow state.
    #[must_use]
    pub fn last_sent(&self) -> OutgoingCommand {
        self.last_sent
    }

    /// Returns `true` once any command has been composed.
    #[must_use]
    pub fn has_sent(&self) -> bool {
        self.has_sent
    }

    fn remember(&mut self, command: OutgoingCommand) -> OutgoingCommand {
        self.last_sent = command;
        self.has_sent = true;
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_shadow_state_is_all_off() {
        let composer = CommandComposer::new();
        assert_eq!(composer.last_sent(), OutgoingCommand::new(false, false));
        assert!(!composer.has_sent());
    }

    #[test]
    fn partial_update_preserves_other_field() {
        let mut composer = CommandComposer::new();
        assert_eq!(
            composer.resolve(CommandIntent::pump(true)),
            OutgoingCommand::new(true, false)
        );
        assert_eq!(
            composer.resolve(CommandIntent::light(true)),
            OutgoingCommand::new(true, true)
        );
        assert!(composer.has_sent());
    }

    #[test]
    fn resolve_is_idempotent() {
        let intents = [
            CommandIntent::pump(true),
            CommandIntent::light(false),
            CommandIntent::both(false, true),
            CommandIntent::new(),
        ];

        let mut composer = CommandComposer::new();
        for intent in intents {
            let first = composer.resolve(intent);
            let state = composer.last_sent();
            let second = composer.resolve(intent);
            assert_eq!(first, second);
            assert_eq!(composer.last_sent(), state);
        }
    }

    #[test]
    fn empty_intent_republishes_shadow_state() {
        let mut composer = CommandComposer::new();
        composer.bulk_set(true, false);
        assert_eq!(
            composer.resolve(CommandIntent::new()),
            OutgoingCommand::new(true, false)
        );
    }

    #[test]
    fn bulk_set_ignores_history() {
        let mut composer = CommandComposer::new();
        composer.resolve(CommandIntent::pump(false));
        composer.resolve(CommandIntent::light(false));

        assert_eq!(composer.bulk_set(true, true), OutgoingCommand::new(true, true));
        assert_eq!(composer.bulk_set(true, true), OutgoingCommand::new(true, true));
        assert_eq!(composer.last_sent(), OutgoingCommand::new(true, true));
    }

    #[test]
    fn toggles_follow_shadow_state() {
        let mut composer = CommandComposer::new();
        assert_eq!(composer.toggle_pump(), OutgoingCommand::new(true, false));
        assert_eq!(composer.toggle_light(), OutgoingCommand::new(true, true));
        assert_eq!(composer.toggle_pump(), OutgoingCommand::new(false, true));
    }
}
