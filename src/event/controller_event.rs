// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller event types.

use std::sync::Arc;

use crate::state::StatusSnapshot;
use crate::types::{CommandIntent, OutgoingCommand};

/// Events emitted by the status router and the controller loop.
///
/// # Examples
///
/// ```
/// use aquactl::event::ControllerEvent;
/// use aquactl::types::OutgoingCommand;
///
/// let event = ControllerEvent::CommandSent {
///     command: OutgoingCommand::new(true, false),
/// };
/// assert!(event.is_command());
/// assert!(!event.is_failure());
/// ```
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// Broker connection state changed.
    ConnectionChanged {
        /// Whether the transport is now connected.
        connected: bool,
        /// Error message if the connection was lost due to an error.
        error: Option<String>,
    },

    /// A status message was decoded and stored.
    StatusReceived {
        /// The stored snapshot.
        snapshot: Arc<StatusSnapshot>,
    },

    /// A status payload could not be decoded and was dropped.
    DecodeFailed {
        /// Topic the payload arrived on.
        topic: String,
        /// Decoder error message.
        error: String,
    },

    /// A command was seen on the command topic.
    ///
    /// This includes this controller's own commands echoed back by the broker
    /// and commands from other controllers of the same node.
    CommandObserved {
        /// The decoded command; missing fields decode as unchanged.
        intent: CommandIntent,
    },

    /// The reported relay states disagree with the last command sent.
    ///
    /// This is advisory: relays may simply not have switched yet.
    Divergence {
        /// The last command sent.
        expected: OutgoingCommand,
        /// Reported pump state.
        pump_on: Option<bool>,
        /// Reported light state.
        light_on: Option<bool>,
    },

    /// The controller is still waiting for the first status.
    AwaitingStatus,

    /// The first status arrived and the controller accepts intents.
    Ready {
        /// The snapshot that ended the wait.
        snapshot: Arc<StatusSnapshot>,
    },

    /// The operator asked to see the current status again.
    StatusRefreshed {
        /// The current snapshot.
        snapshot: Arc<StatusSnapshot>,
    },

    /// An intent was dropped without being dispatched.
    IntentRejected {
        /// Why it was dropped.
        reason: String,
    },

    /// A command was published.
    CommandSent {
        /// The published command.
        command: OutgoingCommand,
    },

    /// Publishing a command failed. The composer keeps the command as the
    /// desired state, so sending the same intent again is safe.
    PublishFailed {
        /// The command that was not delivered to the broker.
        command: OutgoingCommand,
        /// Transport error message.
        error: String,
    },
}

impl ControllerEvent {
    /// Returns `true` for command dispatch outcomes.
    #[must_use]
    pub fn is_command(&self) -> bool {
        matches!(self, Self::CommandSent { .. } | Self::PublishFailed { .. })
    }

    /// Returns `true` for events reporting something that went wrong.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::DecodeFailed { .. }
                | Self::PublishFailed { .. }
                | Self::IntentRejected { .. }
                | Self::ConnectionChanged {
                    connected: false,
                    ..
                }
        )
    }

    /// Returns the snapshot carried by this event, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<&Arc<StatusSnapshot>> {
        match self {
            Self::StatusReceived { snapshot }
            | Self::Ready { snapshot }
            | Self::StatusRefreshed { snapshot } => Some(snapshot),
            _ => None,
        }
    }

    /// Creates a connection lost event.
    #[must_use]
    pub fn disconnected(error: impl Into<String>) -> Self {
        Self::ConnectionChanged {
            connected: false,
            error: Some(error.into()),
        }
    }
}
