// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker transport and inbound routing.
//!
//! The node and its controllers talk over two topics under a common prefix:
//!
//! - `<prefix>/status`: node → controllers, periodic [`DeviceStatus`] documents
//! - `<prefix>/cmd`: controllers → node, [`OutgoingCommand`] documents
//!
//! [`Transport`] is the seam between the controller loop and the broker.
//! [`MqttTransport`] implements it over `rumqttc`; tests substitute their own.
//! Inbound messages are handed to a callback, normally
//! [`StatusRouter::handler`], which decodes and stores status updates.
//!
//! [`DeviceStatus`]: crate::types::DeviceStatus
//! [`OutgoingCommand`]: crate::types::OutgoingCommand

#[cfg(feature = "mqtt")]
mod mqtt;
mod status_router;

#[cfg(feature = "mqtt")]
pub use mqtt::MqttTransport;
pub use status_router::StatusRouter;

use crate::error::ProtocolError;

/// Topic prefix used by the deployed node firmware.
pub const DEFAULT_TOPIC_PREFIX: &str = "aquaponics";

/// Status and command topic names.
///
/// # Examples
///
/// ```
/// use aquactl::protocol::Topics;
///
/// let topics = Topics::default();
/// assert_eq!(topics.status(), "aquaponics/status");
/// assert_eq!(topics.command(), "aquaponics/cmd");
///
/// let topics = Topics::new("device");
/// assert_eq!(topics.status(), "device/status");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    status: String,
    command: String,
}

impl Topics {
    /// Builds the topic pair under `prefix`.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            status: format!("{prefix}/status"),
            command: format!("{prefix}/cmd"),
        }
    }

    /// Topic the node publishes status on.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Topic the node listens for commands on.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_PREFIX)
    }
}

/// Connection state reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the broker to accept the connection.
    Connecting,
    /// Connected and subscribed.
    Connected,
    /// The connection is gone and will not come back.
    Disconnected,
}

/// A publish/subscribe connection the controller loop can drive.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Publishes `payload` on `topic` without waiting for any reply.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message could not be handed to the broker.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ProtocolError>;

    /// Resolves once the connection has been lost.
    async fn closed(&self);

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the disconnect request could not be sent.
    async fn disconnect(&self) -> Result<(), ProtocolError>;
}
