// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Routing of inbound messages into the status store.
//!
//! ```text
//! MQTT message: aquaponics/status → {"temp":25.5,"pump":true}
//!                     ↓
//!             StatusRouter.route()
//!                     ↓
//!             codec::decode_status()
//!            ↙                     ↘
//!     Err: log + DecodeFailed     Ok: StatusStore.apply_status()
//!     (store untouched)                 ↓
//!                               StatusReceived (+ Divergence)
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::codec;
use crate::event::{ControllerEvent, EventBus};
use crate::state::StatusStore;
use crate::types::{DeviceStatus, OutgoingCommand};

use super::Topics;

/// Decodes inbound status messages and applies them to a [`StatusStore`].
///
/// The router is the store's only writer. It runs on the transport's
/// delivery task and never waits on anything but the store's short lock.
#[derive(Debug)]
pub struct StatusRouter {
    topics: Topics,
    store: Arc<StatusStore>,
    bus: EventBus,
    /// Last command this controller published, for the divergence check.
    last_command: RwLock<Option<OutgoingCommand>>,
}

impl StatusRouter {
    /// Creates a router writing to `store` and reporting on `bus`.
    #[must_use]
    pub fn new(topics: Topics, store: Arc<StatusStore>, bus: EventBus) -> Self {
        Self {
            topics,
            store,
            bus,
            last_command: RwLock::new(None),
        }
    }

    /// Returns the topics this router handles.
    #[must_use]
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Returns the store this router writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    /// Returns the bus this router reports on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Records a command as published so later status can be compared with it.
    pub fn note_command(&self, command: OutgoingCommand) {
        *self.last_command.write() = Some(command);
    }

    /// Routes one inbound message.
    ///
    /// Returns `true` if the message was a status that got stored.
    pub fn route(&self, topic: &str, payload: &[u8]) -> bool {
        if topic == self.topics.status() {
            return self.route_status(topic, payload);
        }

        if topic == self.topics.command() {
            match codec::decode_command(payload) {
                Ok(intent) => {
                    tracing::debug!(topic = %topic, ?intent, "Observed command");
                    self.bus.publish(ControllerEvent::CommandObserved { intent });
                }
                Err(e) => {
                    tracing::debug!(topic = %topic, error = %e, "Ignoring undecodable command");
                }
            }
            return false;
        }

        tracing::trace!(topic = %topic, "Ignoring message on unhandled topic");
        false
    }

    /// Returns a callback suitable for [`MqttTransport::connect`].
    ///
    /// [`MqttTransport::connect`]: super::MqttTransport::connect
    #[must_use]
    pub fn handler(self: &Arc<Self>) -> impl Fn(&str, &[u8]) + Send + Sync + 'static {
        let router = Arc::clone(self);
        move |topic: &str, payload: &[u8]| {
            router.route(topic, payload);
        }
    }

    fn route_status(&self, topic: &str, payload: &[u8]) -> bool {
        let status = match codec::decode_status(payload) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    topic = %topic,
                    payload = %String::from_utf8_lossy(payload),
                    error = %e,
                    "Dropping malformed status"
                );
                self.bus.publish(ControllerEvent::DecodeFailed {
                    topic: topic.to_string(),
                    error: e.to_string(),
                });
                return false;
            }
        };

        if let Some(expected) = *self.last_command.read()
            && diverges(&status, expected)
        {
            tracing::debug!(
                %expected,
                pump_on = ?status.pump_on,
                light_on = ?status.light_on,
                "Reported relay state differs from last command"
            );
            self.bus.publish(ControllerEvent::Divergence {
                expected,
                pump_on: status.pump_on,
                light_on: status.light_on,
            });
        }

        let snapshot = self.store.apply_status(status);
        tracing::debug!(
            topic = %topic,
            revision = snapshot.revision(),
            "Status updated"
        );
        self.bus.publish(ControllerEvent::StatusReceived { snapshot });
        true
    }
}

/// Unknown relay states never count as divergent.
fn diverges(status: &DeviceStatus, expected: OutgoingCommand) -> bool {
    status.pump_on.is_some_and(|on| on != expected.pump)
        || status.light_on.is_some_and(|on| on != expected.light)
}
