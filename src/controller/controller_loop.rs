// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The controller state machine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::codec;
use crate::composer::CommandComposer;
use crate::error::{ProtocolError, Result};
use crate::event::{ControllerEvent, EventBus};
use crate::protocol::{StatusRouter, Topics, Transport};
use crate::state::{StatusSnapshot, StatusStore};
use crate::types::OutgoingCommand;

use super::Intent;

/// Default interval between liveness ticks while awaiting the first status.
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(1);

/// Where the controller is in its lifecycle.
///
/// ```text
/// AwaitingFirstStatus ──status──▶ Ready ──intent──▶ Dispatching ──▶ Ready
///          │                        │
///          └──────── exit ──────────┴──────────▶ Exiting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// No status has been received yet; command intents are rejected.
    AwaitingFirstStatus,
    /// Accepting intents.
    Ready,
    /// Publishing a command.
    Dispatching,
    /// The loop has ended.
    Exiting,
}

/// Why [`Controller::run`] returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The operator sent [`Intent::Exit`].
    OperatorExit,
    /// The shutdown signal was raised.
    Shutdown,
    /// The intent channel was closed.
    InputClosed,
}

/// What handling a single intent did.
#[derive(Debug, Clone, PartialEq)]
pub enum IntentOutcome {
    /// A command was published.
    Sent(OutgoingCommand),
    /// The current snapshot was re-reported.
    Refreshed(Arc<StatusSnapshot>),
    /// The intent was dropped because no status has been received yet.
    Rejected,
    /// The operator asked to leave.
    Exit,
}

/// Ties the status store, the command composer and a transport together.
///
/// The controller owns its composer and transport handle; the store is
/// shared with the [`StatusRouter`] that fills it from the transport's
/// delivery task. Nothing is process-global, so several controllers can run
/// side by side and tests can drive one with a fake [`Transport`].
pub struct Controller<T> {
    transport: T,
    router: Arc<StatusRouter>,
    composer: CommandComposer,
    /// Last command whose publish failed, with the intent that produced it.
    undelivered: Option<(Intent, OutgoingCommand)>,
    state: ControllerState,
    liveness_interval: Duration,
}

impl<T: Transport> Controller<T> {
    /// Creates a controller publishing through `transport`.
    ///
    /// `router` must be the one feeding the transport's inbound callback.
    #[must_use]
    pub fn new(transport: T, router: Arc<StatusRouter>) -> Self {
        Self {
            transport,
            router,
            composer: CommandComposer::new(),
            undelivered: None,
            state: ControllerState::AwaitingFirstStatus,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
        }
    }

    /// Sets the interval between liveness ticks while awaiting the first status.
    #[must_use]
    pub fn with_liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Returns the status store.
    #[must_use]
    pub fn store(&self) -> &Arc<StatusStore> {
        self.router.store()
    }

    /// Returns the event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        self.router.bus()
    }

    /// Returns the topics in use.
    #[must_use]
    pub fn topics(&self) -> &Topics {
        self.router.topics()
    }

    /// Returns the command composer.
    #[must_use]
    pub fn composer(&self) -> &CommandComposer {
        &self.composer
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Handles one intent.
    ///
    /// Before the first status has arrived, everything except
    /// [`Intent::Exit`] is rejected.
    ///
    /// If the previous command failed to publish, repeating the intent that
    /// produced it re-sends that same command. A retried toggle therefore
    /// does not flip the actuator back.
    ///
    /// # Errors
    ///
    /// Returns the transport error if publishing the command failed. The
    /// composer keeps the command as the desired state either way.
    pub async fn handle(&mut self, intent: Intent) -> std::result::Result<IntentOutcome, ProtocolError> {
        self.sync_state();

        match intent {
            Intent::Exit => {
                tracing::info!("Exit requested");
                self.state = ControllerState::Exiting;
                return Ok(IntentOutcome::Exit);
            }
            _ if self.state != ControllerState::Ready => {
                tracing::warn!(%intent, state = ?self.state, "Rejecting intent before first status");
                self.events().publish(ControllerEvent::IntentRejected {
                    reason: format!("{intent}: no status received yet"),
                });
                return Ok(IntentOutcome::Rejected);
            }
            _ => {}
        }

        let Some(command) = self.compose(intent) else {
            return Ok(self.refresh());
        };

        let result = self.dispatch(command).await;
        if result.is_err() {
            self.undelivered = Some((intent, command));
        }
        result.map(|()| IntentOutcome::Sent(command))
    }

    /// Runs the loop until exit, shutdown, closed input or connection loss.
    ///
    /// The transport is disconnected before returning.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Disconnected` if the transport lost its
    /// connection.
    pub async fn run(
        &mut self,
        mut intents: mpsc::Receiver<Intent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ExitReason> {
        let result = self.drive(&mut intents, &mut shutdown).await;
        self.state = ControllerState::Exiting;

        match &result {
            Ok(reason) => tracing::info!(?reason, "Controller loop finished"),
            Err(e) => tracing::error!(error = %e, "Controller loop aborted"),
        }

        if let Err(e) = self.transport.disconnect().await {
            tracing::warn!(error = %e, "Disconnect failed");
        }
        result
    }

    async fn drive(
        &mut self,
        intents: &mut mpsc::Receiver<Intent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<ExitReason> {
        let mut status_rx = self.store().subscribe();
        let mut liveness = tokio::time::interval(self.liveness_interval);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_open = true;

        tracing::info!(
            status = %self.topics().status(),
            command = %self.topics().command(),
            "Waiting for node status"
        );

        loop {
            self.sync_state();
            if *shutdown.borrow() {
                return Ok(ExitReason::Shutdown);
            }
            let awaiting = self.state == ControllerState::AwaitingFirstStatus;

            tokio::select! {
                biased;

                changed = shutdown.changed(), if shutdown_open => {
                    // A dropped sender can never raise the signal.
                    if changed.is_err() {
                        shutdown_open = false;
                    }
                }

                () = self.transport.closed() => {
                    self.events().publish(ControllerEvent::disconnected("connection lost"));
                    return Err(ProtocolError::Disconnected.into());
                }

                _ = status_rx.changed(), if awaiting => {}

                _ = liveness.tick(), if awaiting => {
                    tracing::trace!("Still waiting for node status");
                    self.events().publish(ControllerEvent::AwaitingStatus);
                }

                intent = intents.recv() => {
                    let Some(intent) = intent else {
                        return Ok(ExitReason::InputClosed);
                    };
                    match self.handle(intent).await {
                        Ok(IntentOutcome::Exit) => return Ok(ExitReason::OperatorExit),
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(%intent, error = %e, "Command not delivered");
                        }
                    }
                }
            }
        }
    }

    /// Moves out of `AwaitingFirstStatus` once the store has a snapshot.
    fn sync_state(&mut self) {
        if self.state != ControllerState::AwaitingFirstStatus {
            return;
        }
        if let Some(snapshot) = self.store().snapshot() {
            tracing::info!(revision = snapshot.revision(), "Node status received, ready");
            self.state = ControllerState::Ready;
            self.events().publish(ControllerEvent::Ready { snapshot });
        }
    }

    /// Resolves a command intent; `None` for intents that publish nothing.
    fn compose(&mut self, intent: Intent) -> Option<OutgoingCommand> {
        if !intent.is_command() {
            return None;
        }
        if let Some((failed, command)) = self.undelivered.take()
            && failed == intent
        {
            tracing::debug!(%intent, %command, "Retrying undelivered command");
            return Some(command);
        }

        let command = match intent {
            Intent::TogglePump => self.composer.toggle_pump(),
            Intent::ToggleLight => self.composer.toggle_light(),
            Intent::AllOn => self.composer.bulk_set(true, true),
            Intent::AllOff => self.composer.bulk_set(false, false),
            Intent::Set(partial) => self.composer.resolve(partial),
            Intent::Refresh | Intent::Exit => return None,
        };
        Some(command)
    }

    fn refresh(&self) -> IntentOutcome {
        match self.store().snapshot() {
            Some(snapshot) => {
                self.events().publish(ControllerEvent::StatusRefreshed {
                    snapshot: Arc::clone(&snapshot),
                });
                IntentOutcome::Refreshed(snapshot)
            }
            None => IntentOutcome::Rejected,
        }
    }

    async fn dispatch(&mut self, command: OutgoingCommand) -> std::result::Result<(), ProtocolError> {
        self.state = ControllerState::Dispatching;
        let payload = codec::encode_command(&command);
        let topic = self.topics().command().to_string();
        let result = self.transport.publish(&topic, payload).await;
        self.state = ControllerState::Ready;

        match result {
            Ok(()) => {
                tracing::info!(%command, topic = %topic, "Command sent");
                self.router.note_command(command);
                self.events().publish(ControllerEvent::CommandSent { command });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%command, error = %e, "Publish failed");
                self.events().publish(ControllerEvent::PublishFailed {
                    command,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

#[cfg(feature = "mqtt")]
impl Controller<crate::protocol::MqttTransport> {
    /// Connects to the broker described by `config` and builds a controller.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ConnectionFailed` if the broker cannot be reached.
    pub async fn connect(config: &crate::config::ControllerConfig) -> Result<Self> {
        let router = Arc::new(StatusRouter::new(
            config.topics.clone(),
            Arc::new(StatusStore::new()),
            EventBus::new(),
        ));

        let transport = crate::protocol::MqttTransport::connect(
            &config.mqtt,
            &config.subscriptions(),
            router.handler(),
        )
        .await?;

        Ok(Self::new(transport, router).with_liveness_interval(config.liveness_interval))
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Controller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("transport", &self.transport)
            .field("state", &self.state)
            .field("last_sent", &self.composer.last_sent())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::types::{CommandIntent, DeviceStatus};

    /// Records publishes; fails them while `fail` is set.
    #[derive(Debug, Default)]
    struct RecordingTransport {
        published: Mutex<Vec<(String, Vec<u8>)>>,
        fail: Mutex<bool>,
    }

    impl Transport for RecordingTransport {
        async fn publish(&self, topic: &str, payload: Vec<u8>) -> std::result::Result<(), ProtocolError> {
            if *self.fail.lock() {
                return Err(ProtocolError::PublishFailed {
                    topic: topic.to_string(),
                    message: "broker unavailable".to_string(),
                });
            }
            self.published.lock().push((topic.to_string(), payload));
            Ok(())
        }

        async fn closed(&self) {
            std::future::pending::<()>().await;
        }

        async fn disconnect(&self) -> std::result::Result<(), ProtocolError> {
            Ok(())
        }
    }

    fn controller() -> Controller<RecordingTransport> {
        let router = Arc::new(StatusRouter::new(
            Topics::default(),
            Arc::new(StatusStore::new()),
            EventBus::new(),
        ));
        Controller::new(RecordingTransport::default(), router)
    }

    fn published(controller: &Controller<RecordingTransport>) -> Vec<OutgoingCommand> {
        controller
            .transport()
            .published
            .lock()
            .iter()
            .map(|(_, payload)| serde_json::from_slice(payload).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn intents_rejected_before_first_status() {
        let mut controller = controller();
        let mut rx = controller.events().subscribe();

        let outcome = controller.handle(Intent::TogglePump).await.unwrap();

        assert_eq!(outcome, IntentOutcome::Rejected);
        assert_eq!(controller.state(), ControllerState::AwaitingFirstStatus);
        assert!(published(&controller).is_empty());
        assert!(!controller.composer().has_sent());
        assert!(matches!(
            rx.try_recv(),
            Ok(ControllerEvent::IntentRejected { .. })
        ));
    }

    #[tokio::test]
    async fn exit_honoured_before_first_status() {
        let mut controller = controller();
        assert_eq!(
            controller.handle(Intent::Exit).await.unwrap(),
            IntentOutcome::Exit
        );
        assert_eq!(controller.state(), ControllerState::Exiting);
    }

    #[tokio::test]
    async fn toggle_after_first_status_publishes_full_command() {
        let mut controller = controller();
        controller
            .store()
            .apply_status(DeviceStatus::new().with_pump_on(false).with_light_on(false));

        let outcome = controller.handle(Intent::TogglePump).await.unwrap();

        assert_eq!(outcome, IntentOutcome::Sent(OutgoingCommand::new(true, false)));
        assert_eq!(controller.state(), ControllerState::Ready);

        let sent = controller.transport().published.lock().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "aquaponics/cmd");
        assert_eq!(sent[0].1, br#"{"pump":true,"light":false}"#);
    }

    #[tokio::test]
    async fn toggles_follow_last_sent_not_reported_state() {
        let mut controller = controller();
        // The node reports the pump running, but nothing has been sent yet.
        controller
            .store()
            .apply_status(DeviceStatus::new().with_pump_on(true));

        controller.handle(Intent::TogglePump).await.unwrap();
        controller.handle(Intent::ToggleLight).await.unwrap();
        controller.handle(Intent::TogglePump).await.unwrap();

        assert_eq!(
            published(&controller),
            vec![
                OutgoingCommand::new(true, false),
                OutgoingCommand::new(true, true),
                OutgoingCommand::new(false, true),
            ]
        );
    }

    #[tokio::test]
    async fn bulk_and_set_intents() {
        let mut controller = controller();
        controller.store().apply_status(DeviceStatus::new());

        controller.handle(Intent::AllOn).await.unwrap();
        controller
            .handle(Intent::Set(CommandIntent::light(false)))
            .await
            .unwrap();
        controller.handle(Intent::AllOff).await.unwrap();

        assert_eq!(
            published(&controller),
            vec![
                OutgoingCommand::new(true, true),
                OutgoingCommand::new(true, false),
                OutgoingCommand::new(false, false),
            ]
        );
    }

    #[tokio::test]
    async fn refresh_reports_current_snapshot() {
        let mut controller = controller();
        controller
            .store()
            .apply_status(DeviceStatus::new().with_temperature(25.5));
        let mut rx = controller.events().subscribe();

        match controller.handle(Intent::Refresh).await.unwrap() {
            IntentOutcome::Refreshed(snapshot) => {
                assert_eq!(snapshot.status().temperature, Some(25.5));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(published(&controller).is_empty());
        assert!(matches!(
            rx.try_recv(),
            Ok(ControllerEvent::StatusRefreshed { .. })
        ));
    }

    #[tokio::test]
    async fn publish_failure_keeps_shadow_state() {
        let mut controller = controller();
        controller.store().apply_status(DeviceStatus::new());
        *controller.transport().fail.lock() = true;
        let mut rx = controller.events().subscribe();

        let err = controller.handle(Intent::AllOn).await.unwrap_err();
        assert!(matches!(err, ProtocolError::PublishFailed { .. }));
        assert_eq!(controller.state(), ControllerState::Ready);
        assert_eq!(
            controller.composer().last_sent(),
            OutgoingCommand::new(true, true)
        );
        assert!(matches!(
            rx.try_recv(),
            Ok(ControllerEvent::PublishFailed { .. })
        ));

        // Retrying the same intent sends the same command.
        *controller.transport().fail.lock() = false;
        assert_eq!(
            controller.handle(Intent::AllOn).await.unwrap(),
            IntentOutcome::Sent(OutgoingCommand::new(true, true))
        );
    }

    #[tokio::test]
    async fn toggle_retry_after_publish_failure_resends_same_command() {
        let mut controller = controller();
        controller
            .store()
            .apply_status(DeviceStatus::new().with_pump_on(false));

        *controller.transport().fail.lock() = true;
        assert!(controller.handle(Intent::TogglePump).await.is_err());

        *controller.transport().fail.lock() = false;
        assert_eq!(
            controller.handle(Intent::TogglePump).await.unwrap(),
            IntentOutcome::Sent(OutgoingCommand::new(true, false))
        );
        // Delivered now, so the next toggle flips again.
        assert_eq!(
            controller.handle(Intent::TogglePump).await.unwrap(),
            IntentOutcome::Sent(OutgoingCommand::new(false, false))
        );
    }

    #[tokio::test]
    async fn refresh_keeps_undelivered_toggle_for_retry() {
        let mut controller = controller();
        controller.store().apply_status(DeviceStatus::new());

        *controller.transport().fail.lock() = true;
        assert!(controller.handle(Intent::ToggleLight).await.is_err());
        *controller.transport().fail.lock() = false;

        controller.handle(Intent::Refresh).await.unwrap();
        assert_eq!(
            controller.handle(Intent::ToggleLight).await.unwrap(),
            IntentOutcome::Sent(OutgoingCommand::new(false, true))
        );
    }

    #[tokio::test]
    async fn different_intent_after_failure_composes_normally() {
        let mut controller = controller();
        controller.store().apply_status(DeviceStatus::new());

        *controller.transport().fail.lock() = true;
        assert!(controller.handle(Intent::TogglePump).await.is_err());
        *controller.transport().fail.lock() = false;

        assert_eq!(
            controller.handle(Intent::ToggleLight).await.unwrap(),
            IntentOutcome::Sent(OutgoingCommand::new(true, true))
        );
        assert_eq!(
            controller.handle(Intent::TogglePump).await.unwrap(),
            IntentOutcome::Sent(OutgoingCommand::new(false, true))
        );
    }

    #[tokio::test]
    async fn ready_event_published_once() {
        let mut controller = controller();
        let mut rx = controller.events().subscribe();
        controller.store().apply_status(DeviceStatus::new());

        controller.handle(Intent::Refresh).await.unwrap();
        controller.handle(Intent::Refresh).await.unwrap();

        let mut ready = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ControllerEvent::Ready { .. }) {
                ready += 1;
            }
        }
        assert_eq!(ready, 1);
    }
}
