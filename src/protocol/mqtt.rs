// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport over `rumqttc`.

use std::sync::Arc;

use parking_lot::RwLock;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::{oneshot, watch};

use crate::config::MqttConfig;
use crate::error::ProtocolError;

use super::{ConnectionState, Transport};

/// Callback invoked for every inbound publish with `(topic, payload)`.
type MessageHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// A single broker connection.
///
/// The connection is driven by a background task that hands inbound
/// messages to the callback given to [`connect`](Self::connect). The
/// initial topics are subscribed once the broker's CONNACK arrives. The
/// session ends on the first disconnect or connection error; there is no
/// reconnect.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use aquactl::config::MqttConfig;
/// use aquactl::event::EventBus;
/// use aquactl::protocol::{MqttTransport, StatusRouter, Topics};
/// use aquactl::state::StatusStore;
///
/// # async fn example() -> aquactl::Result<()> {
/// let topics = Topics::default();
/// let router = Arc::new(StatusRouter::new(
///     topics.clone(),
///     Arc::new(StatusStore::new()),
///     EventBus::new(),
/// ));
///
/// let transport = MqttTransport::connect(
///     &MqttConfig::default(),
///     &[topics.status().to_string()],
///     router.handler(),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub struct MqttTransport {
    client: AsyncClient,
    host: String,
    port: u16,
    subscriptions: Arc<RwLock<Vec<String>>>,
    state: watch::Receiver<ConnectionState>,
}

impl MqttTransport {
    /// Connects to the broker and subscribes to `topics`.
    ///
    /// Waits for the broker's CONNACK up to the configured connection timeout.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ConnectionFailed` if the broker refuses the
    /// connection, is unreachable, or does not answer in time.
    pub async fn connect<F>(
        config: &MqttConfig,
        topics: &[String],
        on_message: F,
    ) -> Result<Self, ProtocolError>
    where
        F: Fn(&str, &[u8]) + Send + Sync + 'static,
    {
        let client_id = config.client_id();
        let mut mqtt_options = MqttOptions::new(&client_id, config.host(), config.port());
        mqtt_options.set_keep_alive(config.keep_alive());
        mqtt_options.set_clean_session(true);

        if let Some((username, password)) = config.credentials() {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let subscriptions = Arc::new(RwLock::new(topics.to_vec()));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (connack_tx, connack_rx) = oneshot::channel();

        tokio::spawn(handle_events(
            event_loop,
            client.clone(),
            Arc::clone(&subscriptions),
            Arc::new(on_message),
            state_tx,
            connack_tx,
        ));

        let timeout = config.connection_timeout();
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(
                    host = %config.host(),
                    port = config.port(),
                    client_id = %client_id,
                    "Connected to MQTT broker"
                );
            }
            Ok(Ok(Err(message))) => return Err(ProtocolError::ConnectionFailed(message)),
            Ok(Err(_)) => {
                return Err(ProtocolError::ConnectionFailed(
                    "MQTT event loop terminated unexpectedly".to_string(),
                ));
            }
            Err(_) => {
                // Stop the background task from retrying forever.
                let _ = client.try_disconnect();
                return Err(ProtocolError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )));
            }
        }

        Ok(Self {
            client,
            host: config.host().to_string(),
            port: config.port(),
            subscriptions,
            state: state_rx,
        })
    }

    /// Subscribes to an additional topic.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Mqtt` if the request cannot be queued.
    pub async fn subscribe(&self, topic: impl Into<String>) -> Result<(), ProtocolError> {
        let topic = topic.into();
        self.client.subscribe(&topic, QoS::AtLeastOnce).await?;
        tracing::debug!(topic = %topic, "Subscribed");

        let mut subscriptions = self.subscriptions.write();
        if !subscriptions.contains(&topic) {
            subscriptions.push(topic);
        }
        Ok(())
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns whether the connection is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns the topics this connection has subscribed to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.read().clone()
    }
}

impl Transport for MqttTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ProtocolError> {
        tracing::debug!(
            topic = %topic,
            payload = %String::from_utf8_lossy(&payload),
            "Publishing MQTT message"
        );

        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| ProtocolError::PublishFailed {
                topic: topic.to_string(),
                message: e.to_string(),
            })
    }

    async fn closed(&self) {
        let mut state = self.state.clone();
        // A dropped sender means the event loop is gone, which is also closed.
        let _ = state
            .wait_for(|s| *s == ConnectionState::Disconnected)
            .await;
    }

    async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(host = %self.host, port = self.port, "Disconnecting from MQTT broker");
        self.client.disconnect().await.map_err(ProtocolError::Mqtt)
    }
}

impl std::fmt::Debug for MqttTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Drives the `rumqttc` event loop until the connection is lost or closed.
async fn handle_events(
    mut event_loop: EventLoop,
    client: AsyncClient,
    subscriptions: Arc<RwLock<Vec<String>>>,
    on_message: MessageHandler,
    state: watch::Sender<ConnectionState>,
    connack_tx: oneshot::Sender<Result<(), String>>,
) {
    let mut connack_tx = Some(connack_tx);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT connected");

                // `try_subscribe` only queues the request; awaiting here would
                // deadlock against our own poll loop if the queue were full.
                for topic in subscriptions.read().iter() {
                    if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
                        tracing::error!(topic = %topic, error = %e, "Failed to subscribe");
                    }
                }

                state.send_replace(ConnectionState::Connected);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::trace!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "MQTT message received"
                );
                on_message(publish.topic.as_str(), &publish.payload[..]);
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker closed the connection");
                break;
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!("MQTT disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "MQTT event loop error");
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Err(e.to_string()));
                }
                break;
            }
        }
    }

    state.send_replace(ConnectionState::Disconnected);
}
