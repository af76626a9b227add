// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `aquactl` - controller side of an MQTT aquaponics node.
//!
//! A remote node publishes its sensor readings and relay states on a status
//! topic every few seconds and switches its pump and grow light when a
//! command arrives on the command topic. This library keeps the latest
//! status, composes full commands from operator intents, and publishes them.
//!
//! # Protocol
//!
//! Status, node → controller (`aquaponics/status`); every field is optional:
//!
//! ```json
//! {"temp": 25.5, "humidity": 60.0, "water": "Đầy", "pump": true, "light": false}
//! ```
//!
//! Command, controller → node (`aquaponics/cmd`); both fields are always set:
//!
//! ```json
//! {"pump": true, "light": false}
//! ```
//!
//! # Building blocks
//!
//! - [`codec`]: pure JSON encode/decode of both documents
//! - [`StatusStore`]: latest snapshot, readable from any task
//! - [`CommandComposer`]: fills partial intents from the last command sent
//! - [`StatusRouter`]: feeds inbound status into the store
//! - [`Controller`]: the intent loop tying them to a [`protocol::Transport`]
//!
//! # Quick Start
//!
//! ```no_run
//! use aquactl::{Controller, ControllerConfig};
//! use aquactl::controller::Intent;
//!
//! #[tokio::main]
//! async fn main() -> aquactl::Result<()> {
//!     let config = ControllerConfig::from_env()?;
//!     let mut controller = Controller::connect(&config).await?;
//!
//!     let snapshot = controller.store().wait_for_status().await;
//!     println!("node reports {:?}", snapshot.status());
//!
//!     controller.handle(Intent::TogglePump).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Driving the loop
//!
//! ```no_run
//! use aquactl::{Controller, ControllerConfig};
//! use aquactl::controller::Intent;
//! use tokio::sync::{mpsc, watch};
//!
//! #[tokio::main]
//! async fn main() -> aquactl::Result<()> {
//!     let config = ControllerConfig::from_env()?;
//!     let mut controller = Controller::connect(&config).await?;
//!
//!     let mut events = controller.events().subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("{event:?}");
//!         }
//!     });
//!
//!     let (intents, intent_rx) = mpsc::channel(16);
//!     let (_shutdown, shutdown_rx) = watch::channel(false);
//!     intents.send(Intent::AllOn).await.ok();
//!     intents.send(Intent::Exit).await.ok();
//!
//!     let reason = controller.run(intent_rx, shutdown_rx).await?;
//!     println!("stopped: {reason:?}");
//!     Ok(())
//! }
//! ```

pub mod codec;
mod composer;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod protocol;
pub mod state;
pub mod types;

pub use composer::CommandComposer;
pub use config::{ControllerConfig, MqttConfig, MqttConfigBuilder};
pub use controller::{Controller, ControllerState, ExitReason, Intent, IntentOutcome};
pub use error::{ConfigError, DecodeError, Error, ProtocolError, Result};
pub use event::{ControllerEvent, EventBus, EventStream};
#[cfg(feature = "mqtt")]
pub use protocol::MqttTransport;
pub use protocol::{StatusRouter, Topics, Transport};
pub use state::{StatusSnapshot, StatusStore};
pub use types::{CommandIntent, DeviceStatus, OutgoingCommand, WaterLevel};
