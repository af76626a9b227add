// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller events.
//!
//! Both the inbound status path and the controller loop report what they do
//! as [`ControllerEvent`]s on an [`EventBus`]. A display layer subscribes to
//! the bus instead of polling the controller.
//!
//! # Examples
//!
//! ```
//! use aquactl::event::{ControllerEvent, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(ControllerEvent::AwaitingStatus);
//! assert!(matches!(rx.try_recv(), Ok(ControllerEvent::AwaitingStatus)));
//! ```

mod controller_event;
mod event_bus;

pub use controller_event::ControllerEvent;
pub use event_bus::{EventBus, EventStream};
