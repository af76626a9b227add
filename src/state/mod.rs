// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Last-known device status.
//!
//! The [`StatusStore`] holds the most recent [`DeviceStatus`] reported by the
//! node, wrapped in a [`StatusSnapshot`] that records when it arrived and a
//! revision number. Every status message replaces the previous snapshot.
//!
//! # Examples
//!
//! ```
//! use aquactl::state::StatusStore;
//! use aquactl::types::DeviceStatus;
//!
//! let store = StatusStore::new();
//! assert!(store.current_status().is_none());
//!
//! store.apply_status(DeviceStatus::new().with_temperature(25.0).with_pump_on(true));
//! store.apply_status(DeviceStatus::new().with_humidity(60.0));
//!
//! // Replaced, not merged
//! assert_eq!(store.current_status(), Some(DeviceStatus::new().with_humidity(60.0)));
//! assert_eq!(store.revision(), 2);
//! ```
//!
//! [`DeviceStatus`]: crate::types::DeviceStatus

mod status_store;

pub use status_store::{StatusSnapshot, StatusStore};
