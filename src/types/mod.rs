// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message value types exchanged with the aquaponics node.
//!
//! # Types
//!
//! - [`DeviceStatus`] - One status snapshot reported on the status topic
//! - [`WaterLevel`] - Float-switch reading, reported as text or as a flag
//! - [`CommandIntent`] - Partial actuator update requested by an operator
//! - [`OutgoingCommand`] - Fully resolved command document sent to the node

mod command;
mod status;
mod water_level;

pub use command::{CommandIntent, OutgoingCommand};
pub use status::DeviceStatus;
pub use water_level::WaterLevel;
