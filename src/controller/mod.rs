// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller loop.
//!
//! The [`Controller`] waits for the node's first status, then turns operator
//! [`Intent`]s into full commands and publishes them. Status keeps flowing
//! into the shared store in the background the whole time, so the loop never
//! blocks on inbound traffic.

mod controller_loop;
mod intent;

pub use controller_loop::{
    Controller, ControllerState, DEFAULT_LIVENESS_INTERVAL, ExitReason, IntentOutcome,
};
pub use intent::{Intent, ParseIntentError};
