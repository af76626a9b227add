// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast of controller events.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::ControllerEvent;

/// Enough for several minutes of status at the node's 5 s cadence.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fan-out of [`ControllerEvent`]s to any number of subscribers.
///
/// Publishing never blocks the inbound path. A subscriber that falls more
/// than the channel capacity behind loses the oldest events; [`EventStream`]
/// logs and counts the gap instead of surfacing it as an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ControllerEvent>,
}

impl EventBus {
    /// Creates a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus keeping up to `capacity` undelivered events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to events published from now on, as a raw receiver.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.sender.subscribe()
    }

    /// Subscribes to events published from now on, skipping over lag.
    #[must_use]
    pub fn stream(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
            skipped: 0,
        }
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event. Without subscribers the event is dropped.
    pub fn publish(&self, event: ControllerEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription that tolerates falling behind.
///
/// Events lost to lag are counted in [`skipped`](Self::skipped); the stream
/// carries on with the oldest event still buffered.
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<ControllerEvent>,
    skipped: u64,
}

impl EventStream {
    /// Waits for the next event. Returns `None` once every bus handle is gone.
    pub async fn next(&mut self) -> Option<ControllerEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(count)) => self.note_lag(count),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next buffered event without waiting.
    pub fn try_next(&mut self) -> Option<ControllerEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(count)) => self.note_lag(count),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Number of events lost to lag so far.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn note_lag(&mut self, count: u64) {
        self.skipped += count;
        tracing::warn!(skipped = count, total = self.skipped, "Event subscriber lagged");
    }
}
