// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status store with copy-on-write snapshots.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::types::DeviceStatus;

/// A status together with its receipt metadata.
///
/// Snapshots are immutable once published; readers hold an `Arc` to one and
/// never see it change underneath them.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    status: DeviceStatus,
    revision: u64,
    received_at: DateTime<Utc>,
    received: Instant,
}

impl StatusSnapshot {
    /// The reported status.
    #[must_use]
    pub fn status(&self) -> &DeviceStatus {
        &self.status
    }

    /// Revision of this snapshot (1 for the first status received).
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Wall-clock time the status was received.
    #[must_use]
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Time elapsed since the status was received.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.received.elapsed()
    }

    /// Returns `true` if the snapshot is older than `max_age`.
    #[must_use]
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }
}

/// Holds the latest status reported by the node.
///
/// There is a single writer (the inbound message path) and any number of
/// readers. The lock is only held to swap or clone an `Arc`, so readers
/// never block on the network and never see a partially applied update.
/// Waiters can use [`subscribe`](Self::subscribe) or
/// [`wait_for_status`](Self::wait_for_status) to be woken on change.
#[derive(Debug)]
pub struct StatusStore {
    current: RwLock<Option<Arc<StatusSnapshot>>>,
    notify: watch::Sender<Option<Arc<StatusSnapshot>>>,
}

impl StatusStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (notify, _) = watch::channel(None);
        Self {
            current: RwLock::new(None),
            notify,
        }
    }

    /// Replaces the held status unconditionally.
    ///
    /// Returns the snapshot that was stored.
    pub fn apply_status(&self, status: DeviceStatus) -> Arc<StatusSnapshot> {
        let snapshot = {
            let mut current = self.current.write();
            let revision = current.as_ref().map_or(0, |s| s.revision) + 1;
            let snapshot = Arc::new(StatusSnapshot {
                status,
                revision,
                received_at: Utc::now(),
                received: Instant::now(),
            });
            *current = Some(Arc::clone(&snapshot));
            snapshot
        };

        tracing::trace!(revision = snapshot.revision, "Status snapshot replaced");
        self.notify.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Returns the latest status, or `None` if none has been received.
    #[must_use]
    pub fn current_status(&self) -> Option<DeviceStatus> {
        self.snapshot().map(|s| s.status.clone())
    }

    /// Returns the latest snapshot with its metadata.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.current.read().clone()
    }

    /// Returns the current revision (0 before the first status).
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.current.read().as_ref().map_or(0, |s| s.revision)
    }

    /// Returns `true` once a status has been received.
    #[must_use]
    pub fn has_status(&self) -> bool {
        self.current.read().is_some()
    }

    /// Subscribes to snapshot replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<StatusSnapshot>>> {
        self.notify.subscribe()
    }

    /// Waits until a status has been received and returns it.
    pub async fn wait_for_status(&self) -> Arc<StatusSnapshot> {
        let mut rx = self.subscribe();
        loop {
            if let Some(snapshot) = rx.borrow_and_update().clone() {
                return snapshot;
            }
            // The sender lives in `self`, so it cannot be dropped while we wait.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}
