// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Presence broadcaster: best-effort fan-out of server events to connection
//! outboxes.
//!
//! Delivery never awaits. Messages are enqueued on the connection's bounded
//! outbox and presence snapshots replace the value in its presence feed; the
//! connection's own socket task writes both to the network, so one slow or
//! dead peer cannot hold up the others.
//!
//! Only messages can be lost to a full outbox. A presence snapshot
//! supersedes the one before it, so the feed keeps just the newest and a
//! lagging peer still converges on the current online set.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

use crate::identity::ConnectionId;
use crate::protocol::{OnlineSet, ServerEvent};

/// Sending half of a connection's outbound message queue.
pub type Outbox = mpsc::Sender<ServerEvent>;

/// Latest-value slot for a connection's online-set snapshots.
pub type PresenceFeed = Arc<watch::Sender<OnlineSet>>;

/// Why a single delivery was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The connection's socket task has already gone away.
    Closed,
    /// The connection is not draining its queue fast enough.
    Full,
}

impl DeliveryFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Full => "full",
        }
    }
}

/// Tally of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub skipped: usize,
}

impl DeliveryReport {
    fn record(&mut self, result: Result<(), DeliveryFailure>) {
        match result {
            Ok(()) => self.delivered += 1,
            Err(_) => self.skipped += 1,
        }
    }
}

/// Enqueue one event on one outbox.
pub fn deliver(
    connection: ConnectionId,
    outbox: &Outbox,
    event: ServerEvent,
) -> Result<(), DeliveryFailure> {
    match outbox.try_send(event) {
        Ok(()) => Ok(()),
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(%connection, "skipping delivery to closed connection");
            Err(DeliveryFailure::Closed)
        }
        Err(TrySendError::Full(evt)) => {
            tracing::warn!(%connection, event = evt.name(), "connection outbox full, dropping event");
            Err(DeliveryFailure::Full)
        }
    }
}

/// Deliver `event` to every target, skipping (not aborting on) failures.
pub fn broadcast<'a>(
    event: &ServerEvent,
    targets: impl IntoIterator<Item = (ConnectionId, &'a Outbox)>,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for (connection, outbox) in targets {
        report.record(deliver(connection, outbox, event.clone()));
    }
    report
}

/// Replace the snapshot in one presence feed. Never fails for a slow reader.
pub fn publish_presence(
    connection: ConnectionId,
    feed: &PresenceFeed,
    online: &OnlineSet,
) -> Result<(), DeliveryFailure> {
    if feed.is_closed() {
        tracing::debug!(%connection, "skipping presence for closed connection");
        return Err(DeliveryFailure::Closed);
    }
    feed.send_replace(online.clone());
    Ok(())
}

/// Publish `online` to every target feed, skipping closed ones.
pub fn broadcast_presence<'a>(
    online: &OnlineSet,
    targets: impl IntoIterator<Item = (ConnectionId, &'a PresenceFeed)>,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for (connection, feed) in targets {
        report.record(publish_presence(connection, feed, online));
    }
    report
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
