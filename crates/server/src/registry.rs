// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection registry: identity → open realtime connections.
//!
//! The registry is the only shared mutable state in the server. Each
//! `register`/`unregister` applies its mutation and enqueues the resulting
//! online-set broadcast under one lock, so concurrent connection events are
//! serialised into a single total order and every client observes presence
//! snapshots in that order. Nothing under the lock touches the network.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::broadcast::{self, DeliveryReport, Outbox, PresenceFeed};
use crate::identity::{ConnectionId, Identity};
use crate::protocol::ServerEvent;

pub use crate::protocol::OnlineSet;

/// Registry-side view of one live transport connection.
///
/// The registry holds only the sending halves of the connection's outbox
/// and presence feed. The socket task owns the [`ConnectionInbox`], so
/// dropping the socket closes the handle without the registry's involvement.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub outbox: Outbox,
    pub presence: PresenceFeed,
}

/// Receiving side of a [`ConnectionHandle`], drained by its socket task.
#[derive(Debug)]
pub struct ConnectionInbox {
    /// Targeted messages, dropped when the queue is full.
    pub events: mpsc::Receiver<ServerEvent>,
    /// Newest online set; intermediate snapshots coalesce.
    pub presence: watch::Receiver<OnlineSet>,
}

impl ConnectionInbox {
    /// Take the newest online set if it changed since the last take.
    pub fn take_presence(&mut self) -> Option<OnlineSet> {
        if !self.presence.has_changed().unwrap_or(false) {
            return None;
        }
        Some(self.presence.borrow_and_update().clone())
    }
}

impl ConnectionHandle {
    /// Create a handle and the inbox its socket task drains.
    pub fn channel(capacity: usize) -> (Self, ConnectionInbox) {
        let (outbox, events) = mpsc::channel(capacity.max(1));
        let (presence_tx, presence) = watch::channel(OnlineSet::new());
        let handle = Self { id: ConnectionId::new(), outbox, presence: Arc::new(presence_tx) };
        (handle, ConnectionInbox { events, presence })
    }

    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed() || self.presence.is_closed()
    }
}

/// Result of [`ConnectionRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Handle added; `came_online` is true for the identity's first handle.
    Added { came_online: bool, report: DeliveryReport },
    /// Handle was already registered under this identity.
    Duplicate,
    /// Handle is registered under a different identity; left untouched.
    OwnedElsewhere { owner: Identity },
}

/// Result of [`ConnectionRegistry::unregister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnregisterOutcome {
    /// Handle removed; `went_offline` is true if it was the identity's last.
    Removed { identity: Identity, went_offline: bool, report: DeliveryReport },
    /// Handle was not registered (double disconnect, never admitted).
    Stale,
}

struct Member {
    identity: Identity,
    outbox: Outbox,
    presence: PresenceFeed,
}

#[derive(Default)]
struct Inner {
    online: IndexMap<Identity, IndexSet<ConnectionId>>,
    members: HashMap<ConnectionId, Member>,
}

impl Inner {
    fn snapshot(&self) -> OnlineSet {
        self.online.keys().cloned().collect()
    }

    /// Push the current online set to every registered connection, plus
    /// `departing` if its socket is still open.
    fn broadcast_online(&self, departing: Option<(ConnectionId, &PresenceFeed)>) -> DeliveryReport {
        let online = self.snapshot();
        let departing = departing.filter(|(_, feed)| !feed.is_closed());
        let targets = self
            .online
            .values()
            .flat_map(|conns| conns.iter())
            .filter_map(|id| self.members.get(id).map(|m| (*id, &m.presence)))
            .chain(departing);
        broadcast::broadcast_presence(&online, targets)
    }
}

/// Process-wide presence registry.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handle` under `identity` and broadcast the new online set.
    pub fn register(&self, identity: &Identity, handle: &ConnectionHandle) -> RegisterOutcome {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.members.get(&handle.id) {
            if existing.identity == *identity {
                return RegisterOutcome::Duplicate;
            }
            return RegisterOutcome::OwnedElsewhere { owner: existing.identity.clone() };
        }

        let came_online = !inner.online.contains_key(identity);
        // New identities are appended: the online set is ordered by when each came online.
        inner.online.entry(identity.clone()).or_default().insert(handle.id);
        inner.members.insert(
            handle.id,
            Member {
                identity: identity.clone(),
                outbox: handle.outbox.clone(),
                presence: Arc::clone(&handle.presence),
            },
        );

        let report = inner.broadcast_online(None);
        RegisterOutcome::Added { came_online, report }
    }

    /// Remove the connection `id` from whichever identity owns it and
    /// broadcast the new online set. A no-op for unknown ids.
    pub fn unregister(&self, id: ConnectionId) -> UnregisterOutcome {
        let mut inner = self.inner.lock();

        let Some(member) = inner.members.remove(&id) else {
            return UnregisterOutcome::Stale;
        };

        let mut went_offline = false;
        if let Some(conns) = inner.online.get_mut(&member.identity) {
            conns.shift_remove(&id);
            if conns.is_empty() {
                inner.online.shift_remove(&member.identity);
                went_offline = true;
            }
        }

        let report = inner.broadcast_online(Some((id, &member.presence)));
        UnregisterOutcome::Removed { identity: member.identity, went_offline, report }
    }

    /// Deliver `event` to every open connection of `identity`.
    ///
    /// Runs under the registry lock so it is ordered with respect to presence
    /// broadcasts. An offline identity simply gets nothing.
    pub fn deliver_to(&self, identity: &Identity, event: &ServerEvent) -> DeliveryReport {
        let inner = self.inner.lock();
        let Some(conns) = inner.online.get(identity) else {
            return DeliveryReport::default();
        };
        let targets = conns.iter().filter_map(|id| inner.members.get(id).map(|m| (*id, &m.outbox)));
        broadcast::broadcast(event, targets)
    }

    /// Value copy of the current online set.
    pub fn snapshot_online(&self) -> OnlineSet {
        self.inner.lock().snapshot()
    }

    pub fn is_online(&self, identity: &Identity) -> bool {
        self.inner.lock().online.contains_key(identity)
    }

    /// Connection ids currently registered for `identity`, in admission order.
    pub fn connections_of(&self, identity: &Identity) -> Vec<ConnectionId> {
        self.inner
            .lock()
            .online
            .get(identity)
            .map(|conns| conns.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn identity_count(&self) -> usize {
        self.inner.lock().online.len()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.lock().members.len()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
