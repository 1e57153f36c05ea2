// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport seam between the session controller and a realtime connection.

use std::fmt;

use pulse_protocol::{Identity, ServerEvent};
use tokio::sync::mpsc;

/// Controller-assigned id of one connection attempt.
///
/// Every transport event carries the id of the link it came from, so events
/// from a link the controller has already abandoned can be recognised and
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

/// Lifecycle and data events reported by a link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The transport completed its handshake.
    Opened { link: LinkId },
    /// A server event arrived.
    Event { link: LinkId, event: ServerEvent },
    /// The transport closed or failed to open. Not sent for closes the
    /// controller requested itself.
    Closed { link: LinkId, reason: Option<String> },
}

impl LinkEvent {
    pub fn link(&self) -> LinkId {
        match self {
            Self::Opened { link } | Self::Event { link, .. } | Self::Closed { link, .. } => *link,
        }
    }
}

/// An open or opening realtime connection owned by the controller.
pub trait Link: Send {
    fn id(&self) -> LinkId;

    /// Close the transport. Must be idempotent.
    fn close(&mut self);
}

/// Opens realtime connections.
pub trait Connector: Send + Sync + 'static {
    /// Start connecting as `identity`. Never blocks: the outcome arrives on
    /// `events` as [`LinkEvent::Opened`] or [`LinkEvent::Closed`].
    fn connect(
        &self,
        link: LinkId,
        identity: &Identity,
        events: mpsc::Sender<LinkEvent>,
    ) -> Box<dyn Link>;
}
