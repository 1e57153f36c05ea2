// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client session state machine.
//!
//! The controller owns at most one [`Link`] and reacts to three inputs: the
//! identity session (sign-in/logout), link lifecycle events, and its own
//! reconnect deadline. It never awaits; [`crate::session`] drives it from a
//! single task so the inputs cannot race each other.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use pulse_protocol::{Identity, MessageNotice, OnlineSet, ServerEvent};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::auth::IdentitySession;
use crate::config::ClientConfig;
use crate::link::{Connector, Link, LinkEvent, LinkId};
use crate::unseen::{UnseenCounts, UnseenTracker};

/// Realtime connection state as seen by the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The live connection, published once the link is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub link: LinkId,
    pub identity: Identity,
}

/// Read-only snapshot published to the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionView {
    pub state: ConnectionState,
    /// Signed-in identity, if any.
    pub identity: Option<Identity>,
    /// Present only while `state` is `Connected`.
    pub connection: Option<ConnectionInfo>,
    /// Last online set received, replaced wholesale on every broadcast.
    pub online: OnlineSet,
}

/// Exponential reconnect delay.
#[derive(Debug, Clone)]
struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max, next: initial }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.next = self.initial;
    }
}

pub struct SessionController {
    connector: Arc<dyn Connector>,
    events_tx: mpsc::Sender<LinkEvent>,
    session: Option<IdentitySession>,
    link: Option<Box<dyn Link>>,
    next_link: u64,
    view: SessionView,
    unseen: UnseenTracker,
    backoff: Backoff,
    reconnect_at: Option<Instant>,
    view_tx: watch::Sender<SessionView>,
    unseen_tx: watch::Sender<UnseenCounts>,
    messages_tx: broadcast::Sender<MessageNotice>,
}

impl SessionController {
    /// Links created by this controller report on `events_tx`; the caller
    /// feeds whatever arrives on the paired receiver to
    /// [`handle_link_event`](Self::handle_link_event).
    pub fn new(
        connector: Arc<dyn Connector>,
        events_tx: mpsc::Sender<LinkEvent>,
        config: &ClientConfig,
    ) -> Self {
        let (view_tx, _) = watch::channel(SessionView::default());
        let (unseen_tx, _) = watch::channel(UnseenCounts::new());
        let (messages_tx, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            connector,
            events_tx,
            session: None,
            link: None,
            next_link: 0,
            view: SessionView::default(),
            unseen: UnseenTracker::new(),
            backoff: Backoff::new(config.reconnect_initial, config.reconnect_max),
            reconnect_at: None,
            view_tx,
            unseen_tx,
            messages_tx,
        }
    }

    pub fn subscribe_view(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    pub fn subscribe_unseen(&self) -> watch::Receiver<UnseenCounts> {
        self.unseen_tx.subscribe()
    }

    /// Sender side of the inbound message feed, for late subscribers.
    pub fn messages(&self) -> broadcast::Sender<MessageNotice> {
        self.messages_tx.clone()
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    pub fn unseen(&self) -> &UnseenTracker {
        &self.unseen
    }

    pub fn session(&self) -> Option<&IdentitySession> {
        self.session.as_ref()
    }

    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Adopt an identity session and connect.
    ///
    /// Signing in as a different identity tears the previous session down
    /// first, as a logout would.
    pub fn sign_in(&mut self, session: IdentitySession) {
        if let Some(current) = &self.session {
            if current.identity != session.identity {
                info!(from = %current.identity, to = %session.identity, "switching identity");
                self.logout();
            }
        }
        self.view.identity = Some(session.identity.clone());
        self.session = Some(session);
        self.publish_view();
        self.connect();
    }

    /// Open a link if a session exists and none is open. Idempotent.
    pub fn connect(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if self.link.is_some() {
            return;
        }
        self.reconnect_at = None;

        self.next_link += 1;
        let id = LinkId(self.next_link);
        debug!(%id, identity = %session.identity, "opening realtime link");
        self.link = Some(self.connector.connect(id, &session.identity, self.events_tx.clone()));

        self.view.state = ConnectionState::Connecting;
        self.view.connection = None;
        self.publish_view();
    }

    pub fn handle_link_event(&mut self, event: LinkEvent) {
        let current = self.link.as_ref().map(|link| link.id());
        if current != Some(event.link()) {
            debug!(link = %event.link(), "ignoring event from stale link");
            return;
        }

        match event {
            LinkEvent::Opened { link } => {
                let Some(session) = &self.session else {
                    return;
                };
                info!(%link, identity = %session.identity, "realtime link open");
                self.backoff.reset();
                self.view.state = ConnectionState::Connected;
                self.view.connection =
                    Some(ConnectionInfo { link, identity: session.identity.clone() });
                self.publish_view();
            }
            LinkEvent::Event { event: ServerEvent::OnlineUsers(online), .. } => {
                self.view.online = online;
                self.publish_view();
            }
            LinkEvent::Event { event: ServerEvent::NewMessage(notice), .. } => {
                self.unseen.on_inbound_message(&notice);
                self.publish_unseen();
                // No subscribers is fine.
                let _ = self.messages_tx.send(notice);
            }
            LinkEvent::Closed { link, reason } => {
                info!(%link, reason = reason.as_deref().unwrap_or(""), "realtime link lost");
                // The transport is already gone; drop the handle without closing.
                self.link = None;
                self.view.state = ConnectionState::Disconnected;
                self.view.connection = None;
                self.view.online.clear();
                self.publish_view();

                if self.session.is_some() {
                    let delay = self.backoff.next_delay();
                    debug!(delay_ms = delay.as_millis() as u64, "scheduling reconnect");
                    self.reconnect_at = Some(Instant::now() + delay);
                }
            }
        }
    }

    /// Reconnect if the pending deadline has passed. Returns whether a new
    /// link was opened.
    pub fn reconnect_due(&mut self, now: Instant) -> bool {
        match self.reconnect_at {
            Some(at) if at <= now => {
                self.reconnect_at = None;
                let had_link = self.link.is_some();
                self.connect();
                !had_link && self.link.is_some()
            }
            _ => false,
        }
    }

    /// Discard the identity session and everything derived from it.
    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            info!(identity = %session.identity, "logging out");
        }
        self.close_link();
        self.reconnect_at = None;
        self.backoff.reset();
        self.view = SessionView::default();
        self.unseen.on_logout();
        self.publish_view();
        self.publish_unseen();
    }

    /// Close any open link and stop reconnecting. Called on unmount.
    pub fn shutdown(&mut self) {
        self.session = None;
        self.close_link();
        self.reconnect_at = None;
        self.view.state = ConnectionState::Disconnected;
        self.view.connection = None;
        self.view.online.clear();
        self.publish_view();
    }

    pub fn open_conversation(&mut self, peer: Identity) {
        self.unseen.on_conversation_opened(peer);
        self.publish_unseen();
    }

    pub fn close_conversation(&mut self) {
        self.unseen.close_conversation();
    }

    fn close_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            debug!(link = %link.id(), "closing realtime link");
            link.close();
        }
    }

    fn publish_view(&self) {
        self.view_tx.send_if_modified(|published| {
            if *published == self.view {
                return false;
            }
            *published = self.view.clone();
            true
        });
    }

    fn publish_unseen(&self) {
        self.unseen_tx.send_if_modified(|published| {
            if published == self.unseen.counts() {
                return false;
            }
            *published = self.unseen.counts().clone();
            true
        });
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.close_link();
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
