// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`Connector`] for controller and session tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use pulse_protocol::{Identity, ServerEvent};
use tokio::sync::mpsc;

use crate::link::{Connector, Link, LinkEvent, LinkId};

#[derive(Default)]
struct MockState {
    connects: Vec<(LinkId, Identity)>,
    closes: Vec<LinkId>,
    senders: HashMap<LinkId, mpsc::Sender<LinkEvent>>,
}

/// Records every connect and close. Links never open on their own unless
/// `auto_open` is set; tests drive them with [`MockConnector::push`].
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
    auto_open: bool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `Opened` as soon as each link is created.
    pub fn auto_open() -> Self {
        Self { auto_open: true, ..Self::default() }
    }

    pub fn connects(&self) -> Vec<(LinkId, Identity)> {
        self.state.lock().connects.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().connects.len()
    }

    /// Links closed by the controller, in order. Each appears at most once.
    pub fn closes(&self) -> Vec<LinkId> {
        self.state.lock().closes.clone()
    }

    pub fn last_link(&self) -> Option<LinkId> {
        self.state.lock().connects.last().map(|(link, _)| *link)
    }

    /// Deliver `event` on the channel of the link it names. Returns `false`
    /// if that link was never created or its receiver is gone.
    pub fn push(&self, event: LinkEvent) -> bool {
        let sender = self.state.lock().senders.get(&event.link()).cloned();
        sender.is_some_and(|tx| tx.try_send(event).is_ok())
    }

    pub fn open(&self, link: LinkId) -> bool {
        self.push(LinkEvent::Opened { link })
    }

    pub fn send_event(&self, link: LinkId, event: ServerEvent) -> bool {
        self.push(LinkEvent::Event { link, event })
    }

    /// Simulate the transport dropping.
    pub fn drop_link(&self, link: LinkId) -> bool {
        self.push(LinkEvent::Closed { link, reason: Some("connection reset".to_owned()) })
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        link: LinkId,
        identity: &Identity,
        events: mpsc::Sender<LinkEvent>,
    ) -> Box<dyn Link> {
        {
            let mut state = self.state.lock();
            state.connects.push((link, identity.clone()));
            state.senders.insert(link, events.clone());
        }
        if self.auto_open {
            let _ = events.try_send(LinkEvent::Opened { link });
        }
        Box::new(MockLink { id: link, closed: false, state: Arc::clone(&self.state) })
    }
}

struct MockLink {
    id: LinkId,
    closed: bool,
    state: Arc<Mutex<MockState>>,
}

impl Link for MockLink {
    fn id(&self) -> LinkId {
        self.id
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.state.lock().closes.push(self.id);
    }
}
