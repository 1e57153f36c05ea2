// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-peer unseen message counters.

use std::collections::BTreeMap;

use pulse_protocol::{Identity, MessageNotice};

/// Unseen counts keyed by sending peer. Absent means zero.
pub type UnseenCounts = BTreeMap<Identity, u32>;

/// Tracks which conversation is open and how many messages arrived from
/// every other peer since its conversation was last opened.
#[derive(Debug, Default)]
pub struct UnseenTracker {
    counts: UnseenCounts,
    open: Option<Identity>,
}

impl UnseenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an inbound message notice. Returns `true` when the sender's
    /// conversation is open and the message should be shown in place.
    pub fn on_inbound_message(&mut self, notice: &MessageNotice) -> bool {
        if self.open.as_ref() == Some(&notice.sender_id) {
            return true;
        }
        *self.counts.entry(notice.sender_id.clone()).or_insert(0) += 1;
        false
    }

    /// Make `peer` the open conversation and reset its counter.
    pub fn on_conversation_opened(&mut self, peer: Identity) {
        self.counts.insert(peer.clone(), 0);
        self.open = Some(peer);
    }

    /// Leave the open conversation. Counters are untouched.
    pub fn close_conversation(&mut self) {
        self.open = None;
    }

    pub fn on_logout(&mut self) {
        self.counts.clear();
        self.open = None;
    }

    pub fn open_conversation(&self) -> Option<&Identity> {
        self.open.as_ref()
    }

    pub fn count(&self, peer: &Identity) -> u32 {
        self.counts.get(peer).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn counts(&self) -> &UnseenCounts {
        &self.counts
    }
}

#[cfg(test)]
#[path = "unseen_tests.rs"]
mod tests;
