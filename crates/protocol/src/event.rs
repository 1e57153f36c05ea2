// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime channel wire format.
//!
//! Every server-to-client event is a single text frame holding
//! `{"event": <name>, "data": <payload>}`. Client-to-server frames carry no
//! meaning and are ignored by the server.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Snapshot of identities with at least one open connection, in the order
/// they (most recently) came online.
pub type OnlineSet = Vec<Identity>;

/// Handshake query parameter carrying the identity claim.
pub const USER_ID_PARAM: &str = "userId";

/// Event names as they appear on the wire.
pub mod events {
    pub const GET_ONLINE_USERS: &str = "getOnlineUsers";
    pub const NEW_MESSAGE: &str = "newMessage";
}

/// Events pushed from the server to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Full online set, in registry order. Never a delta.
    #[serde(rename = "getOnlineUsers")]
    OnlineUsers(OnlineSet),
    /// A message was stored for the receiving identity.
    #[serde(rename = "newMessage")]
    NewMessage(MessageNotice),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OnlineUsers(_) => events::GET_ONLINE_USERS,
            Self::NewMessage(_) => events::NEW_MESSAGE,
        }
    }

    /// Encode as a text frame body.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a text frame body. Unknown events yield `None`.
    pub fn from_frame(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

/// Message object relayed from the messaging collaborator.
///
/// Only `senderId` is interpreted here; every other field is passed through
/// untouched so clients see the collaborator's message as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageNotice {
    #[serde(rename = "senderId")]
    pub sender_id: Identity,
    #[serde(flatten)]
    pub body: serde_json::Map<String, serde_json::Value>,
}

impl MessageNotice {
    pub fn new(sender_id: impl Into<Identity>) -> Self {
        Self { sender_id: sender_id.into(), body: serde_json::Map::new() }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.body.insert(key.to_owned(), value.into());
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
