// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission gate for realtime connection attempts.
//!
//! Only the presence of an identity claim is enforced here. Whether the claim
//! is authentic is the auth collaborator's business.

use serde::Deserialize;

use crate::error::PresenceError;
use crate::identity::Identity;

/// Handshake metadata supplied on the WebSocket upgrade request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Handshake {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

impl Handshake {
    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()) }
    }
}

/// Admit a connection attempt, returning the claimed identity.
///
/// Missing, empty, and whitespace-only claims are rejected. The claim is
/// returned verbatim otherwise.
pub fn admit(handshake: &Handshake) -> Result<Identity, PresenceError> {
    match handshake.user_id.as_deref() {
        Some(id) if !id.trim().is_empty() => Ok(Identity::new(id)),
        _ => Err(PresenceError::AdmissionRejected),
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
