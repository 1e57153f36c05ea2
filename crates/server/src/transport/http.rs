// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the presence server.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::PresenceError;
use crate::identity::Identity;
use crate::protocol::{MessageNotice, ServerEvent};
use crate::state::PresenceState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub online_count: usize,
    pub connection_count: usize,
}

/// Body posted by the messaging collaborator after it stores a message.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyRequest {
    #[serde(rename = "receiverId")]
    pub receiver_id: Identity,
    pub message: MessageNotice,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub delivered: usize,
    pub skipped: usize,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/status`
pub async fn status() -> &'static str {
    "Server is live!"
}

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<PresenceState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "running".to_owned(),
        online_count: s.registry.identity_count(),
        connection_count: s.registry.connection_count(),
    })
}

/// `GET /api/v1/online`: current online set.
pub async fn online(State(s): State<Arc<PresenceState>>) -> impl IntoResponse {
    Json(s.registry.snapshot_online())
}

/// `POST /api/v1/notify`: push `newMessage` to the receiver's connections.
pub async fn notify(
    State(s): State<Arc<PresenceState>>,
    Json(req): Json<NotifyRequest>,
) -> impl IntoResponse {
    if req.receiver_id.as_str().trim().is_empty() {
        return PresenceError::BadRequest.to_http_response("receiverId is required").into_response();
    }

    let sender = req.message.sender_id.clone();
    let report = s.registry.deliver_to(&req.receiver_id, &ServerEvent::NewMessage(req.message));
    tracing::debug!(
        sender = %sender,
        receiver = %req.receiver_id,
        delivered = report.delivered,
        skipped = report.skipped,
        "message notification relayed"
    );

    Json(NotifyResponse { delivered: report.delivered, skipped: report.skipped }).into_response()
}
