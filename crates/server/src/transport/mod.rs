// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport for the presence server.

pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::PresenceState;

/// Build the axum `Router` with all presence routes.
pub fn build_router(state: Arc<PresenceState>) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    Router::new()
        // Liveness (plain text, kept for existing deploy health checks)
        .route("/api/status", get(http::status))
        .route("/api/v1/health", get(http::health))
        // Presence
        .route("/api/v1/online", get(http::online))
        // Messaging collaborator hook
        .route("/api/v1/notify", post(http::notify))
        // Realtime channel
        .route("/ws", get(ws::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origin. `*` allows any origin.
fn cors_layer(origin: &str) -> CorsLayer {
    let base = CorsLayer::new().allow_methods([Method::GET, Method::POST]).allow_headers(Any);
    if origin == "*" {
        return base.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => base.allow_origin(AllowOrigin::exact(value)),
        Err(e) => {
            tracing::warn!(origin, err = %e, "invalid CORS origin, cross-origin requests disabled");
            base
        }
    }
}
