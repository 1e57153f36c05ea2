// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers for in-process server tests.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::state::PresenceState;

/// Fresh state with the loopback test config.
pub fn test_state() -> Arc<PresenceState> {
    test_state_with(ServerConfig::test())
}

/// Fresh state with a caller-tuned config.
pub fn test_state_with(config: ServerConfig) -> Arc<PresenceState> {
    Arc::new(PresenceState::new(config, CancellationToken::new()))
}

/// Spawn an HTTP/WebSocket server on a random port for integration testing.
///
/// Returns the bound address and a join handle for the server task. The
/// server stops when `state.shutdown` is cancelled.
pub async fn spawn_http_server(
    state: Arc<PresenceState>,
) -> anyhow::Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>)> {
    let shutdown = state.shutdown.clone();
    let router = crate::transport::build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await;
    });
    Ok((addr, handle))
}
