// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime WebSocket channel: admission, registration, outbox drain and
//! heartbeat.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::admission::{self, Handshake};
use crate::identity::Identity;
use crate::protocol::ServerEvent;
use crate::registry::{ConnectionHandle, RegisterOutcome, UnregisterOutcome};
use crate::state::PresenceState;

/// `GET /ws?userId=...`: WebSocket upgrade for the realtime channel.
///
/// The identity claim is checked before the upgrade, so a rejected attempt
/// never touches the registry and the client sees a refused connection. A
/// query string that does not parse (a repeated `userId`, say) counts as no
/// claim at all and gets the same rejection.
pub async fn ws_handler(
    State(state): State<Arc<PresenceState>>,
    uri: Uri,
    ws: WebSocketUpgrade,
) -> Response {
    let handshake = Query::<Handshake>::try_from_uri(&uri).map(|Query(h)| h).unwrap_or_else(|e| {
        debug!(err = %e, "malformed realtime handshake query");
        Handshake::default()
    });
    let identity = match admission::admit(&handshake) {
        Ok(identity) => identity,
        Err(code) => {
            debug!("rejected realtime connection without userId");
            return code.to_http_response("userId is required in query").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_connection(state, identity, socket)).into_response()
}

/// Per-connection loop.
///
/// Registers on entry, forwards everything the registry publishes for this
/// connection, and unregisters on any exit path: client close, network error,
/// idle timeout, or server shutdown.
async fn handle_connection(state: Arc<PresenceState>, identity: Identity, socket: WebSocket) {
    let (handle, mut inbox) = ConnectionHandle::channel(state.config.outbox_capacity);
    let connection = handle.id;
    let (mut ws_tx, mut ws_rx) = socket.split();

    match state.registry.register(&identity, &handle) {
        RegisterOutcome::Added { came_online, report } => {
            info!(%identity, %connection, came_online, delivered = report.delivered, "user connected");
        }
        // Fresh connection ids never collide; nothing was registered.
        other => {
            warn!(%identity, %connection, outcome = ?other, "connection not registered");
            return;
        }
    }
    drop(handle);

    let ping_interval = state.config.ping_interval();
    let idle_timeout = state.config.idle_timeout();
    let mut heartbeat = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_seen = Instant::now();

    loop {
        let event = tokio::select! {
            _ = state.shutdown.cancelled() => break,

            changed = inbox.presence.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = inbox.presence.borrow_and_update().clone();
                ServerEvent::OnlineUsers(online)
            }

            event = inbox.events.recv() => {
                let Some(event) = event else { break };
                event
            }

            _ = heartbeat.tick() => {
                if last_seen.elapsed() >= idle_timeout {
                    info!(%identity, %connection, "closing idle realtime connection");
                    break;
                }
                if ws_tx.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
                continue;
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(%connection, err = %e, "realtime socket error");
                        break;
                    }
                    // Any frame, pongs included, proves the client is alive.
                    Some(Ok(_)) => last_seen = Instant::now(),
                }
                continue;
            }
        };

        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%connection, err = %e, "failed to encode event");
                continue;
            }
        };
        if ws_tx.send(Message::Text(frame.into())).await.is_err() {
            break;
        }
    }

    // The socket is done; close the inbox so the departure broadcast skips it.
    drop(inbox);
    match state.registry.unregister(connection) {
        UnregisterOutcome::Removed { went_offline, report, .. } => {
            info!(%identity, %connection, went_offline, delivered = report.delivered, "user disconnected");
        }
        UnregisterOutcome::Stale => debug!(%identity, %connection, "connection already unregistered"),
    }
    let _ = ws_tx.close().await;
}
