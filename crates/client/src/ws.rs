// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket connector for the realtime channel.

use futures_util::{SinkExt, StreamExt};
use pulse_protocol::{Identity, ServerEvent, USER_ID_PARAM};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::link::{Connector, Link, LinkEvent, LinkId};

/// Dials `ws(s)://<server>/ws?userId=<identity>` with `tokio-tungstenite`.
pub struct WsConnector {
    server_url: String,
}

impl WsConnector {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self { server_url: server_url.into() }
    }
}

impl Connector for WsConnector {
    fn connect(
        &self,
        link: LinkId,
        identity: &Identity,
        events: mpsc::Sender<LinkEvent>,
    ) -> Box<dyn Link> {
        let cancel = CancellationToken::new();
        let url = build_ws_url(&self.server_url, identity);
        tokio::spawn(run_link(link, url, events, cancel.clone()));
        Box::new(WsLink { id: link, cancel })
    }
}

/// Handle to a spawned WebSocket task. Closing (or dropping) cancels it.
struct WsLink {
    id: LinkId,
    cancel: CancellationToken,
}

impl Link for WsLink {
    fn id(&self) -> LinkId {
        self.id
    }

    fn close(&mut self) {
        self.cancel.cancel();
    }
}

impl Drop for WsLink {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_link(
    link: LinkId,
    url: anyhow::Result<Url>,
    events: mpsc::Sender<LinkEvent>,
    cancel: CancellationToken,
) {
    let url = match url {
        Ok(url) => url,
        Err(e) => {
            let _ = events.send(LinkEvent::Closed { link, reason: Some(format!("{e:#}")) }).await;
            return;
        }
    };

    let dialed = tokio::select! {
        // Cancelled mid-handshake: the controller has already moved on.
        _ = cancel.cancelled() => return,
        result = tokio_tungstenite::connect_async(url.as_str()) => result,
    };
    let ws = match dialed {
        Ok((ws, _)) => ws,
        Err(e) => {
            debug!(%link, err = %e, "realtime connect failed");
            let _ = events.send(LinkEvent::Closed { link, reason: Some(e.to_string()) }).await;
            return;
        }
    };
    if events.send(LinkEvent::Opened { link }).await.is_err() {
        return;
    }

    let (mut ws_tx, mut ws_rx) = ws.split();
    let reason = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                let _ = ws_tx.close().await;
                return;
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Some(event) = ServerEvent::from_frame(&text) else {
                            debug!(%link, "ignoring unrecognised frame");
                            continue;
                        };
                        if events.send(LinkEvent::Event { link, event }).await.is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => break frame.map(|f| f.reason.to_string()),
                    None => break None,
                    Some(Err(e)) => break Some(e.to_string()),
                    _ => {} // ping/pong/binary
                }
            }
        }
    };

    debug!(%link, reason = reason.as_deref().unwrap_or(""), "realtime link closed by peer");
    let _ = events.send(LinkEvent::Closed { link, reason }).await;
}

/// Build the realtime URL from an HTTP base URL, carrying the identity claim
/// as the `userId` handshake parameter.
pub fn build_ws_url(server_url: &str, identity: &Identity) -> anyhow::Result<Url> {
    let base = server_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_owned()
    };

    let mut url = Url::parse(&format!("{ws_base}/ws"))?;
    url.query_pairs_mut().append_pair(USER_ID_PARAM, identity.as_str());
    Ok(url)
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
