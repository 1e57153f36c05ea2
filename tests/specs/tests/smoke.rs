// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `pulse-server` binary and
//! exercise its HTTP and WebSocket surfaces.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use pulse_client::{spawn_session, ClientConfig, IdentitySession, WsConnector};
use pulse_protocol::{Identity, ServerEvent};
use pulse_specs::PulseProcess;

const TIMEOUT: Duration = Duration::from_secs(10);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_event(ws: &mut WsStream) -> anyhow::Result<ServerEvent> {
    loop {
        let msg = tokio::time::timeout(TIMEOUT, ws.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("ws stream ended"))??;
        match msg {
            Message::Text(text) => {
                return ServerEvent::from_frame(&text)
                    .ok_or_else(|| anyhow::anyhow!("unexpected frame: {text}"));
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => anyhow::bail!("expected text ws message, got: {other:?}"),
        }
    }
}

// -- HTTP ---------------------------------------------------------------------

#[tokio::test]
async fn http_status() -> anyhow::Result<()> {
    let pulse = PulseProcess::start()?;
    pulse.wait_healthy(TIMEOUT).await?;

    let body = reqwest::get(format!("{}/api/status", pulse.base_url())).await?.text().await?;

    assert_eq!(body, "Server is live!");
    Ok(())
}

#[tokio::test]
async fn http_health() -> anyhow::Result<()> {
    let pulse = PulseProcess::start()?;
    pulse.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/api/v1/health", pulse.base_url())).await?.json().await?;

    assert_eq!(resp["status"], "running");
    assert_eq!(resp["online_count"], 0);
    assert_eq!(resp["connection_count"], 0);
    Ok(())
}

#[tokio::test]
async fn invalid_config_exits_with_usage_code() -> anyhow::Result<()> {
    let mut pulse = PulseProcess::start_with(&["--outbox-capacity", "0"])?;

    let status = pulse.wait_exit(TIMEOUT).await?;

    assert_eq!(status.code(), Some(2));
    Ok(())
}

// -- WebSocket ----------------------------------------------------------------

#[tokio::test]
async fn ws_without_user_id_is_refused() -> anyhow::Result<()> {
    let pulse = PulseProcess::start()?;
    pulse.wait_healthy(TIMEOUT).await?;

    let url = format!("ws://127.0.0.1:{}/ws", pulse.port());
    let result = tokio_tungstenite::connect_async(url).await;

    assert!(result.is_err(), "connection without userId should be refused");
    Ok(())
}

#[tokio::test]
async fn ws_presence_follows_connections() -> anyhow::Result<()> {
    let pulse = PulseProcess::start()?;
    pulse.wait_healthy(TIMEOUT).await?;

    let (mut u1, _) = tokio_tungstenite::connect_async(pulse.ws_url("U1")).await?;
    assert_eq!(next_event(&mut u1).await?, ServerEvent::OnlineUsers(vec![Identity::from("U1")]));

    let (u2, _) = tokio_tungstenite::connect_async(pulse.ws_url("U2")).await?;
    assert_eq!(
        next_event(&mut u1).await?,
        ServerEvent::OnlineUsers(vec![Identity::from("U1"), Identity::from("U2")])
    );

    drop(u2);
    assert_eq!(next_event(&mut u1).await?, ServerEvent::OnlineUsers(vec![Identity::from("U1")]));
    Ok(())
}

#[tokio::test]
async fn client_session_against_binary() -> anyhow::Result<()> {
    let pulse = PulseProcess::start()?;
    pulse.wait_healthy(TIMEOUT).await?;

    let base = pulse.base_url();
    let handle = spawn_session(Arc::new(WsConnector::new(&base)), &ClientConfig::new(&base));
    handle.sign_in(IdentitySession::new("alice")).await?;

    let mut view = handle.view();
    tokio::time::timeout(TIMEOUT, view.wait_for(|v| v.online == vec![Identity::from("alice")]))
        .await??;

    let online: Vec<String> =
        reqwest::get(format!("{base}/api/v1/online")).await?.json().await?;
    assert_eq!(online, vec!["alice".to_owned()]);

    handle.logout().await?;
    let client = reqwest::Client::new();
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        let online: Vec<String> =
            client.get(format!("{base}/api/v1/online")).send().await?.json().await?;
        if online.is_empty() {
            break;
        }
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("alice never went offline");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    handle.shutdown().await;
    Ok(())
}
