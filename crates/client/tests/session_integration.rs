// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client sessions driving real WebSocket links against an in-process server.

use std::sync::Arc;
use std::time::Duration;

use pulse_client::{
    spawn_session, ClientConfig, ConnectionState, IdentitySession, SessionHandle, SessionView,
    UnseenCounts, WsConnector,
};
use pulse_protocol::Identity;
use pulse_server::state::PresenceState;
use pulse_server::test_support::{spawn_http_server, test_state};
use serde_json::json;

const WAIT: Duration = Duration::from_secs(5);

fn session(base: &str) -> SessionHandle {
    spawn_session(Arc::new(WsConnector::new(base)), &ClientConfig::new(base))
}

fn ids(names: &[&str]) -> Vec<Identity> {
    names.iter().map(|n| Identity::from(*n)).collect()
}

async fn wait_view(
    handle: &SessionHandle,
    pred: impl FnMut(&SessionView) -> bool,
) -> anyhow::Result<SessionView> {
    let mut view = handle.view();
    let seen = tokio::time::timeout(WAIT, view.wait_for(pred)).await??;
    Ok(seen.clone())
}

async fn wait_unseen(
    handle: &SessionHandle,
    pred: impl FnMut(&UnseenCounts) -> bool,
) -> anyhow::Result<UnseenCounts> {
    let mut unseen = handle.unseen();
    let seen = tokio::time::timeout(WAIT, unseen.wait_for(pred)).await??;
    Ok(seen.clone())
}

async fn wait_server(
    state: &Arc<PresenceState>,
    cond: impl Fn(&PresenceState) -> bool,
) -> anyhow::Result<()> {
    tokio::time::timeout(WAIT, async {
        while !cond(state) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok(())
}

async fn notify(base: &str, receiver: &str, message: serde_json::Value) -> anyhow::Result<u64> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let reply: serde_json::Value = reqwest::Client::new()
        .post(format!("{base}/api/v1/notify"))
        .json(&json!({ "receiverId": receiver, "message": message }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    reply["delivered"].as_u64().ok_or_else(|| anyhow::anyhow!("bad notify reply: {reply}"))
}

#[tokio::test]
async fn two_clients_see_each_other() -> anyhow::Result<()> {
    let state = test_state();
    let (addr, _server) = spawn_http_server(Arc::clone(&state)).await?;
    let base = format!("http://{addr}");

    let alice = session(&base);
    alice.sign_in(IdentitySession::new("alice")).await?;
    wait_view(&alice, |v| v.online == ids(&["alice"])).await?;

    let bob = session(&base);
    bob.sign_in(IdentitySession::new("bob")).await?;

    let seen = wait_view(&alice, |v| v.online == ids(&["alice", "bob"])).await?;
    assert_eq!(seen.state, ConnectionState::Connected);
    assert_eq!(seen.connection.map(|c| c.identity), Some(Identity::from("alice")));
    wait_view(&bob, |v| v.online == ids(&["alice", "bob"])).await?;

    alice.shutdown().await;
    bob.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn logout_takes_identity_offline() -> anyhow::Result<()> {
    let state = test_state();
    let (addr, _server) = spawn_http_server(Arc::clone(&state)).await?;
    let base = format!("http://{addr}");

    let alice = session(&base);
    let bob = session(&base);
    alice.sign_in(IdentitySession::new("alice")).await?;
    bob.sign_in(IdentitySession::new("bob")).await?;
    wait_view(&alice, |v| v.online.len() == 2).await?;

    bob.logout().await?;

    assert_eq!(*bob.view().borrow(), SessionView::default());
    wait_view(&alice, |v| v.online == ids(&["alice"])).await?;
    wait_server(&state, |s| !s.registry.is_online(&Identity::from("bob"))).await?;

    alice.shutdown().await;
    wait_server(&state, |s| s.registry.connection_count() == 0).await?;
    bob.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn notify_raises_unseen_count() -> anyhow::Result<()> {
    let state = test_state();
    let (addr, _server) = spawn_http_server(Arc::clone(&state)).await?;
    let base = format!("http://{addr}");

    let alice = session(&base);
    let mut messages = alice.messages();
    alice.sign_in(IdentitySession::new("alice")).await?;
    // The snapshot only arrives once the server has registered the link.
    wait_view(&alice, |v| v.online.contains(&Identity::from("alice"))).await?;

    let delivered =
        notify(&base, "alice", json!({ "senderId": "bob", "receiverId": "alice", "text": "hi" }))
            .await?;
    assert_eq!(delivered, 1);

    let notice = tokio::time::timeout(WAIT, messages.recv()).await??;
    assert_eq!(notice.sender_id, Identity::from("bob"));
    assert_eq!(notice.body.get("text"), Some(&json!("hi")));
    let counts = wait_unseen(&alice, |c| c.contains_key(&Identity::from("bob"))).await?;
    assert_eq!(counts.get(&Identity::from("bob")), Some(&1));

    alice.open_conversation("bob").await?;
    wait_unseen(&alice, |c| c.get(&Identity::from("bob")) == Some(&0)).await?;

    alice.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn server_shutdown_drops_link_but_keeps_identity() -> anyhow::Result<()> {
    let state = test_state();
    let (addr, server) = spawn_http_server(Arc::clone(&state)).await?;
    let base = format!("http://{addr}");

    let alice = session(&base);
    alice.sign_in(IdentitySession::new("alice")).await?;
    wait_view(&alice, |v| v.state == ConnectionState::Connected).await?;

    state.shutdown.cancel();
    let _ = server.await;

    let view = wait_view(&alice, |v| v.state != ConnectionState::Connected).await?;
    assert!(view.online.is_empty());
    assert_eq!(view.identity, Some(Identity::from("alice")));

    alice.shutdown().await;
    Ok(())
}
