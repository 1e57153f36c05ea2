// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime wrapper that drives a [`SessionController`] from one task.

use std::sync::Arc;

use pulse_protocol::{Identity, MessageNotice};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::auth::IdentitySession;
use crate::config::ClientConfig;
use crate::controller::{SessionController, SessionView};
use crate::error::ClientError;
use crate::link::{Connector, LinkEvent};
use crate::unseen::UnseenCounts;

enum Command {
    SignIn(IdentitySession),
    Logout(oneshot::Sender<()>),
    OpenConversation(Identity),
    CloseConversation,
}

/// Handle to a running session task.
///
/// Dropping the handle cancels the task, which closes any open link.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
    unseen: watch::Receiver<UnseenCounts>,
    messages: broadcast::Sender<MessageNotice>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Spawn the session task. Must be called from within a tokio runtime.
pub fn spawn_session(connector: Arc<dyn Connector>, config: &ClientConfig) -> SessionHandle {
    let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
    let controller = SessionController::new(connector, events_tx, config);
    let view = controller.subscribe_view();
    let unseen = controller.subscribe_unseen();
    let messages = controller.messages();

    let (commands, commands_rx) = mpsc::channel(32);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_session(controller, commands_rx, events_rx, cancel.clone()));

    SessionHandle { commands, view, unseen, messages, cancel, task: Some(task) }
}

impl SessionHandle {
    pub async fn sign_in(&self, session: IdentitySession) -> anyhow::Result<()> {
        self.send(Command::SignIn(session)).await
    }

    /// Log out and wait until the link is closed and published state cleared.
    pub async fn logout(&self) -> anyhow::Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(Command::Logout(ack_tx)).await?;
        ack_rx.await.map_err(|_| anyhow::Error::new(ClientError::SessionClosed))
    }

    pub async fn open_conversation(&self, peer: impl Into<Identity>) -> anyhow::Result<()> {
        self.send(Command::OpenConversation(peer.into())).await
    }

    pub async fn close_conversation(&self) -> anyhow::Result<()> {
        self.send(Command::CloseConversation).await
    }

    pub fn view(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    pub fn unseen(&self) -> watch::Receiver<UnseenCounts> {
        self.unseen.clone()
    }

    /// Inbound message notices, including those for the open conversation.
    pub fn messages(&self) -> broadcast::Receiver<MessageNotice> {
        self.messages.subscribe()
    }

    /// Stop the task and wait for it to close its link.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    async fn send(&self, command: Command) -> anyhow::Result<()> {
        self.commands.send(command).await.map_err(|_| anyhow::Error::new(ClientError::SessionClosed))
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_session(
    mut controller: SessionController,
    mut commands: mpsc::Receiver<Command>,
    mut events: mpsc::Receiver<LinkEvent>,
    cancel: CancellationToken,
) {
    loop {
        let deadline = controller.reconnect_deadline();
        tokio::select! {
            _ = cancel.cancelled() => break,
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::SignIn(session) => controller.sign_in(session),
                    Command::Logout(ack) => {
                        controller.logout();
                        let _ = ack.send(());
                    }
                    Command::OpenConversation(peer) => controller.open_conversation(peer),
                    Command::CloseConversation => controller.close_conversation(),
                }
            }
            Some(event) = events.recv() => controller.handle_link_event(event),
            _ = sleep_until(deadline) => {
                controller.reconnect_due(Instant::now());
            }
        }
    }

    debug!("session task stopping");
    controller.shutdown();
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
