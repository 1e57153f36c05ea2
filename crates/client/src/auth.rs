// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity sessions and the HTTP client for the auth collaborator.
//!
//! The auth service itself (token issuance, password checks, profiles) lives
//! elsewhere. This module only turns its `check`/`login`/`signup` replies into
//! an [`IdentitySession`] the session controller can act on.

use std::sync::Once;
use std::time::Duration;

use anyhow::Context;
use pulse_protocol::Identity;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ClientError;

/// Header the auth collaborator reads the session token from.
pub const TOKEN_HEADER: &str = "token";

/// One authenticated actor, immutable for its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySession {
    pub identity: Identity,
    /// Bearer token for request/response calls, if the collaborator issued one.
    pub token: Option<String>,
    /// The collaborator's user object, passed through for the UI.
    pub profile: Value,
}

impl IdentitySession {
    pub fn new(identity: impl Into<Identity>) -> Self {
        Self { identity: identity.into(), token: None, profile: Value::Null }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Which credential endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

impl AuthMode {
    fn path(&self) -> &'static str {
        match self {
            Self::Login => "/api/auth/login",
            Self::Signup => "/api/auth/signup",
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthReply {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    /// `check` replies carry `user`, credential replies carry `userData`.
    #[serde(default, alias = "userData")]
    user: Option<Value>,
    #[serde(default)]
    token: Option<String>,
}

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// HTTP client for the auth collaborator.
pub struct AuthClient {
    http: reqwest::Client,
    base: String,
}

impl AuthClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        ensure_crypto();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building auth HTTP client")?;
        Ok(Self { http, base: base_url.trim_end_matches('/').to_owned() })
    }

    /// Validate a stored token (`GET /api/auth/check`).
    pub async fn check(&self, token: &str) -> anyhow::Result<IdentitySession> {
        let resp = self
            .http
            .get(format!("{}/api/auth/check", self.base))
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(|e| anyhow::Error::new(ClientError::Transport).context(e.to_string()))?;
        let reply = Self::read_reply(resp).await?;
        let mut session = Self::into_session(reply)?;
        session.token.get_or_insert_with(|| token.to_owned());
        Ok(session)
    }

    /// Exchange credentials for a session (`POST /api/auth/{login,signup}`).
    pub async fn login(&self, mode: AuthMode, credentials: &Value) -> anyhow::Result<IdentitySession> {
        let resp = self
            .http
            .post(format!("{}{}", self.base, mode.path()))
            .json(credentials)
            .send()
            .await
            .map_err(|e| anyhow::Error::new(ClientError::Transport).context(e.to_string()))?;
        let reply = Self::read_reply(resp).await?;
        Self::into_session(reply)
    }

    async fn read_reply(resp: reqwest::Response) -> anyhow::Result<AuthReply> {
        let status = resp.status();
        match resp.json::<AuthReply>().await {
            Ok(reply) => Ok(reply),
            Err(_) if status == reqwest::StatusCode::UNAUTHORIZED => {
                Err(anyhow::Error::new(ClientError::Unauthorized).context(status.to_string()))
            }
            Err(e) => Err(anyhow::Error::new(ClientError::Transport)
                .context(format!("auth reply ({status}): {e}"))),
        }
    }

    fn into_session(reply: AuthReply) -> anyhow::Result<IdentitySession> {
        if !reply.success {
            let message = reply.message.unwrap_or_else(|| "authentication failed".to_owned());
            return Err(anyhow::Error::new(ClientError::Unauthorized).context(message));
        }

        let profile = reply.user.unwrap_or(Value::Null);
        let id = profile
            .get("_id")
            .or_else(|| profile.get("id"))
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                anyhow::Error::new(ClientError::BadResponse).context("auth reply has no user id")
            })?;

        Ok(IdentitySession { identity: Identity::new(id), token: reply.token, profile })
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
