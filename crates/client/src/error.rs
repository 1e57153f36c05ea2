// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Error codes surfaced by the client library.
///
/// Transport-level failures of the realtime channel never show up here: the
/// session controller absorbs them and republishes its state instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientError {
    /// The auth collaborator could not be reached or replied with a non-JSON body.
    Transport,
    /// The auth collaborator refused the credentials or token.
    Unauthorized,
    /// The auth collaborator's reply lacked a usable identity.
    BadResponse,
    /// The session task has already shut down.
    SessionClosed,
}

impl ClientError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "TRANSPORT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadResponse => "BAD_RESPONSE",
            Self::SessionClosed => "SESSION_CLOSED",
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for ClientError {}
