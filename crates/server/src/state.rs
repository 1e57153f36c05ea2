// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::registry::ConnectionRegistry;

/// Shared server state handed to every route.
pub struct PresenceState {
    pub registry: ConnectionRegistry,
    pub config: ServerConfig,
    pub shutdown: CancellationToken,
}

impl PresenceState {
    pub fn new(config: ServerConfig, shutdown: CancellationToken) -> Self {
        Self { registry: ConnectionRegistry::new(), config, shutdown }
    }
}
