// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

/// Presence and realtime delivery server for the chat application.
#[derive(Debug, Clone, Parser)]
#[command(name = "pulse-server", version, about)]
pub struct ServerConfig {
    /// Host to bind on.
    #[arg(long, default_value = "0.0.0.0", env = "PULSE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 5000, env = "PORT")]
    pub port: u16,

    /// Allowed CORS origin. `*` allows any origin.
    #[arg(long, default_value = "*", env = "CORS_ORIGIN")]
    pub cors_origin: String,

    /// Per-connection outbound event queue depth before deliveries are dropped.
    #[arg(long, default_value_t = 64, env = "PULSE_OUTBOX_CAPACITY")]
    pub outbox_capacity: usize,

    /// Interval between server pings on each realtime connection (ms).
    #[arg(long, default_value_t = 25_000, env = "PULSE_PING_INTERVAL_MS")]
    pub ping_interval_ms: u64,

    /// Close a realtime connection after this long without any frame from
    /// the client, pongs included (ms).
    #[arg(long, default_value_t = 45_000, env = "PULSE_IDLE_TIMEOUT_MS")]
    pub idle_timeout_ms: u64,

    /// Log format (json or text).
    #[arg(long, default_value = "text", env = "PULSE_LOG_FORMAT")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "PULSE_LOG_LEVEL")]
    pub log_level: String,
}

impl ServerConfig {
    /// Config for in-process servers in tests: loopback, ephemeral port.
    pub fn test() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 0,
            cors_origin: "*".to_owned(),
            outbox_capacity: 64,
            ping_interval_ms: 25_000,
            idle_timeout_ms: 45_000,
            log_format: "text".to_owned(),
            log_level: "debug".to_owned(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.outbox_capacity == 0 {
            anyhow::bail!("--outbox-capacity must be at least 1");
        }
        if self.ping_interval_ms == 0 {
            anyhow::bail!("--ping-interval-ms must be at least 1");
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            anyhow::bail!("--idle-timeout-ms must exceed --ping-interval-ms");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        if self.cors_origin != "*" && axum::http::HeaderValue::from_str(&self.cors_origin).is_err()
        {
            anyhow::bail!("invalid CORS origin: {}", self.cors_origin);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
