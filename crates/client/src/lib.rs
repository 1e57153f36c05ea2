// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the presence layer: the session controller that owns the
//! realtime link, the unseen-count tracker, and the auth collaborator client.

pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod link;
pub mod session;
pub mod test_support;
pub mod unseen;
pub mod ws;

pub use auth::{AuthClient, AuthMode, IdentitySession};
pub use config::ClientConfig;
pub use controller::{ConnectionInfo, ConnectionState, SessionController, SessionView};
pub use error::ClientError;
pub use link::{Connector, Link, LinkEvent, LinkId};
pub use session::{spawn_session, SessionHandle};
pub use unseen::{UnseenCounts, UnseenTracker};
pub use ws::WsConnector;
