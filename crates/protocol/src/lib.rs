// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types shared by the presence server and its clients.

pub mod event;
pub mod identity;

pub use event::{events, MessageNotice, OnlineSet, ServerEvent, USER_ID_PARAM};
pub use identity::Identity;
