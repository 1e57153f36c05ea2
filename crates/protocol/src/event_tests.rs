// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn online_users_frame_is_bit_exact() -> anyhow::Result<()> {
    let evt = ServerEvent::OnlineUsers(vec![Identity::from("U1"), Identity::from("U2")]);
    assert_eq!(evt.to_frame()?, r#"{"event":"getOnlineUsers","data":["U1","U2"]}"#);
    Ok(())
}

#[test]
fn empty_online_set_is_an_empty_array() -> anyhow::Result<()> {
    let evt = ServerEvent::OnlineUsers(vec![]);
    assert_eq!(evt.to_frame()?, r#"{"event":"getOnlineUsers","data":[]}"#);
    Ok(())
}

#[test]
fn new_message_passes_extra_fields_through() -> anyhow::Result<()> {
    let text = r#"{"event":"newMessage","data":{"senderId":"alice","receiverId":"bob","text":"hi"}}"#;
    let Some(ServerEvent::NewMessage(notice)) = ServerEvent::from_frame(text) else {
        anyhow::bail!("expected newMessage");
    };
    assert_eq!(notice.sender_id, Identity::from("alice"));
    assert_eq!(notice.body.get("text").and_then(|v| v.as_str()), Some("hi"));

    let json: serde_json::Value = serde_json::from_str(&ServerEvent::NewMessage(notice).to_frame()?)?;
    assert_eq!(json["data"]["senderId"], "alice");
    assert_eq!(json["data"]["receiverId"], "bob");
    Ok(())
}

#[test]
fn unknown_event_is_ignored() {
    assert!(ServerEvent::from_frame(r#"{"event":"typing","data":{}}"#).is_none());
    assert!(ServerEvent::from_frame("not json").is_none());
}

#[test]
fn event_names_match_wire_constants() {
    assert_eq!(ServerEvent::OnlineUsers(vec![]).name(), events::GET_ONLINE_USERS);
    assert_eq!(ServerEvent::NewMessage(MessageNotice::new("a")).name(), events::NEW_MESSAGE);
}
