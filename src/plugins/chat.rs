//! Chat plugin: room membership and no-echo rebroadcast over the
//! realtime channel.
//!
//! Subscribes three messages:
//! - `join` — `{ "room": name }` adds the sender to the room and notifies
//!   the other members.
//! - `leave` — `{ "room": name }` removes the sender.
//! - `chat` — rebroadcasts the payload to the sender's room, excluding
//!   the sender so clients do not hear their own messages echoed.

use serde_json::Value;

use super::Plugin;
use crate::error::ServerError;
use crate::realtime::{ChannelBuilder, ConnectionId, RealtimeChannel};
use crate::routes::RouteRegistry;

/// Registers the chat message handlers.
#[derive(Debug)]
pub struct ChatPlugin;

impl Plugin for ChatPlugin {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn register(
        &self,
        _routes: &mut RouteRegistry,
        realtime: &mut ChannelBuilder,
    ) -> Result<(), ServerError> {
        realtime.subscribe("join", handle_join);
        realtime.subscribe("leave", handle_leave);
        realtime.subscriber("chat").apply(handle_chat);
        Ok(())
    }
}

fn room_of(data: &Value) -> Option<&str> {
    data.get("room").and_then(Value::as_str)
}

fn handle_join(channel: &RealtimeChannel, sender: ConnectionId, data: &Value) {
    let Some(room) = room_of(data) else {
        tracing::debug!(connection = %sender, "join without room field dropped");
        return;
    };
    channel.join(room, sender);
    channel.emit(
        "joined",
        serde_json::json!({ "room": room, "connection": sender }),
        Some(room),
        Some(sender),
    );
}

fn handle_leave(channel: &RealtimeChannel, sender: ConnectionId, data: &Value) {
    let Some(room) = room_of(data) else {
        return;
    };
    channel.leave(room, sender);
}

fn handle_chat(channel: &RealtimeChannel, sender: ConnectionId, data: &Value) {
    let Some(room) = room_of(data) else {
        tracing::debug!(connection = %sender, "chat without room field dropped");
        return;
    };
    // No echo back to the sender.
    channel.emit("chat", data.clone(), Some(room), Some(sender));
}
