//! Type-safe realtime connection identifier.
//!
//! [`ConnectionId`] is assigned on WebSocket upgrade and immutable for
//! the connection's lifetime. Everything outside the room table treats
//! it as an opaque token; its only structure is [`personal_room`], the
//! room name that targets exactly this client.
//!
//! [`personal_room`]: ConnectionId::personal_room

use std::fmt;

use serde::Serialize;

/// Unique identifier for a realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Assigns a fresh identifier (UUID v4 underneath).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Name of this connection's personal room.
    ///
    /// Every connection auto-joins this room on attach, so emitting to
    /// it delivers to exactly this client.
    #[must_use]
    pub fn personal_room(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
