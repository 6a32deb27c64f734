//! Realtime messaging layer: publish/subscribe over WebSocket.
//!
//! The channel is independent of HTTP routing. Handlers subscribe to
//! named messages at setup time (the subscription table is frozen before
//! serving); room membership stays dynamic for the process lifetime.

pub mod channel;
pub mod connection;
pub mod connection_id;
pub mod handler;
pub mod messages;
pub mod rooms;

pub use channel::{ChannelBuilder, MessageHandler, RealtimeChannel, Subscriber};
pub use connection_id::ConnectionId;
pub use messages::SocketMessage;
