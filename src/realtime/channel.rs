//! Publish/subscribe facade over WebSocket connections.
//!
//! Subscriptions are collected into a [`ChannelBuilder`] during setup and
//! frozen into an immutable [`RealtimeChannel`] before serving begins
//! (the same write-before-serve discipline as the route registry). Room
//! membership stays dynamic and lives in the channel's [`RoomTable`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::connection_id::ConnectionId;
use super::messages::SocketMessage;
use super::rooms::RoomTable;

/// A handler invoked whenever a client sends its subscribed message.
///
/// Implemented automatically for matching closures. Handlers may emit
/// through the channel they receive; emission is fire-and-forget.
pub trait MessageHandler: Send + Sync {
    /// Handles one inbound message. `sender` is the originating
    /// connection; `data` is the envelope payload.
    fn handle(&self, channel: &RealtimeChannel, sender: ConnectionId, data: &serde_json::Value);
}

impl<F> MessageHandler for F
where
    F: Fn(&RealtimeChannel, ConnectionId, &serde_json::Value) + Send + Sync,
{
    fn handle(&self, channel: &RealtimeChannel, sender: ConnectionId, data: &serde_json::Value) {
        self(channel, sender, data);
    }
}

/// Mutable subscription table, alive between setup start and
/// [`ChannelBuilder::build`].
pub struct ChannelBuilder {
    handlers: HashMap<String, Vec<Arc<dyn MessageHandler>>>,
    buffer: usize,
}

impl fmt::Debug for ChannelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelBuilder")
            .field("events", &self.handlers.keys().collect::<Vec<_>>())
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl ChannelBuilder {
    /// Creates an empty builder. `buffer` is the per-connection outbound
    /// queue capacity.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            handlers: HashMap::new(),
            buffer,
        }
    }

    /// Registers `handler` for the named message. Multiple handlers per
    /// name are invoked in registration order.
    pub fn subscribe(&mut self, event: impl Into<String>, handler: impl MessageHandler + 'static) {
        let event = event.into();
        tracing::debug!(event, "realtime handler subscribed");
        self.handlers.entry(event).or_default().push(Arc::new(handler));
    }

    /// Returns a two-step subscription object for `event`, mirroring
    /// [`crate::routes::RouteRegistry::registrar`].
    pub fn subscriber(&mut self, event: impl Into<String>) -> Subscriber<'_> {
        Subscriber {
            builder: self,
            event: event.into(),
        }
    }

    /// Number of handlers subscribed to `event`.
    #[must_use]
    pub fn subscription_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    /// Freezes the subscription table into an immutable channel.
    #[must_use]
    pub fn build(self) -> RealtimeChannel {
        RealtimeChannel {
            inner: Arc::new(ChannelInner {
                handlers: self.handlers,
                rooms: RoomTable::new(),
                buffer: self.buffer,
            }),
        }
    }
}

/// Two-step subscription for a fixed message name; see
/// [`ChannelBuilder::subscriber`].
pub struct Subscriber<'a> {
    builder: &'a mut ChannelBuilder,
    event: String,
}

impl fmt::Debug for Subscriber<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("event", &self.event).finish()
    }
}

impl Subscriber<'_> {
    /// Applies `handler` to the captured message name.
    pub fn apply(self, handler: impl MessageHandler + 'static) {
        self.builder.subscribe(self.event, handler);
    }
}

struct ChannelInner {
    handlers: HashMap<String, Vec<Arc<dyn MessageHandler>>>,
    rooms: RoomTable,
    buffer: usize,
}

/// Immutable realtime channel shared by all connection tasks.
///
/// Cheap to clone (`Arc` inside). Subscriptions are read-only after
/// [`ChannelBuilder::build`]; only room membership mutates at runtime.
#[derive(Clone)]
pub struct RealtimeChannel {
    inner: Arc<ChannelInner>,
}

impl fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("events", &self.inner.handlers.keys().collect::<Vec<_>>())
            .field("connections", &self.inner.rooms.connection_count())
            .finish()
    }
}

impl RealtimeChannel {
    /// Pushes `data` under `event` to every connection in `room` (all
    /// connections when `None`), never delivering to `skip`.
    ///
    /// Fire-and-forget: no acknowledgment, no delivery guarantee. Frames
    /// for connections with a full outbound queue are dropped with a
    /// warning.
    pub fn emit(
        &self,
        event: &str,
        data: serde_json::Value,
        room: Option<&str>,
        skip: Option<ConnectionId>,
    ) {
        let message = SocketMessage::new(event, data);
        for tx in self.inner.rooms.senders_for(room, skip) {
            match tx.try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(event, "outbound queue full; frame dropped");
                }
                // Receiver gone: the connection is tearing down.
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
    }

    /// Adds `id` to `room`.
    pub fn join(&self, room: &str, id: ConnectionId) {
        self.inner.rooms.join(room, id);
    }

    /// Removes `id` from `room`.
    pub fn leave(&self, room: &str, id: ConnectionId) {
        self.inner.rooms.leave(room, id);
    }

    /// Returns `true` if `id` is a member of `room`.
    #[must_use]
    pub fn is_member(&self, room: &str, id: ConnectionId) -> bool {
        self.inner.rooms.is_member(room, id)
    }

    /// Number of attached connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.rooms.connection_count()
    }

    /// Invokes every handler subscribed to the message's event. Returns
    /// `false` when no handler is subscribed.
    pub(crate) fn dispatch(&self, sender: ConnectionId, message: &SocketMessage) -> bool {
        let Some(handlers) = self.inner.handlers.get(&message.event) else {
            return false;
        };
        for handler in handlers {
            handler.handle(self, sender, &message.data);
        }
        true
    }

    /// Registers a connection's outbound queue, returning its receiver.
    pub(crate) fn attach(&self, id: ConnectionId) -> mpsc::Receiver<SocketMessage> {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner.rooms.attach(id, tx);
        rx
    }

    /// Removes a connection from the table and all rooms.
    pub(crate) fn detach(&self, id: ConnectionId) {
        self.inner.rooms.detach(id);
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn channel() -> RealtimeChannel {
        ChannelBuilder::new(8).build()
    }

    #[tokio::test]
    async fn emit_broadcasts_to_all_connections() {
        let channel = channel();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let mut rx_a = channel.attach(a);
        let mut rx_b = channel.attach(b);

        channel.emit("ping", serde_json::json!({}), None, None);

        let Some(msg_a) = rx_a.recv().await else {
            panic!("a received nothing");
        };
        let Some(msg_b) = rx_b.recv().await else {
            panic!("b received nothing");
        };
        assert_eq!(msg_a.event, "ping");
        assert_eq!(msg_b.event, "ping");
    }

    #[tokio::test]
    async fn emit_to_room_skips_excluded_member() {
        let channel = channel();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let mut rx_a = channel.attach(a);
        let mut rx_b = channel.attach(b);
        channel.join("lobby", a);
        channel.join("lobby", b);

        channel.emit("chat", serde_json::json!({ "text": "hi" }), Some("lobby"), Some(a));

        let Some(msg_b) = rx_b.recv().await else {
            panic!("b received nothing");
        };
        assert_eq!(msg_b.event, "chat");
        // The excluded sender gets nothing even though it is a room member.
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn personal_room_targets_one_connection() {
        let channel = channel();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let mut rx_a = channel.attach(a);
        let mut rx_b = channel.attach(b);

        channel.emit("direct", serde_json::json!(1), Some(&a.personal_room()), None);

        let Some(msg) = rx_a.recv().await else {
            panic!("a received nothing");
        };
        assert_eq!(msg.event, "direct");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn dispatch_invokes_subscribed_handlers() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let mut builder = ChannelBuilder::new(8);
        builder.subscribe(
            "tick",
            move |_channel: &RealtimeChannel, _sender: ConnectionId, _data: &serde_json::Value| {
                seen.fetch_add(1, Ordering::SeqCst);
            },
        );
        let channel = builder.build();

        let handled = channel.dispatch(
            ConnectionId::new(),
            &SocketMessage::new("tick", serde_json::json!({})),
        );
        assert!(handled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_without_handler_reports_unhandled() {
        let channel = channel();
        let handled = channel.dispatch(
            ConnectionId::new(),
            &SocketMessage::new("ghost", serde_json::json!({})),
        );
        assert!(!handled);
    }

    #[test]
    fn subscriber_applies_to_captured_event() {
        let mut builder = ChannelBuilder::new(8);
        builder.subscriber("tick").apply(
            |_channel: &RealtimeChannel, _sender: ConnectionId, _data: &serde_json::Value| {},
        );
        assert_eq!(builder.subscription_count("tick"), 1);
        assert_eq!(builder.subscription_count("tock"), 0);
    }

    #[tokio::test]
    async fn handler_can_emit_back_through_channel() {
        let mut builder = ChannelBuilder::new(8);
        builder.subscribe(
            "echo",
            |channel: &RealtimeChannel, sender: ConnectionId, data: &serde_json::Value| {
                channel.emit("echo", data.clone(), Some(&sender.personal_room()), None);
            },
        );
        let channel = builder.build();

        let id = ConnectionId::new();
        let mut rx = channel.attach(id);
        channel.dispatch(id, &SocketMessage::new("echo", serde_json::json!("hello")));

        let Some(msg) = rx.recv().await else {
            panic!("no echo received");
        };
        assert_eq!(msg.data, serde_json::json!("hello"));
    }
}
