//! Per-connection WebSocket loop.
//!
//! Each upgraded socket gets a [`ConnectionId`] and an outbound queue in
//! the channel's room table, then runs a select loop: inbound frames are
//! parsed and dispatched to subscribed handlers, queued outbound frames
//! are written to the socket.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::channel::RealtimeChannel;
use super::connection_id::ConnectionId;
use super::messages::SocketMessage;

/// Runs the read/write loop for a single realtime connection.
pub async fn run_connection(socket: WebSocket, channel: RealtimeChannel) {
    let id = ConnectionId::new();
    let mut out_rx = channel.attach(id);
    let (mut ws_tx, mut ws_rx) = socket.split();

    tracing::debug!(connection = %id, "realtime connection opened");

    loop {
        tokio::select! {
            // Inbound frame from the client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<SocketMessage>(&text) {
                            Ok(inbound) => {
                                if !channel.dispatch(id, &inbound) {
                                    tracing::debug!(
                                        connection = %id,
                                        event = inbound.event,
                                        "no handler subscribed; frame dropped"
                                    );
                                }
                            }
                            Err(_) => {
                                let frame = SocketMessage::error_frame("malformed JSON");
                                let json = serde_json::to_string(&frame).unwrap_or_default();
                                if ws_tx.send(Message::text(json)).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            // Outbound frame queued by an emit
            outbound = out_rx.recv() => {
                match outbound {
                    Some(frame) => {
                        let json = serde_json::to_string(&frame).unwrap_or_default();
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    channel.detach(id);
    tracing::debug!(connection = %id, "realtime connection closed");
}
