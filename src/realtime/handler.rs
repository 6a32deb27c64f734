//! Axum WebSocket upgrade handler for the realtime endpoint.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /socketio` — Upgrade HTTP connection to the realtime channel.
pub async fn socketio_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let channel = state.channel.clone();
    ws.on_upgrade(move |socket| run_connection(socket, channel))
}
