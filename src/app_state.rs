//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::realtime::RealtimeChannel;
use crate::routes::RouteIndex;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
///
/// Constructed once by the server facade after the route table and
/// subscription table are frozen; everything here is either immutable or
/// internally synchronized.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Frozen navigation listing of registered routes.
    pub routes: Arc<RouteIndex>,
    /// Realtime channel for out-of-band push messaging.
    pub channel: RealtimeChannel,
    /// SQLite connection pool.
    pub db: SqlitePool,
    /// Secret key, used as the pepper for password hashing.
    pub secret_key: String,
}
