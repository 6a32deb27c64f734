//! # beacon-server
//!
//! HTTP and realtime messaging server facade with plugin-based route
//! registration.
//!
//! The crate wires a web framework (axum), a realtime WebSocket channel,
//! and a SQLite initializer into a single process entry point. Routes are
//! contributed by an explicit, ordered list of plugins at setup time; the
//! route table and the realtime subscription table are frozen into
//! immutable structures before the server starts accepting traffic.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket /socketio)
//!     │
//!     ├── Route Registry (routes/) ──► axum Router
//!     ├── Realtime Channel (realtime/)
//!     │
//!     ├── Plugins (plugins/)  ── registered once at setup
//!     ├── Auth Blueprint (auth)
//!     │
//!     └── SQLite (db)
//! ```

pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod plugins;
pub mod realtime;
pub mod routes;
pub mod server;
