//! Route registration layer: registry, navigation index, and blueprints.
//!
//! Routes are collected into a [`RouteRegistry`] during setup and frozen
//! into an axum `Router` plus an immutable [`RouteIndex`] before the
//! server begins accepting traffic.

pub mod blueprint;
pub mod registry;

pub use blueprint::Blueprint;
pub use registry::{Registrar, Route, RouteIndex, RouteRegistry};
