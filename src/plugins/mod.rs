//! Plugin registration: the explicit, enumerable replacement for
//! filesystem-based handler discovery.
//!
//! Each plugin contributes routes and realtime subscriptions through its
//! [`Plugin::register`] function. [`builtin`] returns the plugins in a
//! fixed order, and [`register_all`] invokes each exactly once at setup;
//! the first failure aborts setup (fatal, not retried). Nothing
//! deduplicates repeated invocation; the server facade calls this once
//! per process lifetime.

pub mod chat;
pub mod index;

use crate::error::ServerError;
use crate::realtime::ChannelBuilder;
use crate::routes::RouteRegistry;

/// A unit of route and subscription registration, invoked once at setup.
pub trait Plugin: Send + Sync {
    /// Stable plugin name, used in logs and error reports.
    fn name(&self) -> &'static str;

    /// Registers this plugin's routes and realtime subscriptions.
    ///
    /// # Errors
    ///
    /// Any error aborts setup, wrapped in [`ServerError::Plugin`].
    fn register(
        &self,
        routes: &mut RouteRegistry,
        realtime: &mut ChannelBuilder,
    ) -> Result<(), ServerError>;
}

/// The built-in plugins, in registration order.
#[must_use]
pub fn builtin() -> Vec<Box<dyn Plugin>> {
    vec![Box::new(index::IndexPlugin), Box::new(chat::ChatPlugin)]
}

/// Invokes every plugin's registration function in order.
///
/// # Errors
///
/// Stops at the first failing plugin and returns [`ServerError::Plugin`]
/// naming it; earlier registrations are not rolled back (setup aborts).
pub fn register_all(
    plugins: &[Box<dyn Plugin>],
    routes: &mut RouteRegistry,
    realtime: &mut ChannelBuilder,
) -> Result<(), ServerError> {
    for plugin in plugins {
        tracing::debug!(plugin = plugin.name(), "registering plugin");
        plugin
            .register(routes, realtime)
            .map_err(|source| ServerError::Plugin {
                name: plugin.name().to_string(),
                source: Box::new(source),
            })?;
    }
    tracing::info!(count = plugins.len(), "plugins registered");
    Ok(())
}
