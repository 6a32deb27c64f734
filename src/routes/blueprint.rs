//! Named, prefix-mounted route groups.
//!
//! A [`Blueprint`] collects related routes under a common prefix and
//! registers them into the [`RouteRegistry`] in one mounting step, so a
//! feature module can be wired into the facade as a single value.

use std::fmt;

use axum::routing::MethodRouter;

use super::registry::RouteRegistry;
use crate::app_state::AppState;
use crate::error::ServerError;

/// A named group of routes sharing a URL prefix.
pub struct Blueprint {
    name: &'static str,
    prefix: &'static str,
    routes: Vec<(&'static str, MethodRouter<AppState>)>,
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl Blueprint {
    /// Creates an empty blueprint. `prefix` is prepended to every route
    /// path at mount time (`"/"` means no prefix).
    #[must_use]
    pub fn new(name: &'static str, prefix: &'static str) -> Self {
        Self {
            name,
            prefix,
            routes: Vec::new(),
        }
    }

    /// Adds a route relative to the blueprint prefix.
    #[must_use]
    pub fn route(mut self, path: &'static str, handler: MethodRouter<AppState>) -> Self {
        self.routes.push((path, handler));
        self
    }

    /// Blueprint name, used for endpoint naming and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registers every route of this blueprint into `registry` under
    /// `<prefix><path>`, named `<blueprint>.<endpoint>`.
    ///
    /// # Errors
    ///
    /// Propagates the first registration failure; earlier routes of the
    /// blueprint remain registered (setup aborts anyway on error).
    pub fn mount(self, registry: &mut RouteRegistry) -> Result<(), ServerError> {
        tracing::debug!(blueprint = self.name, routes = self.routes.len(), "mounting blueprint");
        for (path, handler) in self.routes {
            let full = if self.prefix == "/" {
                path.to_string()
            } else {
                format!("{}{path}", self.prefix)
            };
            let endpoint = format!(
                "{}.{}",
                self.name,
                path.trim_start_matches('/').replace('/', ".")
            );
            registry.register_named(&full, &endpoint, handler)?;
        }
        Ok(())
    }
}
