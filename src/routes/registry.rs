//! Central route table with explicit registration and freeze semantics.
//!
//! [`RouteRegistry`] is mutable during setup only. Duplicate paths are a
//! hard error (not last-write-wins), and once [`RouteRegistry::freeze`]
//! has run, late registration fails with `RegistryFrozen`: the route
//! table is written before serving begins and read-only afterwards.

use std::collections::BTreeMap;
use std::fmt;

use axum::Router;
use axum::routing::MethodRouter;

use crate::app_state::AppState;
use crate::error::ServerError;

/// A single registered route: URL path, endpoint name, and handler.
pub struct Route {
    /// URL path in axum syntax (e.g. `/user/{id}`).
    pub path: String,
    /// Endpoint name, derived from the path or given explicitly.
    pub name: String,
    method_router: MethodRouter<AppState>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Mutable route table, alive between setup start and freeze.
///
/// Keyed by path in a `BTreeMap` so iteration order is deterministic.
#[derive(Debug)]
pub struct RouteRegistry {
    routes: BTreeMap<String, Route>,
    static_url_path: String,
    frozen: bool,
}

impl RouteRegistry {
    /// Creates an empty registry. `static_url_path` is the static-asset
    /// mount prefix, which is excluded from [`Self::list_routes`].
    #[must_use]
    pub fn new(static_url_path: impl Into<String>) -> Self {
        Self {
            routes: BTreeMap::new(),
            static_url_path: static_url_path.into(),
            frozen: false,
        }
    }

    /// Registers `handler` at `path`, deriving the endpoint name from the
    /// final path segment.
    ///
    /// # Errors
    ///
    /// - [`ServerError::InvalidPath`] if the path is empty, relative, or
    ///   contains whitespace. The registry is left unchanged.
    /// - [`ServerError::DuplicateRoute`] if the path is already taken.
    /// - [`ServerError::RegistryFrozen`] after [`Self::freeze`].
    pub fn register(
        &mut self,
        path: &str,
        handler: MethodRouter<AppState>,
    ) -> Result<(), ServerError> {
        let name = derive_name(path);
        self.register_named(path, &name, handler)
    }

    /// Registers `handler` at `path` under an explicit endpoint name.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::register`].
    pub fn register_named(
        &mut self,
        path: &str,
        name: &str,
        handler: MethodRouter<AppState>,
    ) -> Result<(), ServerError> {
        if self.frozen {
            return Err(ServerError::RegistryFrozen(path.to_string()));
        }
        validate_path(path)?;
        if self.routes.contains_key(path) {
            return Err(ServerError::DuplicateRoute(path.to_string()));
        }
        tracing::debug!(path, name, "route registered");
        self.routes.insert(
            path.to_string(),
            Route {
                path: path.to_string(),
                name: name.to_string(),
                method_router: handler,
            },
        );
        Ok(())
    }

    /// Returns a two-step registration object for `path`.
    ///
    /// The explicit replacement for a decorator-or-direct calling
    /// convention: `registry.registrar("/x").apply(get(handler))` performs
    /// the same registration as [`Self::register`] and reports the result
    /// instead of silently discarding the handler.
    pub fn registrar(&mut self, path: impl Into<String>) -> Registrar<'_> {
        Registrar {
            registry: self,
            path: path.into(),
        }
    }

    /// Renders the fully-resolved URLs of all registered routes, sorted
    /// lexicographically, excluding the static-asset mount.
    ///
    /// Path parameters render as bracketed tokens: `/user/{id}` becomes
    /// `/user/[id]`.
    #[must_use]
    pub fn list_routes(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .routes
            .keys()
            .filter(|path| !is_under_mount(path, &self.static_url_path))
            .map(|path| render_path(path))
            .collect();
        urls.sort();
        urls
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Consumes the route table into an axum `Router` and an immutable
    /// [`RouteIndex`] for request-time navigation listings.
    ///
    /// The registry husk stays behind in the frozen state; any further
    /// registration attempt fails with `RegistryFrozen`.
    #[must_use]
    pub fn freeze(&mut self) -> (Router<AppState>, RouteIndex) {
        let index = RouteIndex {
            pages: self.list_routes(),
        };
        let routes = std::mem::take(&mut self.routes);
        self.frozen = true;

        let router = routes
            .into_values()
            .fold(Router::new(), |router, route| {
                router.route(&route.path, route.method_router)
            });
        (router, index)
    }
}

/// Two-step registration for a fixed path; see [`RouteRegistry::registrar`].
#[derive(Debug)]
pub struct Registrar<'a> {
    registry: &'a mut RouteRegistry,
    path: String,
}

impl Registrar<'_> {
    /// Applies `handler` to the captured path.
    ///
    /// # Errors
    ///
    /// Same conditions as [`RouteRegistry::register`].
    pub fn apply(self, handler: MethodRouter<AppState>) -> Result<(), ServerError> {
        self.registry.register(&self.path, handler)
    }
}

/// Immutable, shareable listing of registered routes, produced by
/// [`RouteRegistry::freeze`] and exposed to handlers via application
/// state.
#[derive(Debug, Clone)]
pub struct RouteIndex {
    pages: Vec<String>,
}

impl RouteIndex {
    /// Sorted navigation URLs (static mount excluded).
    #[must_use]
    pub fn pages(&self) -> &[String] {
        &self.pages
    }
}

/// Matches the mount path itself or anything below it, on a segment
/// boundary: `/public` and `/public/app.js` are under a `/public` mount,
/// `/publications` is not.
fn is_under_mount(path: &str, mount: &str) -> bool {
    path == mount
        || path
            .strip_prefix(mount)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Rejects empty, relative, and whitespace-containing paths.
fn validate_path(path: &str) -> Result<(), ServerError> {
    if path.is_empty() || !path.starts_with('/') || path.chars().any(char::is_whitespace) {
        return Err(ServerError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Renders `{param}` segments as `[param]` for human-readable listings.
fn render_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .map_or_else(|| segment.to_string(), |inner| format!("[{inner}]"))
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Derives an endpoint name from the last path segment (`root` for `/`).
fn derive_name(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .map_or_else(
            || "root".to_string(),
            |segment| segment.trim_matches(|c| c == '{' || c == '}').to_string(),
        )
}
