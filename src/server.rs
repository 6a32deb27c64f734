//! Server facade: lifecycle state machine composing routes, realtime,
//! and the database into one process entry point.
//!
//! The facade owns all collaborators explicitly (no module-level
//! singletons) and moves through
//! `UNINITIALIZED → CONFIGURED → RUNNING → SHUTTING_DOWN → STOPPED`.
//! Setup is fail-fast: any step aborting leaves the server unusable and
//! the error propagates to the process boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::routing::get;
use sqlx::SqlitePool;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::auth;
use crate::config::ServerConfig;
use crate::db;
use crate::error::ServerError;
use crate::plugins;
use crate::realtime::channel::{ChannelBuilder, RealtimeChannel};
use crate::realtime::handler::socketio_handler;
use crate::routes::RouteRegistry;

/// Lifecycle state of the server facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Created, not yet configured.
    Uninitialized,
    /// `setup()` completed; ready to serve.
    Configured,
    /// Accepting connections.
    Running,
    /// Shutdown signaled; draining.
    ShuttingDown,
    /// Serving ended.
    Stopped,
}

impl ServerState {
    /// Uppercase state name for errors and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Configured => "CONFIGURED",
            Self::Running => "RUNNING",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::Stopped => "STOPPED",
        }
    }
}

/// The server facade. Construct with [`Server::new`], then `setup`,
/// `run`, and (optionally, via [`Server::shutdown_handle`]) shut down
/// from another task.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: ServerState,
    router: Option<Router>,
    db: Option<SqlitePool>,
    channel: Option<RealtimeChannel>,
    shutdown_tx: Option<watch::Sender<bool>>,
    shutdown_rx: Option<watch::Receiver<bool>>,
    running: Arc<AtomicBool>,
}

impl Server {
    /// Creates an unconfigured server owning `config`.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            state: ServerState::Uninitialized,
            router: None,
            db: None,
            channel: None,
            shutdown_tx: None,
            shutdown_rx: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// The configuration this server was built with.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The realtime channel, available once setup has run.
    #[must_use]
    pub fn channel(&self) -> Option<&RealtimeChannel> {
        self.channel.as_ref()
    }

    /// Configures the server: mounts blueprints, builds the realtime
    /// channel, initializes the database (including the bootstrap
    /// account), registers all plugins, and freezes the route table into
    /// the request router.
    ///
    /// # Errors
    ///
    /// - [`ServerError::InvalidState`] unless the server is
    ///   `UNINITIALIZED`.
    /// - Any step's failure propagates unchanged and aborts setup.
    pub async fn setup(&mut self) -> Result<(), ServerError> {
        if self.state != ServerState::Uninitialized {
            return Err(ServerError::InvalidState {
                expected: ServerState::Uninitialized.as_str(),
                actual: self.state.as_str(),
            });
        }

        // Route table and blueprint mounting.
        let mut registry = RouteRegistry::new(self.config.static_url_path.clone());
        auth::blueprint().mount(&mut registry)?;

        // Realtime subscription table.
        let mut channel_builder = ChannelBuilder::new(self.config.realtime_buffer);

        // Database and bootstrap account.
        let pool = db::create_pool(&self.config.database_path).await?;
        db::init_schema(&pool).await?;
        db::bootstrap_root(&pool, &self.config.secret_key).await?;

        // Plugin registration, exactly once, in builtin order.
        plugins::register_all(&plugins::builtin(), &mut registry, &mut channel_builder)?;

        // Freeze both tables and compose the router.
        let (routes_router, route_index) = registry.freeze();
        let channel = channel_builder.build();
        let app_state = AppState {
            routes: Arc::new(route_index),
            channel: channel.clone(),
            db: pool.clone(),
            secret_key: self.config.secret_key.clone(),
        };
        let router = Router::new()
            .merge(routes_router)
            .route("/socketio", get(socketio_handler))
            .nest_service(
                self.config.static_url_path.as_str(),
                ServeDir::new(&self.config.static_root),
            )
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(app_state);

        self.router = Some(router);
        self.db = Some(pool);
        self.channel = Some(channel);

        if self.config.graceful_shutdown {
            let (tx, rx) = watch::channel(false);
            self.shutdown_tx = Some(tx);
            self.shutdown_rx = Some(rx);
        }

        self.state = ServerState::Configured;
        tracing::info!("server configured");
        Ok(())
    }

    /// Binds the listener and serves until shutdown. Blocks the calling
    /// task; not re-entrant.
    ///
    /// # Errors
    ///
    /// - [`ServerError::InvalidState`] unless the server is `CONFIGURED`.
    /// - [`ServerError::Io`] on bind or serve failure.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        if self.state != ServerState::Configured {
            return Err(ServerError::InvalidState {
                expected: ServerState::Configured.as_str(),
                actual: self.state.as_str(),
            });
        }
        let router = self.router.take().ok_or(ServerError::InvalidState {
            expected: ServerState::Configured.as_str(),
            actual: self.state.as_str(),
        })?;

        let addr = self.config.listen_addr()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        self.state = ServerState::Running;
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(addr = %local_addr, "server listening");

        let served = match self.shutdown_rx.take() {
            Some(mut rx) => {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        // Fires when any handle signals, or never if all
                        // senders drop.
                        let _ = rx.changed().await;
                    })
                    .await
            }
            None => axum::serve(listener, router).await,
        };

        self.running.store(false, Ordering::SeqCst);
        self.state = ServerState::ShuttingDown;
        if let Some(pool) = self.db.take() {
            pool.close().await;
        }
        self.state = ServerState::Stopped;
        tracing::info!("server stopped");

        served.map_err(ServerError::from)
    }

    /// Returns a handle that can signal shutdown from another task.
    ///
    /// # Errors
    ///
    /// [`ServerError::ShutdownUnsupported`] when the graceful-shutdown
    /// hook is disabled in configuration or setup has not created it.
    /// Shutdown is only available under this runtime configuration; the
    /// limitation is inherited from the system this facade replaces.
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle, ServerError> {
        let tx = self
            .shutdown_tx
            .clone()
            .ok_or(ServerError::ShutdownUnsupported)?;
        Ok(ShutdownHandle {
            tx,
            running: Arc::clone(&self.running),
        })
    }

    /// Signals shutdown through the server's own hook.
    ///
    /// # Errors
    ///
    /// [`ServerError::ShutdownUnsupported`] when no hook exists or the
    /// server is not running. Never terminates the process.
    pub fn shutdown(&mut self) -> Result<(), ServerError> {
        self.shutdown_handle()?.shutdown()
    }
}

/// Cloneable handle that signals graceful shutdown of a running server.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
    running: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Signals the server to stop accepting connections and drain.
    ///
    /// # Errors
    ///
    /// [`ServerError::ShutdownUnsupported`] when the server is not
    /// currently running (including before `run()` was ever called).
    pub fn shutdown(&self) -> Result<(), ServerError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(ServerError::ShutdownUnsupported);
        }
        self.tx
            .send(true)
            .map_err(|_| ServerError::ShutdownUnsupported)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_config(dir: &std::path::Path) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            secret_key: "test-secret".to_string(),
            static_root: PathBuf::from("public"),
            static_url_path: "/public".to_string(),
            database_path: dir.join("beacon.sqlite"),
            realtime_buffer: 64,
            graceful_shutdown: true,
        }
    }

    #[tokio::test]
    async fn setup_transitions_to_configured() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let mut server = Server::new(test_config(dir.path()));
        assert_eq!(server.state(), ServerState::Uninitialized);

        let Ok(()) = server.setup().await else {
            panic!("setup failed");
        };
        assert_eq!(server.state(), ServerState::Configured);
        assert!(server.channel().is_some());
    }

    #[tokio::test]
    async fn setup_is_not_reentrant() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let mut server = Server::new(test_config(dir.path()));
        let Ok(()) = server.setup().await else {
            panic!("setup failed");
        };
        let result = server.setup().await;
        assert!(matches!(result, Err(ServerError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn run_before_setup_is_invalid_state() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let mut server = Server::new(test_config(dir.path()));
        let result = server.run().await;
        assert!(matches!(result, Err(ServerError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn shutdown_before_run_is_unsupported() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let mut server = Server::new(test_config(dir.path()));
        let Ok(()) = server.setup().await else {
            panic!("setup failed");
        };

        let result = server.shutdown();
        assert!(matches!(result, Err(ServerError::ShutdownUnsupported)));
        // The facade is still intact and configured.
        assert_eq!(server.state(), ServerState::Configured);
    }

    #[tokio::test]
    async fn shutdown_handle_requires_graceful_hook() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let mut config = test_config(dir.path());
        config.graceful_shutdown = false;
        let mut server = Server::new(config);
        let Ok(()) = server.setup().await else {
            panic!("setup failed");
        };

        let result = server.shutdown_handle();
        assert!(matches!(result, Err(ServerError::ShutdownUnsupported)));
    }

    #[tokio::test]
    async fn run_and_shutdown_lifecycle() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let mut server = Server::new(test_config(dir.path()));
        let Ok(()) = server.setup().await else {
            panic!("setup failed");
        };
        let Ok(handle) = server.shutdown_handle() else {
            panic!("no shutdown handle");
        };

        let task = tokio::spawn(async move {
            let result = server.run().await;
            (server, result)
        });

        // The handle refuses until the server is actually running.
        let mut signaled = false;
        for _ in 0..200 {
            if handle.shutdown().is_ok() {
                signaled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(signaled, "server never reported running");

        let Ok((server, result)) = task.await else {
            panic!("run task panicked");
        };
        assert!(result.is_ok());
        assert_eq!(server.state(), ServerState::Stopped);
    }
}
