//! beacon-server entry point.
//!
//! Configures the facade from the environment, wires ctrl-c to the
//! shutdown handle when graceful shutdown is available, and serves until
//! stopped. Setup failures exit non-zero before any traffic is accepted.

use tracing_subscriber::EnvFilter;

use beacon_server::config::ServerConfig;
use beacon_server::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "starting beacon-server");

    let mut server = Server::new(config);
    server.setup().await?;

    // Graceful shutdown on ctrl-c, when the hook is available.
    match server.shutdown_handle() {
        Ok(handle) => {
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("ctrl-c received; shutting down");
                    if let Err(e) = handle.shutdown() {
                        tracing::warn!(%e, "shutdown signal not accepted");
                    }
                }
            });
        }
        Err(_) => {
            tracing::warn!("graceful shutdown disabled; stop the process to exit");
        }
    }

    server.run().await?;
    Ok(())
}
