//! Server configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`), with defaults matching the original
//! development setup.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default secret key. Must be overridden outside development.
const DEV_SECRET: &str = "dev";

/// Top-level server configuration.
///
/// Loaded once at startup via [`ServerConfig::from_env`] and owned by the
/// server facade; collaborators receive references, never globals.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Hostname or address to bind (e.g. `localhost`, `0.0.0.0`).
    pub host: String,

    /// TCP port to bind.
    pub port: u16,

    /// Secret key used as the pepper for password hashing.
    pub secret_key: String,

    /// Directory served as static assets under [`Self::static_url_path`].
    pub static_root: PathBuf,

    /// URL prefix for the static asset mount.
    pub static_url_path: String,

    /// Path of the SQLite database file. Created if missing.
    pub database_path: PathBuf,

    /// Per-connection outbound queue capacity for the realtime channel.
    pub realtime_buffer: usize,

    /// Whether `run()` installs a graceful-shutdown hook.
    ///
    /// When disabled, [`crate::server::Server::shutdown_handle`] fails
    /// with `ShutdownUnsupported`: in-process shutdown is only available
    /// under this runtime configuration.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to development defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = parse_env("PORT", 8080);

        let secret_key = std::env::var("SECRET_KEY").unwrap_or_else(|_| DEV_SECRET.to_string());
        if secret_key == DEV_SECRET {
            tracing::warn!("SECRET_KEY is the development default; override it in production");
        }

        let static_root =
            PathBuf::from(std::env::var("STATIC_ROOT").unwrap_or_else(|_| "public".to_string()));

        let database_path = PathBuf::from(
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "instance/beacon.sqlite".to_string()),
        );

        let realtime_buffer = parse_env("REALTIME_BUFFER", 1_024);
        let graceful_shutdown = parse_env_bool("GRACEFUL_SHUTDOWN", true);

        Self {
            host,
            port,
            secret_key,
            static_root,
            static_url_path: "/public".to_string(),
            database_path,
            realtime_buffer,
            graceful_shutdown,
        }
    }

    /// Resolves the bind address from `host` and `port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not resolve to any address.
    pub fn listen_addr(&self) -> std::io::Result<SocketAddr> {
        use std::net::ToSocketAddrs;

        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("host {:?} did not resolve", self.host),
                )
            })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_resolves_localhost() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            port: 8080,
            secret_key: "dev".to_string(),
            static_root: PathBuf::from("public"),
            static_url_path: "/public".to_string(),
            database_path: PathBuf::from("instance/beacon.sqlite"),
            realtime_buffer: 1_024,
            graceful_shutdown: true,
        };
        let Ok(addr) = config.listen_addr() else {
            panic!("localhost should resolve");
        };
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn parse_env_falls_back_on_missing() {
        let value: u16 = parse_env("BEACON_TEST_UNSET_VAR", 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_env_bool_recognizes_forms() {
        assert!(parse_env_bool("BEACON_TEST_UNSET_VAR", true));
        assert!(!parse_env_bool("BEACON_TEST_UNSET_VAR", false));
    }
}
