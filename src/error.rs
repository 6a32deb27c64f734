//! Server error types with HTTP status code mapping.
//!
//! [`ServerError`] is the central error type for the facade. Setup-time
//! errors propagate unhandled to the process boundary (fail-fast);
//! request-time errors map to structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid route path: must start with '/'",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category       | HTTP Status                |
/// |-----------|----------------|----------------------------|
/// | 1000–1999 | Registration   | 400 Bad Request            |
/// | 2000–2999 | Auth           | 401 / 409                  |
/// | 3000–3999 | Lifecycle      | 500 Internal Server Error  |
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Route path failed validation (empty, relative, or whitespace).
    #[error("invalid route path {0:?}: paths must be non-empty, absolute, and contain no whitespace")]
    InvalidPath(String),

    /// A route with the same path is already registered.
    #[error("route already registered: {0}")]
    DuplicateRoute(String),

    /// Registration attempted after the registry was frozen for serving.
    #[error("registry is frozen; cannot register {0} after serving began")]
    RegistryFrozen(String),

    /// A plugin's registration function failed. Fatal: aborts setup.
    #[error("plugin {name:?} failed to register: {source}")]
    Plugin {
        /// Name of the failing plugin.
        name: String,
        /// Underlying registration error.
        #[source]
        source: Box<ServerError>,
    },

    /// Shutdown requested but no shutdown hook is available.
    ///
    /// Graceful in-process shutdown only exists when the server is
    /// running with the graceful-shutdown hook enabled; this is a
    /// documented constraint of the runtime, not a transient failure.
    #[error("shutdown is not supported: server is not running with a shutdown hook")]
    ShutdownUnsupported,

    /// Lifecycle method invoked in the wrong state.
    #[error("invalid server state: expected {expected}, was {actual}")]
    InvalidState {
        /// State required by the operation.
        expected: &'static str,
        /// State the server was actually in.
        actual: &'static str,
    },

    /// Database failure (initialization or query).
    #[error("database error: {0}")]
    Database(String),

    /// Username/password pair did not match a stored user.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Username is already taken.
    #[error("user already exists: {0}")]
    UserExists(String),

    /// I/O failure (bind, static root).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidPath(_) => 1001,
            Self::DuplicateRoute(_) => 1002,
            Self::RegistryFrozen(_) => 1003,
            Self::Plugin { .. } => 1004,
            Self::InvalidCredentials => 2001,
            Self::UserExists(_) => 2002,
            Self::ShutdownUnsupported => 3001,
            Self::InvalidState { .. } => 3002,
            Self::Database(_) => 3003,
            Self::Io(_) => 3004,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPath(_)
            | Self::DuplicateRoute(_)
            | Self::RegistryFrozen(_)
            | Self::Plugin { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UserExists(_) => StatusCode::CONFLICT,
            Self::ShutdownUnsupported
            | Self::InvalidState { .. }
            | Self::Database(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
