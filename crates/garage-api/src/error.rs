use thiserror::Error;

/// Top-level error type for the `garage-api` crate.
///
/// Covers every failure mode of the realtime database surface:
/// transport, rejected requests, and malformed change-feed frames.
/// `garage-core` maps these into domain diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    // ── Database ────────────────────────────────────────────────────
    /// The database rejected the request (`{"error": "..."}` body).
    #[error("Database error (HTTP {status}): {message}")]
    Database { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the database refused access to the path.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Database { status: 401 | 403, .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Database { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
