// ── Core error types ──
//
// Domain-facing errors from garage-core. Consumers never see HTTP status
// codes or raw JSON failures; `From<garage_api::Error>` translates them.
// `Clone` so diagnostics can ride the event broadcast channel.

use thiserror::Error;

use crate::model::Feed;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Snapshot errors ──────────────────────────────────────────────
    #[error("Malformed {feed} snapshot: {reason}")]
    SnapshotParse { feed: Feed, reason: String },

    #[error("Unrecognized garage status {raw:?}")]
    UnknownStatus { raw: String },

    #[error("Listener on {feed} cancelled: {reason}")]
    ListenerCancelled { feed: Feed, reason: String },

    // ── Remote errors ────────────────────────────────────────────────
    #[error("Remote write failed: {message}")]
    Remote {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Push token unavailable: {reason}")]
    TokenUnavailable { reason: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Controller stopped")]
    ControllerStopped,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// `true` for problems with incoming data rather than the connection.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::SnapshotParse { .. } | Self::UnknownStatus { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<garage_api::Error> for CoreError {
    fn from(err: garage_api::Error) -> Self {
        match err {
            garage_api::Error::Database {
                status: 401 | 403,
                message,
            } => Self::PermissionDenied { message },
            garage_api::Error::Transport(ref e) => Self::Remote {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            garage_api::Error::Database { status, message } => Self::Remote {
                message,
                status: Some(status),
            },
            garage_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            garage_api::Error::ClientSetup(message) => Self::Config { message },
            garage_api::Error::Deserialization { message, body: _ } => Self::Remote {
                message: format!("Unreadable response: {message}"),
                status: None,
            },
        }
    }
}
