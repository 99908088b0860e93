//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use garage_config::ConfigError;
use garage_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the realtime database: {message}")]
    #[diagnostic(
        code(garage::connection_failed),
        help("Check the database URL and your network connection.")
    )]
    ConnectionFailed { message: String },

    #[error("Database rejected the request ({status}): {message}")]
    #[diagnostic(code(garage::remote))]
    Remote { status: u16, message: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(
        code(garage::permission_denied),
        help(
            "The database rules refused this client.\n\
             Check the auth token with: garage config set-token <TOKEN>"
        )
    )]
    PermissionDenied { message: String },

    #[error("No status from the door controller after {seconds}s")]
    #[diagnostic(
        code(garage::timeout),
        help("Is the door controller online? Increase the wait with --timeout.")
    )]
    Timeout { seconds: u64 },

    #[error("Remote data problem: {message}")]
    #[diagnostic(code(garage::remote_data))]
    RemoteData { message: String },

    #[error("Controller stopped before the request completed")]
    #[diagnostic(code(garage::stopped))]
    Stopped,

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(garage::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(garage::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: garage config init --database-url <URL> --issuer-id <UID>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No configuration found")]
    #[diagnostic(
        code(garage::no_config),
        help(
            "Create one with: garage config init --database-url <URL> --issuer-id <UID>\n\
             Or pass --database-url and --issuer-id.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(garage::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not encode output: {0}")]
    #[diagnostic(code(garage::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::ProfileNotFound { name, available } => Self::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Remote {
                message,
                status: None,
            } => Self::ConnectionFailed { message },
            CoreError::Remote {
                message,
                status: Some(status),
            } => Self::Remote { status, message },
            CoreError::PermissionDenied { message } => Self::PermissionDenied { message },
            CoreError::ControllerStopped => Self::Stopped,
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::TokenUnavailable { reason } => Self::Validation {
                field: "token".into(),
                reason,
            },
            other @ (CoreError::SnapshotParse { .. }
            | CoreError::UnknownStatus { .. }
            | CoreError::ListenerCancelled { .. }) => Self::RemoteData {
                message: other.to_string(),
            },
        }
    }
}
