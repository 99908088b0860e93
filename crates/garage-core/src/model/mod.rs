// ── Garage domain model ──
//
// Canonical representation of everything that travels between this
// process and the realtime database: door status, auto-close options,
// warnings, outbound actions, and the paths they live under.

pub mod action;
pub mod common;
pub mod options;
pub mod paths;
pub mod status;
pub mod warning;

// ── Re-exports ──────────────────────────────────────────────────────

pub use action::{ActionType, DebugMessage, GarageAction};
pub use common::remote_timestamp;
pub use options::{
    AutoCloseOptions, SLIDER_STEP, progress_from_duration, timeout_from_progress,
    warning_timeout_from_progress,
};
pub use paths::{DEFAULT_GARAGE_ID, Feed, RemotePaths, TokenList};
pub use status::{ColorTag, DisplayAttributes, GarageStatus, StatusReading, Urgency, parse_status};
pub use warning::AutoCloseWarning;
