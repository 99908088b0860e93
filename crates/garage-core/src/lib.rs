// garage-core: Garage door state machine reconciled against a realtime database.

pub mod command;
pub mod config;
pub mod controller;
pub mod editor;
pub mod engine;
pub mod error;
pub mod event;
mod listener;
pub mod model;
pub mod remote;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::ControllerConfig;
pub use controller::Controller;
pub use editor::OptionEdit;
pub use engine::{Transition, detect_reversal, optimistic_close};
pub use error::CoreError;
pub use event::{GarageEvent, Origin, Reversal};
pub use remote::{FeedEvent, MemoryRemote, RemoteSync, StaticToken, TokenSource, WriteRecord};
pub use store::{GarageState, GarageStore};
pub use stream::StateStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ActionType, AutoCloseOptions, AutoCloseWarning, ColorTag, DEFAULT_GARAGE_ID, DisplayAttributes,
    Feed, GarageAction, GarageStatus, RemotePaths, SLIDER_STEP, Urgency, parse_status,
};
