// ── Command API ──
//
// Every user-initiated operation flows through `Command` to the reconcile
// task, alongside remote snapshots. One queue, one owner, one order.

use serde_json::Value;
use tokio::sync::oneshot;

use crate::editor::OptionEdit;
use crate::error::CoreError;
use crate::model::{AutoCloseWarning, Feed};

/// A command envelope sent through the input channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// Everything the reconcile task consumes, in arrival order.
pub(crate) enum Input {
    Command(CommandEnvelope),
    Snapshot {
        feed: Feed,
        value: Value,
    },
    ListenerCancelled {
        feed: Feed,
        generation: u64,
        reason: String,
    },
}

/// User-initiated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RequestOpen,
    RequestClose,
    CancelAutoClose,
    EditOptions(OptionEdit),
    /// Consume the pending auto-close warning, if any.
    TakeAutoCloseWarning,
}

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    /// Options edit outcome: `false` when the edit changed nothing.
    OptionsWritten(bool),
    Warning(Option<AutoCloseWarning>),
}
