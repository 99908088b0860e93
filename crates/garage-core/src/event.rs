use std::time::Duration;

use crate::error::CoreError;
use crate::model::{AutoCloseOptions, GarageStatus};

/// Where a status transition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Predicted locally from a user request, not yet confirmed.
    Optimistic,
    /// Reported by the remote store.
    Remote,
}

/// The door changed direction on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reversal {
    /// `OPENING` then `CLOSED`.
    ClosedWhileOpening,
    /// `CLOSING` then `OPEN`, usually an obstruction.
    ReopenedWhileClosing,
}

/// Notifications broadcast to every observer of a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GarageEvent {
    StatusChanged {
        previous: GarageStatus,
        status: GarageStatus,
        origin: Origin,
    },
    DoorReversed(Reversal),
    OptionsChanged(AutoCloseOptions),
    /// A warning is waiting; take it with `Controller::take_auto_close_warning`.
    AutoCloseWarningPending { timeout: Duration },
    /// Something went wrong but nothing stopped.
    Diagnostic(CoreError),
}
