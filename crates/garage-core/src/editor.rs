// ── Auto-close options editing ──
//
// Every UI control maps to exactly one field. An edit that would not
// change the field produces nothing, which is what keeps a control
// re-rendered from a remote echo from writing the same record back.

use std::time::Duration;

use crate::model::{AutoCloseOptions, timeout_from_progress, warning_timeout_from_progress};

/// A single-field change to [`AutoCloseOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionEdit {
    Enabled(bool),
    WarningEnabled(bool),
    Timeout(Duration),
    WarningTimeout(Duration),
}

impl OptionEdit {
    /// Close-after slider position, in 15-minute steps (0 means 15 minutes).
    pub fn timeout_progress(progress: u32) -> Self {
        Self::Timeout(timeout_from_progress(progress))
    }

    /// Warn-after slider position, in 15-minute steps (0 means no lead).
    pub fn warning_timeout_progress(progress: u32) -> Self {
        Self::WarningTimeout(warning_timeout_from_progress(progress))
    }

    /// The edited record, or `None` if the field already holds the value.
    ///
    /// Writer id and timestamp are left as they were; the caller stamps
    /// the record before writing it.
    pub fn apply(self, current: &AutoCloseOptions) -> Option<AutoCloseOptions> {
        let mut next = current.clone();
        match self {
            Self::Enabled(value) => next.enabled = value,
            Self::WarningEnabled(value) => next.warning_enabled = value,
            Self::Timeout(value) => next.timeout = value,
            Self::WarningTimeout(value) => next.warning_timeout = value,
        }
        (next != *current).then_some(next)
    }
}
