// ── Auto-close configuration ──
//
// Written by any client, read by the door controller. Always replaced
// wholesale; the writer re-stamps `uid` and `o_timestamp` on every write.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::common::duration_ms;

/// Granularity of the timeout sliders: 15 minutes per step.
pub const SLIDER_STEP: Duration = Duration::from_secs(15 * 60);

/// Auto-close settings as stored at `controller/auto_close_options`.
///
/// Every field is required on the wire; a snapshot missing any of them
/// is rejected as a whole. `warning_timeout <= timeout` is expected but
/// not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCloseOptions {
    pub enabled: bool,
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    #[serde(with = "duration_ms")]
    pub warning_timeout: Duration,
    pub warning_enabled: bool,
    #[serde(rename = "uid")]
    pub last_writer_id: String,
    #[serde(rename = "o_timestamp")]
    pub last_write_timestamp: String,
}

impl AutoCloseOptions {
    /// `true` when the warning would fire no later than the close itself.
    pub fn warning_precedes_timeout(&self) -> bool {
        self.warning_timeout <= self.timeout
    }

    /// Same settings, attributed to a new writer.
    pub(crate) fn stamped(mut self, writer_id: &str, timestamp: String) -> Self {
        writer_id.clone_into(&mut self.last_writer_id);
        self.last_write_timestamp = timestamp;
        self
    }
}

// ── Slider mapping ──────────────────────────────────────────────────

/// Close-after slider: position 0 means one step.
pub fn timeout_from_progress(progress: u32) -> Duration {
    SLIDER_STEP * progress.saturating_add(1)
}

/// Warn-after slider: position 0 means no lead time.
pub fn warning_timeout_from_progress(progress: u32) -> Duration {
    SLIDER_STEP * progress
}

/// Slider position for a duration, in whole steps.
///
/// Note the close-after slider is offset by one: feed its result back
/// through [`timeout_from_progress`] only after subtracting one.
pub fn progress_from_duration(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis() / SLIDER_STEP.as_millis()).unwrap_or(u32::MAX)
}
