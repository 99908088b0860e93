// ── Reconciliation engine ──
//
// Computes the next `(status, previous_status)` for each input class and
// decides which remote writes follow. Pure with respect to the network:
// the engine returns `Effect`s and the controller performs them.

use std::sync::Arc;

use chrono::{Local, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::command::{Command, CommandResult};
use crate::editor::OptionEdit;
use crate::error::CoreError;
use crate::event::{GarageEvent, Origin, Reversal};
use crate::model::{
    ActionType, AutoCloseOptions, AutoCloseWarning, Feed, GarageStatus, remote_timestamp,
};
use crate::store::GarageStore;

/// A remote write the engine wants performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    SendAction(ActionType),
    PushOptions(AutoCloseOptions),
    /// Best-effort line for the remote debug log.
    DebugLog(String),
}

/// A `(previous, status)` pair to store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: GarageStatus,
    pub status: GarageStatus,
}

/// Local prediction after the user asks to close.
///
/// Opening doors are expected to stop, stopped doors to start closing.
/// Everything else waits for the remote.
pub fn optimistic_close(current: GarageStatus) -> Option<Transition> {
    let status = match current {
        GarageStatus::Opening => GarageStatus::Paused,
        GarageStatus::Paused => GarageStatus::Closing,
        _ => return None,
    };
    Some(Transition {
        previous: current,
        status,
    })
}

/// Whether moving from `previous` to `status` means the door turned around.
pub fn detect_reversal(previous: GarageStatus, status: GarageStatus) -> Option<Reversal> {
    match (previous, status) {
        (GarageStatus::Opening, GarageStatus::Closed) => Some(Reversal::ClosedWhileOpening),
        (GarageStatus::Closing, GarageStatus::Open) => Some(Reversal::ReopenedWhileClosing),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct StatusRecord {
    #[serde(rename = "type")]
    status: String,
}

/// Sole mutator of the [`GarageStore`]. Owned by the reconcile task.
pub(crate) struct Reconciler {
    store: Arc<GarageStore>,
    events: broadcast::Sender<GarageEvent>,
    issuer_id: String,
    last_delivered_warning: Option<AutoCloseWarning>,
}

impl Reconciler {
    pub(crate) fn new(
        store: Arc<GarageStore>,
        events: broadcast::Sender<GarageEvent>,
        issuer_id: String,
    ) -> Self {
        Self {
            store,
            events,
            issuer_id,
            last_delivered_warning: None,
        }
    }

    fn emit(&self, event: GarageEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    pub(crate) fn handle(&mut self, command: Command) -> (CommandResult, Vec<Effect>) {
        match command {
            Command::RequestOpen => (CommandResult::Ok, self.on_user_requests_open()),
            Command::RequestClose => (CommandResult::Ok, self.on_user_requests_close()),
            Command::CancelAutoClose => (CommandResult::Ok, self.on_user_cancels_auto_close()),
            Command::EditOptions(edit) => {
                let effects = self.on_option_edit(edit);
                (CommandResult::OptionsWritten(!effects.is_empty()), effects)
            }
            Command::TakeAutoCloseWarning => {
                (CommandResult::Warning(self.take_auto_close_warning()), Vec::new())
            }
        }
    }

    pub(crate) fn on_snapshot(&self, feed: Feed, value: &Value) -> Vec<Effect> {
        self.store.record_feed_report(feed);
        if value.is_null() {
            debug!(%feed, "remote node absent");
            return Vec::new();
        }
        match feed {
            Feed::Status => self.on_remote_status_snapshot(value),
            Feed::Options => self.on_remote_options_snapshot(value),
            Feed::AutoCloseWarning => self.on_auto_close_warning_snapshot(value),
        }
    }

    // ── User requests ────────────────────────────────────────────────

    pub(crate) fn on_user_requests_open(&self) -> Vec<Effect> {
        debug!(issuer = %self.issuer_id, "open requested");
        vec![Effect::SendAction(ActionType::Open)]
    }

    pub(crate) fn on_user_requests_close(&self) -> Vec<Effect> {
        if let Some(next) = optimistic_close(self.store.status()) {
            if self.store.set_status(next.previous, next.status) {
                debug!(previous = %next.previous, status = %next.status, "optimistic transition");
                self.emit(GarageEvent::StatusChanged {
                    previous: next.previous,
                    status: next.status,
                    origin: Origin::Optimistic,
                });
            }
        }
        vec![Effect::SendAction(ActionType::Close)]
    }

    pub(crate) fn on_user_cancels_auto_close(&self) -> Vec<Effect> {
        debug!(issuer = %self.issuer_id, "auto-close cancel requested");
        vec![Effect::SendAction(ActionType::StopAutoClose)]
    }

    pub(crate) fn on_option_edit(&self, edit: OptionEdit) -> Vec<Effect> {
        let Some(next) = edit.apply(&self.store.auto_close_options()) else {
            debug!(?edit, "option edit matches current value, not writing");
            return Vec::new();
        };

        let stamped = next.stamped(&self.issuer_id, remote_timestamp(&Local::now()));
        if !stamped.warning_precedes_timeout() {
            warn!(
                timeout = ?stamped.timeout,
                warning_timeout = ?stamped.warning_timeout,
                "auto-close warning is set later than the close itself"
            );
        }

        self.store.replace_options(stamped.clone());
        self.emit(GarageEvent::OptionsChanged(stamped.clone()));
        vec![Effect::PushOptions(stamped)]
    }

    pub(crate) fn take_auto_close_warning(&mut self) -> Option<AutoCloseWarning> {
        let taken = self.store.take_pending_warning();
        if let Some(ref warning) = taken {
            self.last_delivered_warning = Some(warning.clone());
        }
        taken
    }

    // ── Remote snapshots ─────────────────────────────────────────────

    pub(crate) fn on_remote_status_snapshot(&self, value: &Value) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Some(record) = self.parse::<StatusRecord>(Feed::Status, value, &mut effects) else {
            return effects;
        };

        let reading = GarageStatus::read(&record.status);
        if let Some(diagnostic) = reading.diagnostic {
            error!(error = %diagnostic, "unrecognized garage status, assuming closed");
            self.emit(GarageEvent::Diagnostic(diagnostic));
        }

        let previous = self.store.status();
        let status = reading.status;
        self.store.set_status(previous, status);
        self.store.record_status_report(Utc::now());

        if previous != status {
            debug!(%previous, %status, "remote status");
            self.emit(GarageEvent::StatusChanged {
                previous,
                status,
                origin: Origin::Remote,
            });
            if let Some(reversal) = detect_reversal(previous, status) {
                info!(?reversal, "door reversed direction");
                self.emit(GarageEvent::DoorReversed(reversal));
            }
        }
        effects
    }

    pub(crate) fn on_remote_options_snapshot(&self, value: &Value) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(options) = self.parse::<AutoCloseOptions>(Feed::Options, value, &mut effects) {
            if self.store.replace_options(options.clone()) {
                debug!(writer = %options.last_writer_id, "auto-close options updated");
                self.emit(GarageEvent::OptionsChanged(options));
            }
        }
        effects
    }

    pub(crate) fn on_auto_close_warning_snapshot(&self, value: &Value) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Some(warning) =
            self.parse::<AutoCloseWarning>(Feed::AutoCloseWarning, value, &mut effects)
        else {
            return effects;
        };

        if warning.is_no_warning() {
            debug!("auto-close warning cleared by controller");
            return effects;
        }
        if self.last_delivered_warning.as_ref() == Some(&warning)
            || self.store.pending_auto_close_warning().as_ref() == Some(&warning)
        {
            debug!("auto-close warning already seen");
            return effects;
        }

        info!(timeout = ?warning.timeout, "auto-close warning pending");
        let timeout = warning.timeout;
        self.store.set_pending_warning(warning);
        self.emit(GarageEvent::AutoCloseWarningPending { timeout });
        effects
    }

    // ── Listener lifecycle ───────────────────────────────────────────

    pub(crate) fn on_listener_cancelled(&self, feed: Feed, reason: &str) -> Vec<Effect> {
        warn!(%feed, reason, "remote listener cancelled");
        self.emit(GarageEvent::Diagnostic(CoreError::ListenerCancelled {
            feed,
            reason: reason.to_owned(),
        }));
        vec![Effect::DebugLog(format!("{feed} listener cancelled: {reason}"))]
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn parse<T: DeserializeOwned>(
        &self,
        feed: Feed,
        value: &Value,
        effects: &mut Vec<Effect>,
    ) -> Option<T> {
        match T::deserialize(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                let err = CoreError::SnapshotParse {
                    feed,
                    reason: e.to_string(),
                };
                warn!(%feed, error = %err, "discarding malformed snapshot");
                effects.push(Effect::DebugLog(format!("{feed} listener: {err}")));
                self.emit(GarageEvent::Diagnostic(err));
                None
            }
        }
    }
}
