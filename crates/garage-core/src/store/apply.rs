// ── Store mutation ──
//
// Crate-private writes. Each one publishes only when the state actually
// changed, so subscribers never wake for a no-op.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{GarageState, GarageStore};
use crate::model::{AutoCloseOptions, AutoCloseWarning, Feed, GarageStatus};

impl GarageStore {
    fn update(&self, mutate: impl FnOnce(&mut GarageState) -> bool) -> bool {
        self.state.send_if_modified(|current| {
            let mut next = GarageState::clone(current);
            if mutate(&mut next) && next != **current {
                *current = Arc::new(next);
                true
            } else {
                false
            }
        })
    }

    /// Record a transition. Returns `true` if the stored pair changed.
    pub(crate) fn set_status(&self, previous: GarageStatus, status: GarageStatus) -> bool {
        self.update(|state| {
            state.previous_status = previous;
            state.status = status;
            true
        })
    }

    /// Replace the options wholesale. Returns `true` if they differ.
    pub(crate) fn replace_options(&self, options: AutoCloseOptions) -> bool {
        self.update(|state| {
            state.auto_close_options = options;
            true
        })
    }

    pub(crate) fn set_pending_warning(&self, warning: AutoCloseWarning) -> bool {
        self.update(|state| {
            state.pending_auto_close_warning = Some(warning);
            true
        })
    }

    /// Remove and return the pending warning in one step.
    pub(crate) fn take_pending_warning(&self) -> Option<AutoCloseWarning> {
        let mut taken = None;
        self.update(|state| {
            taken = state.pending_auto_close_warning.take();
            taken.is_some()
        });
        taken
    }

    pub(crate) fn record_status_report(&self, at: DateTime<Utc>) {
        self.last_status_report.send_replace(Some(at));
    }

    pub(crate) fn record_feed_report(&self, feed: Feed) {
        self.reported_feeds.send_if_modified(|feeds| feeds.insert(feed));
    }
}
