// ── Garage state store ──
//
// Holds the latest believed door state behind a `watch` channel. Reads
// are wait-free snapshots; every mutation publishes to all subscribers.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{AutoCloseOptions, AutoCloseWarning, Feed, GarageStatus};
use crate::stream::StateStream;

/// Everything this process believes about the garage.
///
/// Recreated fresh on start; the remote store is authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GarageState {
    pub status: GarageStatus,
    /// Status before the last transition. Only used to spot reversals.
    pub previous_status: GarageStatus,
    pub auto_close_options: AutoCloseOptions,
    /// Set when the door controller announces an upcoming auto-close;
    /// cleared when one observer takes it.
    pub pending_auto_close_warning: Option<AutoCloseWarning>,
}

/// Reactive holder of [`GarageState`].
///
/// Observers get snapshots and change notification. Mutation is
/// crate-private and only performed by the reconcile task.
pub struct GarageStore {
    pub(crate) state: watch::Sender<Arc<GarageState>>,
    pub(crate) last_status_report: watch::Sender<Option<DateTime<Utc>>>,
    /// Feeds that have delivered at least one snapshot, absent nodes included.
    pub(crate) reported_feeds: watch::Sender<HashSet<Feed>>,
}

impl GarageStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(GarageState::default()));
        let (last_status_report, _) = watch::channel(None);
        let (reported_feeds, _) = watch::channel(HashSet::new());

        Self {
            state,
            last_status_report,
            reported_feeds,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<GarageState> {
        Arc::clone(&self.state.borrow())
    }

    pub fn status(&self) -> GarageStatus {
        self.state.borrow().status
    }

    pub fn previous_status(&self) -> GarageStatus {
        self.state.borrow().previous_status
    }

    pub fn auto_close_options(&self) -> AutoCloseOptions {
        self.state.borrow().auto_close_options.clone()
    }

    /// Peek at the pending warning without consuming it.
    pub fn pending_auto_close_warning(&self) -> Option<AutoCloseWarning> {
        self.state.borrow().pending_auto_close_warning.clone()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self) -> StateStream {
        StateStream::new(self.state.subscribe())
    }

    /// Watch for the first (and every later) authoritative status report.
    pub fn subscribe_status_reports(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_status_report.subscribe()
    }

    pub fn subscribe_feed_reports(&self) -> watch::Receiver<HashSet<Feed>> {
        self.reported_feeds.subscribe()
    }

    // ── Metadata ─────────────────────────────────────────────────────

    /// `true` once `feed` has delivered its first snapshot.
    pub fn has_reported(&self, feed: Feed) -> bool {
        self.reported_feeds.borrow().contains(&feed)
    }

    /// When the remote last reported a status, or `None` before initial sync.
    pub fn last_status_report(&self) -> Option<DateTime<Utc>> {
        *self.last_status_report.borrow()
    }

    pub fn is_synced(&self) -> bool {
        self.last_status_report().is_some()
    }
}

impl Default for GarageStore {
    fn default() -> Self {
        Self::new()
    }
}
