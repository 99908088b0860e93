// ── In-process remote ──
//
// A single JSON tree with the same whole-document semantics as the
// realtime database. Every write re-delivers the watched document to
// listeners on overlapping paths. Used for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use garage_api::FeedEvent;
use garage_api::document::Document;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use super::RemoteSync;
use crate::error::CoreError;

const FEED_CAPACITY: usize = 64;

/// One write made through [`RemoteSync`]. Removals record `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub path: String,
    pub value: Value,
}

struct Listener {
    path: String,
    tx: mpsc::Sender<FeedEvent>,
}

#[derive(Default)]
struct MemoryState {
    document: Document,
    listeners: Vec<Listener>,
    log: Vec<WriteRecord>,
    subscriptions: HashMap<String, usize>,
    denied: HashSet<String>,
}

impl MemoryState {
    fn value_at(&self, path: &str) -> Value {
        let pointer = format!("/{}", path.trim_matches('/'));
        self.document
            .value()
            .pointer(&pointer)
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn is_denied(&self, path: &str) -> bool {
        let path = path.trim_matches('/');
        self.denied.iter().any(|denied| {
            path == denied
                || path
                    .strip_prefix(denied.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    fn apply(&mut self, path: &str, value: Value) {
        self.document.put(path, value);

        let mut delivered = Vec::new();
        for listener in &self.listeners {
            if overlaps(&listener.path, path) {
                delivered.push((listener.tx.clone(), self.value_at(&listener.path)));
            }
        }
        for (tx, snapshot) in delivered {
            if let Err(mpsc::error::TrySendError::Full(_)) =
                tx.try_send(FeedEvent::Snapshot(snapshot))
            {
                warn!(path, "memory feed full, dropping snapshot");
            }
        }
        self.listeners.retain(|l| !l.tx.is_closed());
    }
}

/// `true` when a write to one path can change the document at the other.
fn overlaps(a: &str, b: &str) -> bool {
    let a = a.trim_matches('/');
    let b = b.trim_matches('/');
    a == b
        || a.is_empty()
        || b.is_empty()
        || a.strip_prefix(b).is_some_and(|rest| rest.starts_with('/'))
        || b.strip_prefix(a).is_some_and(|rest| rest.starts_with('/'))
}

/// In-memory implementation of [`RemoteSync`].
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
    write_count: watch::Sender<usize>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        let (write_count, _) = watch::channel(0);
        Self {
            state: Mutex::new(MemoryState::default()),
            write_count,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── External writers ─────────────────────────────────────────────

    /// Write as another client would (the door controller, another phone).
    /// Not recorded in the write log.
    pub fn set(&self, path: &str, value: Value) {
        debug!(path, "external write");
        self.lock().apply(path, value);
    }

    /// End every listener on `path` as the server would on a rules change.
    pub fn cancel_listeners(&self, path: &str, reason: &str) {
        let mut state = self.lock();
        state.listeners.retain(|listener| {
            if listener.path.trim_matches('/') != path.trim_matches('/') {
                return true;
            }
            let _ = listener.tx.try_send(FeedEvent::Cancelled {
                reason: reason.to_owned(),
            });
            false
        });
    }

    /// Reject writes at or under `path` with a permission error.
    pub fn deny_writes(&self, path: &str) {
        self.lock().denied.insert(path.trim_matches('/').to_owned());
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn value(&self, path: &str) -> Value {
        self.lock().value_at(path)
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().log.clone()
    }

    /// Values written to exactly `path`, oldest first.
    pub fn writes_to(&self, path: &str) -> Vec<Value> {
        self.lock()
            .log
            .iter()
            .filter(|record| record.path == path)
            .map(|record| record.value.clone())
            .collect()
    }

    /// How many times `path` has been subscribed, live or not.
    pub fn subscription_count(&self, path: &str) -> usize {
        self.lock().subscriptions.get(path).copied().unwrap_or(0)
    }

    /// Wait until at least `count` writes have been made.
    pub async fn wait_for_writes(&self, count: usize) {
        let mut rx = self.write_count.subscribe();
        let _ = rx.wait_for(|n| *n >= count).await;
    }

    fn record(&self, path: &str, value: Value) -> Result<(), CoreError> {
        {
            let mut state = self.lock();
            if state.is_denied(path) {
                return Err(CoreError::PermissionDenied {
                    message: format!("write to {path} denied"),
                });
            }
            state.log.push(WriteRecord {
                path: path.to_owned(),
                value: value.clone(),
            });
            state.apply(path, value);
        }
        self.write_count.send_modify(|n| *n += 1);
        Ok(())
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteSync for MemoryRemote {
    async fn write(&self, path: &str, value: Value) -> Result<(), CoreError> {
        self.record(path, value)
    }

    async fn remove(&self, path: &str) -> Result<(), CoreError> {
        self.record(path, Value::Null)
    }

    async fn subscribe(&self, path: &str) -> Result<mpsc::Receiver<FeedEvent>, CoreError> {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let mut state = self.lock();
        let _ = tx.try_send(FeedEvent::Snapshot(state.value_at(path)));
        state.listeners.push(Listener {
            path: path.to_owned(),
            tx,
        });
        *state.subscriptions.entry(path.to_owned()).or_default() += 1;
        Ok(rx)
    }
}
