// ── Remote listener registry ──
//
// At most one live change-feed listener per feed per process. Each
// registration gets a generation number so a late cancellation from an
// old listener cannot clear its replacement.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio_util::sync::CancellationToken;

use crate::model::Feed;

/// Handle for a freshly registered listener.
#[derive(Debug, Clone)]
pub(crate) struct Registration {
    pub generation: u64,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub(crate) struct ListenerRegistry {
    slots: DashMap<Feed, Slot>,
    next_generation: AtomicU64,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `feed`. `None` if a listener is already live.
    pub(crate) fn try_register(
        &self,
        feed: Feed,
        parent: &CancellationToken,
    ) -> Option<Registration> {
        match self.slots.entry(feed) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                let cancel = parent.child_token();
                vacant.insert(Slot {
                    generation,
                    cancel: cancel.clone(),
                });
                Some(Registration { generation, cancel })
            }
        }
    }

    /// Clear the slot after the remote ended the listener.
    ///
    /// Only clears if `generation` still owns the slot.
    pub(crate) fn release(&self, feed: Feed, generation: u64) -> bool {
        self.slots
            .remove_if(&feed, |_, slot| slot.generation == generation)
            .is_some()
    }

    /// Stop the live listener for `feed`, if any.
    pub(crate) fn unsubscribe(&self, feed: Feed) -> bool {
        match self.slots.remove(&feed) {
            Some((_, slot)) => {
                slot.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_active(&self, feed: Feed) -> bool {
        self.slots.contains_key(&feed)
    }

    pub(crate) fn clear(&self) {
        self.slots.retain(|_, slot| {
            slot.cancel.cancel();
            false
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_registration_is_refused() {
        let registry = ListenerRegistry::new();
        let root = CancellationToken::new();

        assert!(registry.try_register(Feed::Status, &root).is_some());
        assert!(registry.try_register(Feed::Status, &root).is_none());
        assert!(registry.try_register(Feed::Options, &root).is_some());
    }

    #[test]
    fn release_frees_the_right_slot() {
        let registry = ListenerRegistry::new();
        let root = CancellationToken::new();
        let status = registry.try_register(Feed::Status, &root);
        let options = registry.try_register(Feed::Options, &root);
        let (Some(status), Some(_options)) = (status, options) else {
            panic!("both registrations should succeed");
        };

        assert!(registry.release(Feed::Status, status.generation));
        assert!(!registry.is_active(Feed::Status));
        assert!(registry.is_active(Feed::Options));
    }

    #[test]
    fn stale_release_keeps_replacement() {
        let registry = ListenerRegistry::new();
        let root = CancellationToken::new();
        let first = registry.try_register(Feed::Status, &root);
        let Some(first) = first else {
            panic!("first registration should succeed");
        };

        assert!(registry.unsubscribe(Feed::Status));
        assert!(first.cancel.is_cancelled());

        assert!(registry.try_register(Feed::Status, &root).is_some());
        assert!(!registry.release(Feed::Status, first.generation));
        assert!(registry.is_active(Feed::Status));
    }

    #[test]
    fn clear_cancels_everything() {
        let registry = ListenerRegistry::new();
        let root = CancellationToken::new();
        let reg = registry.try_register(Feed::AutoCloseWarning, &root);
        registry.clear();
        assert!(!registry.is_active(Feed::AutoCloseWarning));
        assert!(reg.is_some_and(|r| r.cancel.is_cancelled()));
    }
}
