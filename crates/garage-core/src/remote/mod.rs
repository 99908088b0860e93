// ── Remote sync boundary ──
//
// The controller only needs three things from the remote store: write a
// whole document, remove one, and watch one. Nothing here is
// transactional and nothing is ordered across paths.

mod memory;
mod realtime;

use std::future::Future;

use serde_json::Value;
use tokio::sync::mpsc;

pub use garage_api::FeedEvent;
pub use memory::{MemoryRemote, WriteRecord};

use crate::error::CoreError;

/// Whole-document access to a realtime store.
pub trait RemoteSync: Send + Sync + 'static {
    /// Replace the document at `path`.
    fn write(&self, path: &str, value: Value) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Delete the document at `path`.
    fn remove(&self, path: &str) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Watch `path`. The first event is the current document; a
    /// [`FeedEvent::Cancelled`] ends the feed.
    fn subscribe(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<mpsc::Receiver<FeedEvent>, CoreError>> + Send;
}

/// Supplies this device's push token.
pub trait TokenSource: Send + Sync {
    fn fetch_token(&self) -> impl Future<Output = Result<String, CoreError>> + Send;
}

/// A token known up front.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    async fn fetch_token(&self) -> Result<String, CoreError> {
        if self.0.is_empty() {
            return Err(CoreError::TokenUnavailable {
                reason: "empty token".into(),
            });
        }
        Ok(self.0.clone())
    }
}
