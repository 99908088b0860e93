use garage_api::{FeedEvent, RealtimeClient};
use serde_json::Value;
use tokio::sync::mpsc;

use super::RemoteSync;
use crate::error::CoreError;

impl RemoteSync for RealtimeClient {
    async fn write(&self, path: &str, value: Value) -> Result<(), CoreError> {
        Ok(self.put(path, &value).await?)
    }

    async fn remove(&self, path: &str) -> Result<(), CoreError> {
        Ok(self.delete(path).await?)
    }

    async fn subscribe(&self, path: &str) -> Result<mpsc::Receiver<FeedEvent>, CoreError> {
        Ok(self.listen(path)?)
    }
}
