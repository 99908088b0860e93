// Realtime database HTTP client
//
// Wraps `reqwest::Client` with node-path URL construction, the optional
// `auth` query parameter, and `{"error": "..."}` envelope unwrapping.
// Change feeds run on a separate client without a whole-request timeout.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::feed::{self, FeedEvent};
use crate::transport::TransportConfig;

const FEED_CHANNEL_SIZE: usize = 32;

/// Raw HTTP client for a realtime database instance.
///
/// Every node is addressed as `{base}/{path}.json`. Writes replace the whole
/// node; there are no transactions across paths.
#[derive(Clone)]
pub struct RealtimeClient {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    base_url: Url,
    auth: Option<SecretString>,
}

impl RealtimeClient {
    /// Create a client for the database rooted at `base_url`.
    pub fn new(
        base_url: Url,
        auth: Option<SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self::with_clients(
            transport.build_client()?,
            transport.build_streaming_client()?,
            base_url,
            auth,
        ))
    }

    /// Create a client from pre-built `reqwest::Client`s.
    pub fn with_clients(
        http: reqwest::Client,
        stream_http: reqwest::Client,
        mut base_url: Url,
        auth: Option<SecretString>,
    ) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http,
            stream_http,
            base_url,
            auth,
        }
    }

    /// The database root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{path}.json`, with `?auth=` when a secret is configured.
    pub(crate) fn node_url(&self, path: &str) -> Result<Url, Error> {
        let trimmed = path.trim_matches('/');
        let mut url = self.base_url.join(&format!("{trimmed}.json"))?;
        if let Some(ref auth) = self.auth {
            url.query_pairs_mut()
                .append_pair("auth", auth.expose_secret());
        }
        Ok(url)
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Replace the node at `path` with `value`.
    pub async fn put(&self, path: &str, value: &Value) -> Result<(), Error> {
        let url = self.node_url(path)?;
        debug!(path, "PUT node");
        let response = self.http.put(url).json(value).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Remove the node at `path`.
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.node_url(path)?;
        debug!(path, "DELETE node");
        let response = self.http.delete(url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Read the node at `path` once. Absent nodes read as `Value::Null`.
    pub async fn get(&self, path: &str) -> Result<Value, Error> {
        let url = self.node_url(path)?;
        debug!(path, "GET node");
        let response = check_status(self.http.get(url).send().await?).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// Open a change feed on `path`.
    ///
    /// Returns immediately; the connection is made by a background task.
    /// The first event is the current document. Dropping the receiver
    /// closes the stream.
    pub fn listen(&self, path: &str) -> Result<mpsc::Receiver<FeedEvent>, Error> {
        let url = self.node_url(path)?;
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_SIZE);
        debug!(path, "opening change feed");
        tokio::spawn(feed::feed_loop(self.stream_http.clone(), url, tx));
        Ok(rx)
    }
}

// ── Response handling ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Map non-2xx responses to [`Error::Database`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned()
        });

    Err(Error::Database {
        status: status.as_u16(),
        message,
    })
}
