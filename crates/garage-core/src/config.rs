// ── Runtime connection configuration ──
//
// Describes which database and garage to talk to, and as whom.
// Never touches disk: garage-config or the caller builds one and hands it in.

use std::time::Duration;

use garage_api::{RealtimeClient, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;
use crate::model::{DEFAULT_GARAGE_ID, RemotePaths};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_COMMAND_CHANNEL_SIZE: usize = 64;
const DEFAULT_EVENT_CHANNEL_SIZE: usize = 256;

/// Configuration for one garage controller session.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Realtime database root (e.g. `https://my-garage.firebaseio.com`).
    pub database_url: Url,
    /// Database secret or ID token, sent as the `auth` query parameter.
    pub auth: Option<SecretString>,
    /// Garage node under `garages/`.
    pub garage_id: String,
    /// Stamped as `uid` on every action, options write and token.
    pub issuer_id: String,
    /// Request timeout for writes.
    pub timeout: Duration,
    pub command_channel_size: usize,
    pub event_channel_size: usize,
}

impl ControllerConfig {
    pub fn new(database_url: Url, issuer_id: impl Into<String>) -> Self {
        Self {
            database_url,
            auth: None,
            garage_id: DEFAULT_GARAGE_ID.to_owned(),
            issuer_id: issuer_id.into(),
            timeout: DEFAULT_TIMEOUT,
            command_channel_size: DEFAULT_COMMAND_CHANNEL_SIZE,
            event_channel_size: DEFAULT_EVENT_CHANNEL_SIZE,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: SecretString) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn with_garage_id(mut self, garage_id: impl Into<String>) -> Self {
        self.garage_id = garage_id.into();
        self
    }

    pub fn paths(&self) -> RemotePaths {
        RemotePaths::new(&self.garage_id)
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            ..TransportConfig::default()
        }
    }

    /// Build the HTTP client for the configured database.
    pub fn connect_realtime(&self) -> Result<RealtimeClient, CoreError> {
        if self.issuer_id.is_empty() {
            return Err(CoreError::Config {
                message: "issuer id must not be empty".into(),
            });
        }
        Ok(RealtimeClient::new(
            self.database_url.clone(),
            self.auth.clone(),
            &self.transport(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://garage.example.com").unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn defaults_to_home_garage() {
        let config = ControllerConfig::new(url(), "uid-1");
        assert_eq!(config.garage_id, "home_garage");
        assert_eq!(config.paths().status(), "garages/home_garage/status");
        assert_eq!(config.transport().timeout, Duration::from_secs(30));
    }

    #[test]
    fn empty_issuer_is_rejected() {
        let err = ControllerConfig::new(url(), "").connect_realtime().err();
        assert!(matches!(err, Some(CoreError::Config { .. })));
    }
}
