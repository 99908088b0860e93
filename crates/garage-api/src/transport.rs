// Shared transport configuration for building reqwest::Client instances.
//
// Plain requests get a whole-request timeout; change feeds are long-lived
// and only bound the connect phase.

use std::time::Duration;

const USER_AGENT: &str = concat!("garage-api/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout for reads and writes.
    pub timeout: Duration,
    /// Connect timeout for change-feed streams.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build the `reqwest::Client` used for one-shot requests.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| crate::error::Error::ClientSetup(e.to_string()))
    }

    /// Build the `reqwest::Client` used for change feeds.
    ///
    /// No overall timeout: a feed stays open for as long as the listener does.
    pub fn build_streaming_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| crate::error::Error::ClientSetup(e.to_string()))
    }
}
