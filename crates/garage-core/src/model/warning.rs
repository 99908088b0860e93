use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::duration_ms;

/// Auto-close warning published by the door controller at
/// `notifications/auto_close_warning`.
///
/// A zero `timeout` is the controller's way of saying "no warning".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCloseWarning {
    /// Time left before the door closes on its own.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl AutoCloseWarning {
    pub fn is_no_warning(&self) -> bool {
        self.timeout.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_millisecond_fields() {
        let raw = json!({ "timeout": 300_000, "timestamp": 1_562_263_509_000_i64 });
        let warning: AutoCloseWarning = serde_json::from_value(raw)
            .unwrap_or_else(|e| panic!("warning should parse: {e}"));
        assert_eq!(warning.timeout, Duration::from_secs(300));
        assert_eq!(warning.timestamp.timestamp(), 1_562_263_509);
        assert!(!warning.is_no_warning());
    }

    #[test]
    fn zero_timeout_means_no_warning() {
        let warning: AutoCloseWarning =
            serde_json::from_value(json!({ "timeout": 0, "timestamp": 0 }))
                .unwrap_or_else(|e| panic!("warning should parse: {e}"));
        assert!(warning.is_no_warning());
    }
}
