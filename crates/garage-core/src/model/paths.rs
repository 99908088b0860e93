// ── Database layout ──
//
// Every node this client touches lives under `garages/{garage_id}/`.

use std::fmt;

use strum::{AsRefStr, Display, EnumIter};

/// Garage the firmware registers under unless told otherwise.
pub const DEFAULT_GARAGE_ID: &str = "home_garage";

/// Node paths for one garage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePaths {
    root: String,
}

impl RemotePaths {
    pub fn new(garage_id: &str) -> Self {
        Self {
            root: format!("garages/{garage_id}"),
        }
    }

    /// `garages/{garage}`
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn status(&self) -> String {
        format!("{}/status", self.root)
    }

    pub fn action(&self) -> String {
        format!("{}/controller/action", self.root)
    }

    pub fn auto_close_options(&self) -> String {
        format!("{}/controller/auto_close_options", self.root)
    }

    pub fn auto_close_warning(&self) -> String {
        format!("{}/notifications/auto_close_warning", self.root)
    }

    pub fn token(&self, list: TokenList, token: &str) -> String {
        format!("{}/device_tokens/{}/{token}", self.root, list.as_ref())
    }

    pub fn debug(&self, issuer_id: &str, timestamp: &str) -> String {
        format!("{}/debug/{issuer_id}/{timestamp}", self.root)
    }

    /// Path watched by a change feed.
    pub fn feed(&self, feed: Feed) -> String {
        match feed {
            Feed::Status => self.status(),
            Feed::Options => self.auto_close_options(),
            Feed::AutoCloseWarning => self.auto_close_warning(),
        }
    }
}

impl Default for RemotePaths {
    fn default() -> Self {
        Self::new(DEFAULT_GARAGE_ID)
    }
}

impl fmt::Display for RemotePaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)
    }
}

/// Push-token registries under `device_tokens/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TokenList {
    /// Every device that ever signed in.
    AllTokens,
    /// Devices that want a push on every status change.
    StatusUpdate,
}

/// The three change feeds a process subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Feed {
    Status,
    Options,
    AutoCloseWarning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_garage_paths() {
        let paths = RemotePaths::default();
        assert_eq!(paths.status(), "garages/home_garage/status");
        assert_eq!(paths.action(), "garages/home_garage/controller/action");
        assert_eq!(
            paths.auto_close_options(),
            "garages/home_garage/controller/auto_close_options"
        );
        assert_eq!(
            paths.auto_close_warning(),
            "garages/home_garage/notifications/auto_close_warning"
        );
    }

    #[test]
    fn token_and_debug_paths() {
        let paths = RemotePaths::new("barn");
        assert_eq!(
            paths.token(TokenList::AllTokens, "tok"),
            "garages/barn/device_tokens/all_tokens/tok"
        );
        assert_eq!(
            paths.token(TokenList::StatusUpdate, "tok"),
            "garages/barn/device_tokens/status_update/tok"
        );
        assert_eq!(
            paths.debug("uid-1", "2019-07-04 18:05:09"),
            "garages/barn/debug/uid-1/2019-07-04 18:05:09"
        );
    }

    #[test]
    fn feed_paths_and_names() {
        let paths = RemotePaths::default();
        assert_eq!(paths.feed(Feed::Options), paths.auto_close_options());
        assert_eq!(Feed::AutoCloseWarning.to_string(), "auto_close_warning");
    }
}
