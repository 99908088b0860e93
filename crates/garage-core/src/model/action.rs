use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Commands the door controller acts on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Open,
    Close,
    StopAutoClose,
}

/// Outbound command written to `controller/action`.
///
/// Fire-and-forget: there is no acknowledgment. The door's next status
/// report is the only confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarageAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(rename = "uid")]
    pub issuer_id: String,
    #[serde(rename = "a_timestamp")]
    pub timestamp: String,
}

/// Free-text entry under `debug/{uid}/{timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugMessage {
    pub message: String,
}
