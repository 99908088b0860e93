// ── Door status and its display semantics ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::CoreError;

/// What the door is believed to be doing.
///
/// The remote store reports these as upper-case strings. Any status may
/// follow any other: transitions are never validated locally.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GarageStatus {
    #[default]
    Closed,
    Closing,
    Open,
    Opening,
    Paused,
}

/// Outcome of reading a remote status string.
///
/// Always carries a usable status. Unrecognized input falls back to
/// [`GarageStatus::Closed`] and carries the diagnostic to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReading {
    pub status: GarageStatus,
    pub diagnostic: Option<CoreError>,
}

impl GarageStatus {
    /// Map a remote status string. Never fails.
    pub fn read(raw: &str) -> StatusReading {
        match raw.parse::<Self>() {
            Ok(status) => StatusReading {
                status,
                diagnostic: None,
            },
            Err(_) => StatusReading {
                status: Self::Closed,
                diagnostic: Some(CoreError::UnknownStatus { raw: raw.to_owned() }),
            },
        }
    }

    /// `true` while the door is travelling.
    pub fn is_in_motion(self) -> bool {
        matches!(self, Self::Opening | Self::Closing)
    }

    pub fn display_attributes(self) -> DisplayAttributes {
        let (color, urgency) = match self {
            Self::Closed => (ColorTag::Green, Urgency::Calm),
            Self::Closing => (ColorTag::Amber, Urgency::Active),
            Self::Open => (ColorTag::Red, Urgency::Attention),
            Self::Opening => (ColorTag::Orange, Urgency::Active),
            Self::Paused => (ColorTag::Blue, Urgency::Attention),
        };
        DisplayAttributes {
            color,
            urgency,
            in_motion: self.is_in_motion(),
        }
    }
}

/// Total status parse: unknown input logs an error and yields `CLOSED`.
pub fn parse_status(raw: &str) -> GarageStatus {
    let reading = GarageStatus::read(raw);
    if let Some(ref diagnostic) = reading.diagnostic {
        tracing::error!(error = %diagnostic, "unrecognized garage status");
    }
    reading.status
}

// ── Display semantics ───────────────────────────────────────────────

/// Color a status is rendered in. One per status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ColorTag {
    Green,
    Amber,
    Red,
    Orange,
    Blue,
}

/// How loudly a status should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Urgency {
    Calm,
    Active,
    Attention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayAttributes {
    pub color: ColorTag,
    pub urgency: Urgency,
    /// Show a progress indicator.
    pub in_motion: bool,
}
