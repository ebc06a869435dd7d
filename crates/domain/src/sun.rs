//! Sun phase — coarse day/night indicator supplied by an astronomy collaborator.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Position of the sun relative to the horizon.
///
/// [`Unknown`](Self::Unknown) means no (or no longer trustworthy) information;
/// it never counts as dark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SunPhase {
    AboveHorizon,
    BelowHorizon,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SunPhase {
    /// Coerce a raw collaborator phase string.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "above_horizon" => Self::AboveHorizon,
            "below_horizon" => Self::BelowHorizon,
            _ => Self::Unknown,
        }
    }

    /// Only a reported `BelowHorizon` is dark.
    #[must_use]
    pub fn is_dark(self) -> bool {
        matches!(self, Self::BelowHorizon)
    }
}

impl std::fmt::Display for SunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AboveHorizon => f.write_str("above_horizon"),
            Self::BelowHorizon => f.write_str("below_horizon"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Last known sun phase and the forecast of its next change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SunState {
    pub phase: SunPhase,
    pub changed_at: Option<Timestamp>,
    pub next_change_at: Option<Timestamp>,
}
