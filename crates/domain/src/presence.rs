//! Presence — tracked devices and the "anyone home" aggregate.

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;
use crate::time::Timestamp;

/// Home/away state of a single tracked device.
///
/// Anything the tracking collaborator reports that is not recognisably
/// home or away (a named zone, garbage, an empty string) deserializes to
/// [`Unknown`](Self::Unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeState {
    Home,
    NotHome,
    #[default]
    #[serde(other)]
    Unknown,
}

impl HomeState {
    /// Coerce a raw collaborator state string.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "home" => Self::Home,
            "not_home" | "away" => Self::NotHome,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn is_home(self) -> bool {
        matches!(self, Self::Home)
    }
}

impl std::fmt::Display for HomeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => f.write_str("home"),
            Self::NotHome => f.write_str("not_home"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// A device whose presence is being followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedDevice {
    pub id: DeviceId,
    pub display_name: String,
    pub home_state: HomeState,
    pub last_changed: Timestamp,
}

impl TrackedDevice {
    /// A device seen for the first time, state not yet applied.
    #[must_use]
    pub fn new(id: DeviceId, display_name: impl Into<String>, seen_at: Timestamp) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            home_state: HomeState::Unknown,
            last_changed: seen_at,
        }
    }

    /// Apply a reported state. Returns `true` if the state actually changed.
    pub fn update(&mut self, state: HomeState, at: Timestamp) -> bool {
        if self.home_state == state {
            return false;
        }
        self.home_state = state;
        self.last_changed = at;
        true
    }
}

/// OR-reduction of every tracked device's presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceAggregate {
    pub anyone_home: bool,
    pub last_transition: Timestamp,
}

impl PresenceAggregate {
    /// Empty house, as of `at`.
    #[must_use]
    pub fn empty(at: Timestamp) -> Self {
        Self {
            anyone_home: false,
            last_transition: at,
        }
    }

    /// Recompute from the full device set.
    #[must_use]
    pub fn reduce<'a>(devices: impl IntoIterator<Item = &'a TrackedDevice>) -> bool {
        devices.into_iter().any(|d| d.home_state.is_home())
    }
}
