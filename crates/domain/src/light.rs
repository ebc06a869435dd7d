//! Lights — managed targets and the commands sent to them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::id::LightId;

/// A state the engine can ask a light to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    On,
    Off,
}

impl std::fmt::Display for LightState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// What the engine believes a light currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownState {
    On,
    Off,
    #[default]
    #[serde(other)]
    Unknown,
}

impl KnownState {
    /// Whether this known state already satisfies `desired`.
    #[must_use]
    pub fn satisfies(self, desired: LightState) -> bool {
        matches!(
            (self, desired),
            (Self::On, LightState::On) | (Self::Off, LightState::Off)
        )
    }
}

impl From<LightState> for KnownState {
    fn from(state: LightState) -> Self {
        match state {
            LightState::On => Self::On,
            LightState::Off => Self::Off,
        }
    }
}

impl std::fmt::Display for KnownState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// A light under the engine's control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightTarget {
    pub id: LightId,
    /// The state last requested by the engine, if any.
    pub desired_state: Option<LightState>,
    pub current_known_state: KnownState,
}

impl LightTarget {
    /// A freshly managed light whose real state has not been observed yet.
    #[must_use]
    pub fn new(id: LightId) -> Self {
        Self {
            id,
            desired_state: None,
            current_known_state: KnownState::Unknown,
        }
    }

    /// Whether a command is needed to bring this light to `desired`.
    #[must_use]
    pub fn needs(&self, desired: LightState) -> bool {
        !self.current_known_state.satisfies(desired)
    }
}

/// Extra parameters carried alongside a light command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOptions {
    /// Fade duration; `None` switches instantly.
    pub transition: Option<Duration>,
    /// Named light profile (brightness/colour preset) understood by the
    /// actuation collaborator.
    pub profile: Option<String>,
}

/// A single on/off instruction for one light.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightCommand {
    pub light_id: LightId,
    pub desired_state: LightState,
    #[serde(flatten)]
    pub options: CommandOptions,
}

impl LightCommand {
    /// Build a command for `light_id`, carrying `options` verbatim.
    #[must_use]
    pub fn new(light_id: LightId, desired_state: LightState, options: CommandOptions) -> Self {
        Self {
            light_id,
            desired_state,
            options,
        }
    }
}
