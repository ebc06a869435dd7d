//! Events — what collaborators tell the engine, and the normalized changes
//! its services emit.

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, LightId};
use crate::light::KnownState;
use crate::presence::HomeState;
use crate::sun::SunPhase;
use crate::time::Timestamp;

/// A device tracker reported a device's presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePresenceEvent {
    pub device_id: DeviceId,
    pub home_state: HomeState,
    pub timestamp: Timestamp,
}

/// The astronomy collaborator reported a phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunPhaseEvent {
    pub phase: SunPhase,
    pub occurred_at: Timestamp,
    pub next_change_at: Timestamp,
}

/// The actuation collaborator echoed a light's real state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightStateEvent {
    pub light_id: LightId,
    pub state: KnownState,
}

/// Everything that can be queued for the engine, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Device(DevicePresenceEvent),
    Sun(SunPhaseEvent),
    Light(LightStateEvent),
}

impl From<DevicePresenceEvent> for InboundEvent {
    fn from(event: DevicePresenceEvent) -> Self {
        Self::Device(event)
    }
}

impl From<SunPhaseEvent> for InboundEvent {
    fn from(event: SunPhaseEvent) -> Self {
        Self::Sun(event)
    }
}

impl From<LightStateEvent> for InboundEvent {
    fn from(event: LightStateEvent) -> Self {
        Self::Light(event)
    }
}

/// The "anyone home" aggregate flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChanged {
    pub anyone_home: bool,
    pub timestamp: Timestamp,
}

/// The tracked sun phase changed (or was re-announced).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunPhaseChanged {
    pub phase: SunPhase,
    pub occurred_at: Timestamp,
}
