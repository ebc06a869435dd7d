//! Ordered single-consumer event queue feeding the trigger engine.
//!
//! Any number of producers hold an [`EngineHandle`]; exactly one
//! [`EngineInbox`] is drained by the engine's processing loop, so events are
//! evaluated one at a time in arrival order.

use tokio::sync::mpsc;

use dusklight_domain::error::DusklightError;
use dusklight_domain::event::{DevicePresenceEvent, InboundEvent, LightStateEvent, SunPhaseEvent};
use dusklight_domain::id::{DeviceId, LightId};
use dusklight_domain::light::KnownState;
use dusklight_domain::presence::HomeState;
use dusklight_domain::sun::SunPhase;
use dusklight_domain::time::Timestamp;

/// Create a bounded queue with room for `capacity` pending events.
#[must_use]
pub fn channel(capacity: usize) -> (EngineHandle, EngineInbox) {
    let (sender, receiver) = mpsc::channel(capacity);
    (EngineHandle { sender }, EngineInbox { receiver })
}

/// Producer side of the engine queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<InboundEvent>,
}

impl EngineHandle {
    /// Queue an event, waiting for room if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`DusklightError::QueueClosed`] once the engine has stopped.
    pub async fn submit(&self, event: impl Into<InboundEvent>) -> Result<(), DusklightError> {
        self.sender
            .send(event.into())
            .await
            .map_err(|_| DusklightError::QueueClosed)
    }

    /// Queue a presence report from the device tracker.
    ///
    /// # Errors
    ///
    /// Returns [`DusklightError::QueueClosed`] once the engine has stopped.
    pub async fn device_presence(
        &self,
        device_id: DeviceId,
        home_state: HomeState,
        timestamp: Timestamp,
    ) -> Result<(), DusklightError> {
        self.submit(DevicePresenceEvent {
            device_id,
            home_state,
            timestamp,
        })
        .await
    }

    /// Queue a phase-change notification from the astronomy collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`DusklightError::QueueClosed`] once the engine has stopped.
    pub async fn sun_phase(
        &self,
        phase: SunPhase,
        occurred_at: Timestamp,
        next_change_at: Timestamp,
    ) -> Result<(), DusklightError> {
        self.submit(SunPhaseEvent {
            phase,
            occurred_at,
            next_change_at,
        })
        .await
    }

    /// Queue a light state echo from the actuation collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`DusklightError::QueueClosed`] once the engine has stopped.
    pub async fn light_state(
        &self,
        light_id: LightId,
        state: KnownState,
    ) -> Result<(), DusklightError> {
        self.submit(LightStateEvent { light_id, state }).await
    }
}

/// Consumer side of the engine queue, owned by the processing loop.
#[derive(Debug)]
pub struct EngineInbox {
    receiver: mpsc::Receiver<InboundEvent>,
}

impl EngineInbox {
    /// Next queued event, or `None` once every handle has been dropped and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<InboundEvent> {
        self.receiver.recv().await
    }
}
