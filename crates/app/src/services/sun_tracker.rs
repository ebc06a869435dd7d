//! Sun phase tracker — last reported phase and when it stops being trustworthy.
//!
//! The astronomy collaborator announces each phase change together with the
//! forecast time of the next one. If that forecast passes (plus a grace
//! period) without a new announcement, the tracker forgets the phase rather
//! than guess which side of the horizon the sun is on.
//!
//! The forecast is only trusted as a span (`next_change_at - occurred_at`).
//! The deadline is armed on the local monotonic clock from the moment the
//! report was received, so a collaborator whose wall clock disagrees with
//! ours, or replayed reports, never expire a phase early.

use std::time::Duration;

use tokio::time::Instant;

use dusklight_domain::event::SunPhaseChanged;
use dusklight_domain::sun::{SunPhase, SunState};
use dusklight_domain::time::Timestamp;

pub struct SunPhaseTracker {
    state: SunState,
    grace: Duration,
    deadline: Option<Instant>,
}

impl SunPhaseTracker {
    /// A tracker with no phase information yet.
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            state: SunState::default(),
            grace,
            deadline: None,
        }
    }

    /// Apply a phase-change notification received at `received`. Always
    /// announces the new phase, even when it repeats the current one.
    ///
    /// A forecast that does not lie after `occurred_at` arms no deadline.
    pub fn on_phase_change(
        &mut self,
        phase: SunPhase,
        occurred_at: Timestamp,
        next_change_at: Timestamp,
        received: Instant,
    ) -> SunPhaseChanged {
        let span = (next_change_at - occurred_at)
            .to_std()
            .ok()
            .filter(|span| !span.is_zero());

        if phase == SunPhase::Unknown {
            tracing::warn!("unrecognised sun phase reported, sun-based rules suspended");
        } else if span.is_none() {
            tracing::warn!(
                %phase,
                %occurred_at,
                %next_change_at,
                "sun phase forecast does not lie ahead, phase will not expire"
            );
        } else {
            tracing::info!(%phase, %next_change_at, "sun phase reported");
        }

        self.state = SunState {
            phase,
            changed_at: Some(occurred_at),
            next_change_at: Some(next_change_at),
        };
        self.deadline = match phase {
            SunPhase::Unknown => None,
            _ => span.and_then(|span| received.checked_add(span + self.grace)),
        };
        SunPhaseChanged { phase, occurred_at }
    }

    /// When the current phase goes stale, if it is known and has a usable
    /// forecast.
    #[must_use]
    pub fn expiry_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drop back to [`SunPhase::Unknown`] if the deadline has passed at `now`.
    ///
    /// The announced change is stamped with the forecast plus grace, on the
    /// collaborator's timeline.
    pub fn expire(&mut self, now: Instant) -> Option<SunPhaseChanged> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        tracing::warn!(
            phase = %self.state.phase,
            "expected sun phase change was not reported, treating phase as unknown"
        );
        let grace = chrono::Duration::from_std(self.grace).unwrap_or(chrono::Duration::zero());
        let occurred_at = self
            .state
            .next_change_at
            .and_then(|next| next.checked_add_signed(grace))
            .or(self.state.next_change_at)
            .unwrap_or_else(dusklight_domain::time::now);

        self.deadline = None;
        self.state.phase = SunPhase::Unknown;
        self.state.changed_at = Some(occurred_at);
        Some(SunPhaseChanged {
            phase: SunPhase::Unknown,
            occurred_at,
        })
    }

    #[must_use]
    pub fn phase(&self) -> SunPhase {
        self.state.phase
    }

    #[must_use]
    pub fn state(&self) -> SunState {
        self.state
    }
}
