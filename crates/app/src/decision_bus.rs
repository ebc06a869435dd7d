//! Decision bus — fan-out of settled trigger decisions.
//!
//! Live consumers subscribe to a broadcast stream; a subscriber that falls
//! more than `capacity` decisions behind sees [`broadcast::error::RecvError::Lagged`]
//! and resumes from the oldest retained one. The most recent decision is also
//! kept aside so a late reader can learn what the engine last did without
//! having been subscribed at the time.

use std::future::Future;
use std::sync::Mutex;

use tokio::sync::broadcast;

use dusklight_domain::error::DusklightError;
use dusklight_domain::trigger::TriggerDecision;

use crate::ports::DecisionPublisher;

pub struct InProcessDecisionBus {
    stream: broadcast::Sender<TriggerDecision>,
    latest: Mutex<Option<TriggerDecision>>,
}

impl InProcessDecisionBus {
    /// A bus retaining up to `capacity` decisions per lagging subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (stream, _) = broadcast::channel(capacity);
        Self {
            stream,
            latest: Mutex::new(None),
        }
    }

    /// Subscribe to decisions published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TriggerDecision> {
        self.stream.subscribe()
    }

    /// The last decision published, if any.
    #[must_use]
    pub fn latest(&self) -> Option<TriggerDecision> {
        self.latest
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl DecisionPublisher for InProcessDecisionBus {
    fn publish(
        &self,
        decision: TriggerDecision,
    ) -> impl Future<Output = Result<(), DusklightError>> + Send {
        *self
            .latest
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(decision.clone());
        match self.stream.send(decision) {
            Ok(subscribers) => tracing::trace!(subscribers, "trigger decision published"),
            Err(broadcast::error::SendError(decision)) => tracing::debug!(
                rule = %decision.rule,
                "no decision subscribers, kept as latest only"
            ),
        }
        async { Ok(()) }
    }
}
