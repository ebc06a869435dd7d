//! Decision publisher port — observability sink for trigger decisions.

use std::future::Future;

use dusklight_domain::error::DusklightError;
use dusklight_domain::trigger::TriggerDecision;

/// Publishes [`TriggerDecision`]s to interested subscribers.
///
/// Not required for correctness: the engine ignores publish failures.
pub trait DecisionPublisher {
    /// Publish a decision to all current subscribers.
    fn publish(
        &self,
        decision: TriggerDecision,
    ) -> impl Future<Output = Result<(), DusklightError>> + Send;
}

impl<T: DecisionPublisher + Send + Sync> DecisionPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        decision: TriggerDecision,
    ) -> impl Future<Output = Result<(), DusklightError>> + Send {
        (**self).publish(decision)
    }
}
