//! Light actuation gateway — idempotent on/off batches over a [`LightCommandSink`].
//!
//! A batch only contains the lights whose known state differs from the
//! desired one. Commands within a batch run concurrently, each bounded by a
//! timeout, and the batch is complete when every command has answered or
//! timed out.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use dusklight_domain::error::ActuationError;
use dusklight_domain::id::LightId;
use dusklight_domain::light::{CommandOptions, KnownState, LightCommand, LightState, LightTarget};
use dusklight_domain::trigger::DecisionOutcome;

use crate::ports::LightCommandSink;

/// Outcome of one [`LightGateway::set_lights`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuationReport {
    pub desired: LightState,
    /// Lights whose command was accepted.
    pub issued: Vec<LightId>,
    /// Lights whose command failed or timed out.
    pub failures: Vec<ActuationError>,
}

impl ActuationReport {
    fn noop(desired: LightState) -> Self {
        Self {
            desired,
            issued: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// `true` when no command was sent at all.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.issued.is_empty() && self.failures.is_empty()
    }

    /// Number of commands sent in this batch.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.issued.len() + self.failures.len()
    }

    #[must_use]
    pub fn outcome(&self) -> DecisionOutcome {
        if self.is_noop() {
            DecisionOutcome::AlreadySatisfied
        } else {
            DecisionOutcome::Actuated {
                issued: self.issued.len(),
                failed: self.failures.len(),
            }
        }
    }
}

/// Owns the managed [`LightTarget`]s and issues commands through `S`.
pub struct LightGateway<S> {
    sink: Arc<S>,
    targets: BTreeMap<LightId, LightTarget>,
    command_timeout: Duration,
}

impl<S> LightGateway<S>
where
    S: LightCommandSink + Send + Sync + 'static,
{
    /// Manage `lights` through `sink`. Duplicate ids collapse into one target.
    pub fn new(sink: S, lights: impl IntoIterator<Item = LightId>, command_timeout: Duration) -> Self {
        let targets = lights
            .into_iter()
            .map(|id| (id.clone(), LightTarget::new(id)))
            .collect();
        Self {
            sink: Arc::new(sink),
            targets,
            command_timeout,
        }
    }

    /// Bring every managed light to `desired`.
    ///
    /// No-op when every light is already known to be in `desired`. Failed
    /// lights keep their previous known state; timed-out lights become
    /// [`KnownState::Unknown`]. Nothing is retried.
    pub async fn set_lights(
        &mut self,
        desired: LightState,
        options: &CommandOptions,
    ) -> ActuationReport {
        let mut pending = Vec::new();
        for target in self.targets.values_mut() {
            target.desired_state = Some(desired);
            if target.needs(desired) {
                pending.push(target.id.clone());
            }
        }

        if pending.is_empty() {
            tracing::debug!(%desired, "all lights already satisfied, nothing to send");
            return ActuationReport::noop(desired);
        }

        tracing::info!(%desired, count = pending.len(), "issuing light commands");

        let mut tasks = JoinSet::new();
        for light_id in &pending {
            let sink = Arc::clone(&self.sink);
            let command = LightCommand::new(light_id.clone(), desired, options.clone());
            let timeout = self.command_timeout;
            tasks.spawn(async move {
                let light_id = command.light_id.clone();
                let outcome = match tokio::time::timeout(timeout, sink.send(command)).await {
                    Ok(result) => result,
                    Err(_) => Err(ActuationError::TimedOut {
                        light_id: light_id.clone(),
                        after: timeout,
                    }),
                };
                (light_id, outcome)
            });
        }

        let mut report = ActuationReport::noop(desired);
        let mut unanswered: HashSet<LightId> = pending.into_iter().collect();
        while let Some(joined) = tasks.join_next().await {
            let (light_id, outcome) = match joined {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::error!(%err, "light command task aborted");
                    continue;
                }
            };
            unanswered.remove(&light_id);
            self.apply_outcome(light_id, outcome, &mut report);
        }

        for light_id in unanswered {
            self.mark(&light_id, KnownState::Unknown);
            report.failures.push(ActuationError::Rejected {
                light_id,
                reason: "command task aborted".to_string(),
            });
        }

        report.issued.sort();
        report
            .failures
            .sort_by(|a, b| a.light_id().cmp(b.light_id()));
        report
    }

    fn apply_outcome(
        &mut self,
        light_id: LightId,
        outcome: Result<(), ActuationError>,
        report: &mut ActuationReport,
    ) {
        match outcome {
            Ok(()) => {
                self.mark(&light_id, report.desired.into());
                report.issued.push(light_id);
            }
            Err(err @ ActuationError::TimedOut { .. }) => {
                tracing::warn!(light = %light_id, %err, "light command timed out");
                self.mark(&light_id, KnownState::Unknown);
                report.failures.push(err);
            }
            Err(err) => {
                tracing::warn!(light = %light_id, %err, "light command failed");
                report.failures.push(err);
            }
        }
    }

    fn mark(&mut self, light_id: &LightId, state: KnownState) {
        if let Some(target) = self.targets.get_mut(light_id) {
            target.current_known_state = state;
        }
    }

    /// Apply a state echo from the actuation collaborator.
    ///
    /// Returns `false` for lights this gateway does not manage.
    pub fn report_state(&mut self, light_id: &LightId, state: KnownState) -> bool {
        let Some(target) = self.targets.get_mut(light_id) else {
            tracing::debug!(light = %light_id, "ignoring state echo for unmanaged light");
            return false;
        };
        if target.current_known_state != state {
            tracing::debug!(light = %light_id, from = %target.current_known_state, to = %state, "light state corrected");
        }
        target.current_known_state = state;
        true
    }

    #[must_use]
    pub fn target(&self, light_id: &LightId) -> Option<&LightTarget> {
        self.targets.get(light_id)
    }

    /// Managed lights, ordered by id.
    pub fn targets(&self) -> impl Iterator<Item = &LightTarget> {
        self.targets.values()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
