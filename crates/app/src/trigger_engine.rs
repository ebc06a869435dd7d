//! Trigger engine — turns presence and sun events into light batches.
//!
//! The engine owns every piece of mutable state (presence table, sun phase,
//! light targets) and is driven by a single processing loop over an
//! [`EngineInbox`]. Every presence or sun event is applied to its service and
//! then the rules are evaluated exactly once, sending at most one batch to the
//! [`LightGateway`]. Light echoes only update known state.
//!
//! Decisions are published after their batch settles, so subscribers see what
//! was actually done.

use std::time::Duration;

use tokio::time::Instant;

use dusklight_domain::event::InboundEvent;
use dusklight_domain::light::CommandOptions;
use dusklight_domain::time::Timestamp;
use dusklight_domain::trigger::{
    self, ActionKind, DecisionOutcome, Edge, Rule, TriggerDecision, TriggerState,
};

use crate::event_queue::EngineInbox;
use crate::ports::{DecisionPublisher, LightCommandSink};
use crate::services::light_gateway::{ActuationReport, LightGateway};
use crate::services::presence_aggregator::PresenceAggregator;
use crate::services::sun_tracker::SunPhaseTracker;

/// Tunables for the trigger rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSettings {
    /// Fade used when lights come on because the sun set.
    pub sunset_transition: Option<Duration>,
    /// Light profile attached to every "on" command.
    pub light_profile: Option<String>,
    /// Evaluate departures but never send the resulting "off" batch.
    pub disable_turn_off: bool,
    /// How long past the forecast phase change a phase stays trusted.
    pub phase_grace: Duration,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            sunset_transition: None,
            light_profile: None,
            disable_turn_off: false,
            phase_grace: Duration::from_secs(120),
        }
    }
}

/// Result of one rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub edge: Edge,
    /// The rule that fired, if any.
    pub rule: Option<Rule>,
    /// The gateway's report, when a batch was requested.
    pub report: Option<ActuationReport>,
}

/// Reactive engine merging presence and sun phase into light commands.
pub struct TriggerEngine<S, P> {
    settings: TriggerSettings,
    presence: PresenceAggregator,
    sun: SunPhaseTracker,
    gateway: LightGateway<S>,
    publisher: P,
    trigger_state: TriggerState,
}

impl<S, P> TriggerEngine<S, P>
where
    S: LightCommandSink + Send + Sync + 'static,
    P: DecisionPublisher,
{
    /// Create an engine. The sun phase starts unknown.
    pub fn new(
        settings: TriggerSettings,
        presence: PresenceAggregator,
        gateway: LightGateway<S>,
        publisher: P,
    ) -> Self {
        let sun = SunPhaseTracker::new(settings.phase_grace);
        Self {
            settings,
            presence,
            sun,
            gateway,
            publisher,
            trigger_state: TriggerState::default(),
        }
    }

    /// Apply one inbound event.
    ///
    /// Returns the evaluation it caused; `None` only for light echoes.
    /// A device report that leaves the aggregate untouched is still
    /// evaluated, so lights switched by hand are corrected on the next report.
    #[tracing::instrument(skip(self))]
    pub async fn handle(&mut self, event: InboundEvent) -> Option<Evaluation> {
        match event {
            InboundEvent::Device(event) => {
                let at = event.timestamp;
                // Rules run whether or not the aggregate flipped.
                self.presence
                    .on_device_event(event.device_id, event.home_state, at);
                Some(self.evaluate(Edge::Presence, at).await)
            }
            InboundEvent::Sun(event) => {
                let change = self.sun.on_phase_change(
                    event.phase,
                    event.occurred_at,
                    event.next_change_at,
                    Instant::now(),
                );
                Some(self.evaluate(Edge::Sun, change.occurred_at).await)
            }
            InboundEvent::Light(event) => {
                self.gateway.report_state(&event.light_id, event.state);
                None
            }
        }
    }

    /// Forget the sun phase if its deadline has passed by `now`, and re-evaluate.
    pub async fn expire_sun_phase(&mut self, now: Instant) -> Option<Evaluation> {
        let change = self.sun.expire(now)?;
        Some(self.evaluate(Edge::Sun, change.occurred_at).await)
    }

    async fn evaluate(&mut self, edge: Edge, at: Timestamp) -> Evaluation {
        let anyone_home = self.presence.anyone_home();
        let phase = self.sun.phase();

        let Some(rule) = trigger::decide(anyone_home, phase) else {
            tracing::debug!(anyone_home, %phase, "no rule applies, leaving lights alone");
            return Evaluation {
                edge,
                rule: None,
                report: None,
            };
        };

        tracing::info!(%rule, ?edge, desired = %rule.desired_state(), "trigger rule fired");

        if rule == Rule::Departure && self.settings.disable_turn_off {
            tracing::info!("everyone left, turning lights off is disabled");
            self.publish(TriggerDecision::new(rule, edge, at, DecisionOutcome::Suppressed))
                .await;
            return Evaluation {
                edge,
                rule: Some(rule),
                report: None,
            };
        }

        let options = self.command_options(rule, edge);
        let report = self.gateway.set_lights(rule.desired_state(), &options).await;
        let outcome = report.outcome();
        if outcome.sent_commands() {
            self.trigger_state
                .record(ActionKind::classify(rule, edge), at);
        }
        self.publish(TriggerDecision::new(rule, edge, at, outcome)).await;

        Evaluation {
            edge,
            rule: Some(rule),
            report: Some(report),
        }
    }

    async fn publish(&self, decision: TriggerDecision) {
        if let Err(err) = self.publisher.publish(decision).await {
            tracing::warn!(%err, "failed to publish trigger decision");
        }
    }

    fn command_options(&self, rule: Rule, edge: Edge) -> CommandOptions {
        match rule {
            Rule::Departure => CommandOptions::default(),
            Rule::DarkOccupied => CommandOptions {
                transition: match edge {
                    Edge::Sun => self.settings.sunset_transition,
                    Edge::Presence => None,
                },
                profile: self.settings.light_profile.clone(),
            },
        }
    }

    /// Drain `inbox` until every producer is gone, then hand the engine back.
    ///
    /// Besides queued events, the only thing that wakes the loop is the sun
    /// phase's expiry deadline.
    pub async fn run(mut self, mut inbox: EngineInbox) -> Self {
        tracing::info!(
            lights = self.gateway.targets().count(),
            "trigger engine started"
        );

        loop {
            let next = match self.sun.expiry_deadline() {
                Some(deadline) => {
                    tokio::select! {
                        biased;
                        event = inbox.recv() => event,
                        () = tokio::time::sleep_until(deadline) => {
                            self.expire_sun_phase(Instant::now()).await;
                            continue;
                        }
                    }
                }
                None => inbox.recv().await,
            };

            let Some(event) = next else {
                break;
            };
            self.handle(event).await;
        }

        tracing::info!("event queue closed, trigger engine stopped");
        self
    }

    #[must_use]
    pub fn presence(&self) -> &PresenceAggregator {
        &self.presence
    }

    #[must_use]
    pub fn sun(&self) -> &SunPhaseTracker {
        &self.sun
    }

    #[must_use]
    pub fn gateway(&self) -> &LightGateway<S> {
        &self.gateway
    }

    #[must_use]
    pub fn trigger_state(&self) -> TriggerState {
        self.trigger_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::{Arc, Mutex};

    use dusklight_domain::error::{ActuationError, DusklightError};
    use dusklight_domain::event::{DevicePresenceEvent, LightStateEvent, SunPhaseEvent};
    use dusklight_domain::id::{DeviceId, LightId};
    use dusklight_domain::light::{KnownState, LightCommand, LightState};
    use dusklight_domain::presence::HomeState;
    use dusklight_domain::sun::SunPhase;
    use dusklight_domain::time::now;

    use crate::event_queue;

    // ── Recording sink ─────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingSink {
        commands: Mutex<Vec<LightCommand>>,
    }

    impl LightCommandSink for RecordingSink {
        fn send(
            &self,
            command: LightCommand,
        ) -> impl Future<Output = Result<(), ActuationError>> + Send {
            self.commands.lock().unwrap().push(command);
            async { Ok(()) }
        }
    }

    // ── Spy publisher ──────────────────────────────────────────────

    #[derive(Default)]
    struct SpyPublisher {
        decisions: Mutex<Vec<TriggerDecision>>,
    }

    impl DecisionPublisher for SpyPublisher {
        fn publish(
            &self,
            decision: TriggerDecision,
        ) -> impl Future<Output = Result<(), DusklightError>> + Send {
            self.decisions.lock().unwrap().push(decision);
            async { Ok(()) }
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    type TestEngine = TriggerEngine<Arc<RecordingSink>, Arc<SpyPublisher>>;

    struct Harness {
        engine: TestEngine,
        sink: Arc<RecordingSink>,
        publisher: Arc<SpyPublisher>,
    }

    impl Harness {
        fn new(settings: TriggerSettings) -> Self {
            let sink = Arc::new(RecordingSink::default());
            let publisher = Arc::new(SpyPublisher::default());
            let gateway = LightGateway::new(
                Arc::clone(&sink),
                [LightId::from("light.bed_light"), LightId::from("light.ceiling")],
                Duration::from_secs(5),
            );
            let engine = TriggerEngine::new(
                settings,
                PresenceAggregator::new([], now()),
                gateway,
                Arc::clone(&publisher),
            );
            Self {
                engine,
                sink,
                publisher,
            }
        }

        fn commands(&self) -> Vec<LightCommand> {
            self.sink.commands.lock().unwrap().clone()
        }

        fn decisions(&self) -> Vec<TriggerDecision> {
            self.publisher.decisions.lock().unwrap().clone()
        }

        async fn device(&mut self, id: &str, state: HomeState) -> Option<Evaluation> {
            self.engine
                .handle(InboundEvent::Device(DevicePresenceEvent {
                    device_id: DeviceId::from(id),
                    home_state: state,
                    timestamp: now(),
                }))
                .await
        }

        async fn sun(&mut self, phase: SunPhase) -> Option<Evaluation> {
            let at = now();
            self.engine
                .handle(InboundEvent::Sun(SunPhaseEvent {
                    phase,
                    occurred_at: at,
                    next_change_at: at + chrono::Duration::hours(12),
                }))
                .await
        }

        async fn lights_reported(&mut self, state: KnownState) {
            for light in ["light.bed_light", "light.ceiling"] {
                self.engine
                    .handle(InboundEvent::Light(LightStateEvent {
                        light_id: LightId::from(light),
                        state,
                    }))
                    .await;
            }
        }

        fn all_lights(&self, state: KnownState) -> bool {
            self.engine
                .gateway()
                .targets()
                .all(|t| t.current_known_state == state)
        }
    }

    fn batch_size(evaluation: Option<&Evaluation>) -> usize {
        evaluation
            .and_then(|e| e.report.as_ref())
            .map_or(0, ActuationReport::attempted)
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_turn_lights_on_when_sun_sets_with_someone_home() {
        let mut h = Harness::new(TriggerSettings::default());
        h.device("device_1", HomeState::Home).await;
        h.sun(SunPhase::AboveHorizon).await;
        h.lights_reported(KnownState::Off).await;
        assert!(h.commands().is_empty());

        let evaluation = h.sun(SunPhase::BelowHorizon).await;

        assert_eq!(batch_size(evaluation.as_ref()), 2);
        assert!(h.commands().iter().all(|c| c.desired_state == LightState::On));
        assert!(h.all_lights(KnownState::On));
        assert_eq!(
            h.engine.trigger_state().last_action_kind,
            ActionKind::TurnOnOnSunset
        );
    }

    #[tokio::test]
    async fn should_turn_lights_off_when_everyone_leaves() {
        for phase in [SunPhase::AboveHorizon, SunPhase::BelowHorizon, SunPhase::Unknown] {
            let mut h = Harness::new(TriggerSettings::default());
            if phase != SunPhase::Unknown {
                h.sun(phase).await;
            }
            h.device("device_1", HomeState::Home).await;
            h.lights_reported(KnownState::On).await;
            let before = h.commands().len();

            let evaluation = h.device("device_1", HomeState::NotHome).await;

            assert_eq!(evaluation.as_ref().and_then(|e| e.rule), Some(Rule::Departure));
            let sent = &h.commands()[before..];
            assert_eq!(sent.len(), 2, "{phase}");
            assert!(sent.iter().all(|c| c.desired_state == LightState::Off));
            assert!(h.all_lights(KnownState::Off));
            assert_eq!(
                h.engine.trigger_state().last_action_kind,
                ActionKind::TurnOffOnDeparture
            );
        }
    }

    #[tokio::test]
    async fn should_turn_lights_on_when_arriving_after_sunset() {
        let mut h = Harness::new(TriggerSettings::default());
        h.sun(SunPhase::BelowHorizon).await;
        h.device("device_1", HomeState::NotHome).await;
        h.lights_reported(KnownState::Off).await;
        let before = h.commands().len();

        let evaluation = h.device("device_2", HomeState::Home).await;

        assert_eq!(batch_size(evaluation.as_ref()), 2);
        assert_eq!(h.commands().len() - before, 2);
        assert!(h.all_lights(KnownState::On));
        assert_eq!(
            h.engine.trigger_state().last_action_kind,
            ActionKind::TurnOnOnArrival
        );
    }

    #[tokio::test]
    async fn should_leave_lights_alone_during_daytime_occupancy() {
        let mut h = Harness::new(TriggerSettings::default());
        h.sun(SunPhase::AboveHorizon).await;
        h.lights_reported(KnownState::On).await;
        let before = h.commands().len();

        let evaluation = h.device("device_1", HomeState::Home).await;

        assert_eq!(evaluation.and_then(|e| e.rule), None);
        assert_eq!(h.commands().len(), before);
        assert!(h.all_lights(KnownState::On));
    }

    #[tokio::test]
    async fn should_not_turn_on_at_sunrise_or_sunset_twice() {
        let mut h = Harness::new(TriggerSettings::default());
        h.device("device_1", HomeState::Home).await;
        h.sun(SunPhase::BelowHorizon).await;
        let after_sunset = h.commands().len();

        let repeated = h.sun(SunPhase::BelowHorizon).await;
        assert_eq!(batch_size(repeated.as_ref()), 0);

        let sunrise = h.sun(SunPhase::AboveHorizon).await;
        assert!(sunrise.unwrap().report.is_none());
        assert_eq!(h.commands().len(), after_sunset);
    }

    #[tokio::test]
    async fn should_not_flap_when_device_oscillates_while_other_home() {
        let mut h = Harness::new(TriggerSettings::default());
        h.sun(SunPhase::BelowHorizon).await;
        h.device("device_1", HomeState::Home).await;
        let settled = h.commands().len();

        for state in [HomeState::Home, HomeState::NotHome, HomeState::Home, HomeState::NotHome] {
            let evaluation = h.device("device_2", state).await.unwrap();
            assert_eq!(evaluation.rule, Some(Rule::DarkOccupied));
            assert!(evaluation.report.unwrap().is_noop());
        }
        assert_eq!(h.commands().len(), settled);
        assert!(
            h.decisions()[2..]
                .iter()
                .all(|d| d.outcome == DecisionOutcome::AlreadySatisfied)
        );
    }

    #[tokio::test]
    async fn should_turn_lights_back_on_when_second_device_arrives_after_dark() {
        let mut h = Harness::new(TriggerSettings::default());
        h.sun(SunPhase::BelowHorizon).await;
        h.device("device_1", HomeState::Home).await;
        assert!(h.all_lights(KnownState::On));
        h.lights_reported(KnownState::Off).await;
        let before = h.commands().len();

        let evaluation = h.device("device_2", HomeState::Home).await;

        assert_eq!(batch_size(evaluation.as_ref()), 2);
        let sent = &h.commands()[before..];
        assert!(sent.iter().all(|c| c.desired_state == LightState::On));
        assert!(h.all_lights(KnownState::On));
        let last = h.decisions().last().cloned().unwrap();
        assert_eq!((last.rule, last.edge), (Rule::DarkOccupied, Edge::Presence));
        assert_eq!(
            last.outcome,
            DecisionOutcome::Actuated {
                issued: 2,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn should_never_turn_on_when_sun_phase_unknown() {
        let mut h = Harness::new(TriggerSettings::default());
        h.lights_reported(KnownState::Off).await;

        let evaluation = h.device("device_1", HomeState::Home).await;

        assert_eq!(evaluation.and_then(|e| e.rule), None);
        assert!(h.commands().is_empty());
    }

    #[tokio::test]
    async fn should_treat_unrecognised_phase_as_unknown() {
        let mut h = Harness::new(TriggerSettings::default());
        h.device("device_1", HomeState::Home).await;
        h.lights_reported(KnownState::Off).await;

        let evaluation = h.sun(SunPhase::from_raw("civil_dusk")).await;

        assert_eq!(evaluation.and_then(|e| e.rule), None);
        assert!(h.commands().is_empty());
    }

    #[tokio::test]
    async fn should_publish_decision_for_every_fired_rule() {
        let mut h = Harness::new(TriggerSettings::default());
        h.sun(SunPhase::BelowHorizon).await;
        h.device("device_1", HomeState::Home).await;
        h.device("device_1", HomeState::NotHome).await;

        h.device("device_1", HomeState::NotHome).await;

        let rules: Vec<_> = h
            .decisions()
            .iter()
            .map(|d| (d.rule, d.edge, d.outcome))
            .collect();
        let all = DecisionOutcome::Actuated {
            issued: 2,
            failed: 0,
        };
        assert_eq!(
            rules,
            vec![
                (Rule::Departure, Edge::Sun, all),
                (Rule::DarkOccupied, Edge::Presence, all),
                (Rule::Departure, Edge::Presence, all),
                (Rule::Departure, Edge::Presence, DecisionOutcome::AlreadySatisfied),
            ]
        );
    }

    #[tokio::test]
    async fn should_skip_off_batch_when_turn_off_disabled() {
        let mut h = Harness::new(TriggerSettings {
            disable_turn_off: true,
            ..TriggerSettings::default()
        });
        h.device("device_1", HomeState::Home).await;
        h.lights_reported(KnownState::On).await;

        let evaluation = h.device("device_1", HomeState::NotHome).await.unwrap();

        assert_eq!(evaluation.rule, Some(Rule::Departure));
        assert!(evaluation.report.is_none());
        assert!(h.commands().is_empty());
        let decisions = h.decisions();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].outcome, DecisionOutcome::Suppressed);
        assert!(h.all_lights(KnownState::On));
    }

    #[tokio::test]
    async fn should_fade_in_on_sunset_but_not_on_arrival() {
        let settings = TriggerSettings {
            sunset_transition: Some(Duration::from_secs(900)),
            light_profile: Some("relax".to_string()),
            ..TriggerSettings::default()
        };

        let mut sunset = Harness::new(settings.clone());
        sunset.device("device_1", HomeState::Home).await;
        sunset.sun(SunPhase::BelowHorizon).await;
        let cmd = &sunset.commands()[0];
        assert_eq!(cmd.options.transition, Some(Duration::from_secs(900)));
        assert_eq!(cmd.options.profile.as_deref(), Some("relax"));

        let mut arrival = Harness::new(settings);
        arrival.sun(SunPhase::BelowHorizon).await;
        arrival.lights_reported(KnownState::Off).await;
        arrival.device("device_1", HomeState::Home).await;
        let cmd = arrival.commands().last().cloned().unwrap();
        assert_eq!(cmd.desired_state, LightState::On);
        assert_eq!(cmd.options.transition, None);
        assert_eq!(cmd.options.profile.as_deref(), Some("relax"));
    }

    #[tokio::test]
    async fn should_not_evaluate_on_light_echo() {
        let mut h = Harness::new(TriggerSettings::default());
        let evaluation = h
            .engine
            .handle(InboundEvent::Light(LightStateEvent {
                light_id: LightId::from("light.ceiling"),
                state: KnownState::On,
            }))
            .await;
        assert!(evaluation.is_none());
        assert!(h.decisions().is_empty());
    }

    #[tokio::test]
    async fn should_stay_inert_without_lights() {
        let sink = Arc::new(RecordingSink::default());
        let gateway = LightGateway::new(Arc::clone(&sink), [], Duration::from_secs(5));
        let mut engine = TriggerEngine::new(
            TriggerSettings::default(),
            PresenceAggregator::new([], now()),
            gateway,
            Arc::new(SpyPublisher::default()),
        );
        let at = now();
        engine
            .handle(InboundEvent::Sun(SunPhaseEvent {
                phase: SunPhase::BelowHorizon,
                occurred_at: at,
                next_change_at: at + chrono::Duration::hours(1),
            }))
            .await;
        let evaluation = engine
            .handle(InboundEvent::Device(DevicePresenceEvent {
                device_id: DeviceId::from("device_1"),
                home_state: HomeState::Home,
                timestamp: at,
            }))
            .await
            .unwrap();
        assert!(evaluation.report.unwrap().is_noop());
        assert!(sink.commands.lock().unwrap().is_empty());
        assert_eq!(engine.trigger_state().last_action_kind, ActionKind::None);
    }

    #[tokio::test]
    async fn should_return_engine_when_queue_closes() {
        let h = Harness::new(TriggerSettings::default());
        let (handle, inbox) = event_queue::channel(16);
        let task = tokio::spawn(h.engine.run(inbox));

        let at = now();
        handle
            .sun_phase(SunPhase::BelowHorizon, at, at + chrono::Duration::hours(12))
            .await
            .unwrap();
        handle
            .device_presence(DeviceId::from("device_1"), HomeState::Home, at)
            .await
            .unwrap();
        drop(handle);

        let engine = task.await.unwrap();
        assert!(engine.presence().anyone_home());
        assert_eq!(engine.sun().phase(), SunPhase::BelowHorizon);
        assert!(
            engine
                .gateway()
                .targets()
                .all(|t| t.current_known_state == KnownState::On)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_forget_sun_phase_when_forecast_change_is_overdue() {
        let h = Harness::new(TriggerSettings {
            phase_grace: Duration::ZERO,
            ..TriggerSettings::default()
        });
        let (handle, inbox) = event_queue::channel(16);
        let task = tokio::spawn(h.engine.run(inbox));

        let at = now();
        handle
            .device_presence(DeviceId::from("device_1"), HomeState::Home, at)
            .await
            .unwrap();
        handle
            .sun_phase(SunPhase::BelowHorizon, at, at + chrono::Duration::seconds(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(handle);

        let engine = task.await.unwrap();
        assert_eq!(engine.sun().phase(), SunPhase::Unknown);
        let rules: Vec<_> = h.publisher.decisions.lock().unwrap().iter().map(|d| d.rule).collect();
        assert_eq!(rules, vec![Rule::DarkOccupied]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_sun_phase_reported_with_forecast_already_past() {
        let h = Harness::new(TriggerSettings {
            phase_grace: Duration::ZERO,
            ..TriggerSettings::default()
        });
        let (handle, inbox) = event_queue::channel(16);
        let task = tokio::spawn(h.engine.run(inbox));

        let at = now();
        handle
            .device_presence(DeviceId::from("device_1"), HomeState::Home, at)
            .await
            .unwrap();
        handle
            .sun_phase(
                SunPhase::BelowHorizon,
                at - chrono::Duration::hours(24),
                at - chrono::Duration::hours(12),
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(handle);

        let engine = task.await.unwrap();
        assert_eq!(engine.sun().phase(), SunPhase::BelowHorizon);
        assert!(engine.sun().expiry_deadline().is_some());
        assert!(
            engine
                .gateway()
                .targets()
                .all(|t| t.current_known_state == KnownState::On)
        );
        let rules: Vec<_> = h.publisher.decisions.lock().unwrap().iter().map(|d| d.rule).collect();
        assert_eq!(rules, vec![Rule::DarkOccupied]);
    }
}
