//! Trigger — the presence/sun decision rules.
//!
//! The decision is a pure function of the presence aggregate and the sun
//! phase. Which signal changed only matters for labelling the resulting
//! action (sunset vs. arrival), never for whether the lights go on or off.

use serde::{Deserialize, Serialize};

use crate::light::LightState;
use crate::sun::SunPhase;
use crate::time::Timestamp;

/// The rule that produced a desired light state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Nobody is home: lights off, whatever the sun does.
    Departure,
    /// Somebody is home and the sun is below the horizon: lights on.
    DarkOccupied,
}

impl Rule {
    #[must_use]
    pub fn desired_state(self) -> LightState {
        match self {
            Self::Departure => LightState::Off,
            Self::DarkOccupied => LightState::On,
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Departure => f.write_str("departure"),
            Self::DarkOccupied => f.write_str("dark_occupied"),
        }
    }
}

/// Evaluate the rules in precedence order.
///
/// Returns `None` for daytime occupancy and for occupancy under an unknown
/// sun phase.
#[must_use]
pub fn decide(anyone_home: bool, phase: SunPhase) -> Option<Rule> {
    if !anyone_home {
        return Some(Rule::Departure);
    }
    if phase.is_dark() {
        return Some(Rule::DarkOccupied);
    }
    None
}

/// Which input caused an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Presence,
    Sun,
}

/// The kind of actuation the engine last carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    #[default]
    None,
    TurnOnOnSunset,
    TurnOnOnArrival,
    TurnOffOnDeparture,
}

impl ActionKind {
    /// Label an actuation by its rule and the edge that fired it.
    #[must_use]
    pub fn classify(rule: Rule, edge: Edge) -> Self {
        match (rule, edge) {
            (Rule::Departure, _) => Self::TurnOffOnDeparture,
            (Rule::DarkOccupied, Edge::Sun) => Self::TurnOnOnSunset,
            (Rule::DarkOccupied, Edge::Presence) => Self::TurnOnOnArrival,
        }
    }
}

/// Record of the last actuation. Observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerState {
    pub last_action_kind: ActionKind,
    pub last_action_at: Option<Timestamp>,
}

impl TriggerState {
    pub fn record(&mut self, kind: ActionKind, at: Timestamp) {
        self.last_action_kind = kind;
        self.last_action_at = Some(at);
    }
}

/// What became of a fired rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// Every light was already known to be in the desired state.
    AlreadySatisfied,
    /// A batch went out.
    Actuated { issued: usize, failed: usize },
    /// The batch was withheld by configuration.
    Suppressed,
}

impl DecisionOutcome {
    /// Whether any light command was sent.
    #[must_use]
    pub fn sent_commands(self) -> bool {
        matches!(self, Self::Actuated { issued, failed } if issued + failed > 0)
    }
}

/// Telemetry emitted for every rule that fired, once its batch has settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDecision {
    pub rule: Rule,
    pub edge: Edge,
    pub desired_state: LightState,
    pub timestamp: Timestamp,
    pub outcome: DecisionOutcome,
}

impl TriggerDecision {
    #[must_use]
    pub fn new(rule: Rule, edge: Edge, timestamp: Timestamp, outcome: DecisionOutcome) -> Self {
        Self {
            rule,
            edge,
            desired_state: rule.desired_state(),
            timestamp,
            outcome,
        }
    }
}
