//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`DusklightError`] via `#[from]` when crossing a port boundary.

use std::time::Duration;

use crate::id::LightId;

/// Top-level error for the dusklight core.
#[derive(Debug, thiserror::Error)]
pub enum DusklightError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A light command could not be carried out.
    #[error("actuation error")]
    Actuation(#[from] ActuationError),

    /// The engine's event queue has shut down.
    #[error("event queue closed")]
    QueueClosed,

    /// An integration-specific failure, boxed to keep adapters decoupled.
    #[error("integration error")]
    Integration(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Violations of domain invariants.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier was empty or whitespace only.
    #[error("{kind} id must not be empty")]
    EmptyId { kind: &'static str },

    /// The same light was listed more than once.
    #[error("light {0} is listed more than once")]
    DuplicateLight(LightId),
}

/// Failure of a single light command.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ActuationError {
    /// The light (or its controller) refused the command.
    #[error("light {light_id} rejected the command: {reason}")]
    Rejected { light_id: LightId, reason: String },

    /// The light could not be reached.
    #[error("light {light_id} is unreachable")]
    Unreachable { light_id: LightId },

    /// The command did not complete within the configured bound.
    #[error("light {light_id} did not answer within {after:?}")]
    TimedOut { light_id: LightId, after: Duration },
}

impl ActuationError {
    /// The light this failure is about.
    #[must_use]
    pub fn light_id(&self) -> &LightId {
        match self {
            Self::Rejected { light_id, .. }
            | Self::Unreachable { light_id }
            | Self::TimedOut { light_id, .. } => light_id,
        }
    }
}
