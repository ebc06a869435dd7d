//! Light command port — how a command reaches a light.

use std::future::Future;

use dusklight_domain::error::ActuationError;
use dusklight_domain::light::LightCommand;

/// Delivers a single [`LightCommand`] to the actuation collaborator.
///
/// Implementations own transport concerns (protocol, retries). The
/// gateway bounds every call with a timeout and never retries itself.
pub trait LightCommandSink {
    /// Send one command. Resolves once the collaborator accepted or refused it.
    fn send(&self, command: LightCommand)
    -> impl Future<Output = Result<(), ActuationError>> + Send;
}

impl<T: LightCommandSink + Send + Sync> LightCommandSink for std::sync::Arc<T> {
    fn send(
        &self,
        command: LightCommand,
    ) -> impl Future<Output = Result<(), ActuationError>> + Send {
        (**self).send(command)
    }
}
