//! # dusklight-adapter-virtual
//!
//! Virtual/demo light integration that provides simulated lights for testing
//! and demonstration purposes.
//!
//! Each configured light id gets a [`VirtualLight`] that starts off and
//! obeys `on` / `off` commands. Lights can be made unreachable to exercise the
//! gateway's failure handling, and an optional latency can be injected to
//! exercise its timeout.
//!
//! ## Dependency rule
//!
//! Depends on `dusklight-app` (port traits) and `dusklight-domain` only.

mod light;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dusklight_app::ports::LightCommandSink;
use dusklight_domain::error::ActuationError;
use dusklight_domain::id::LightId;
use dusklight_domain::light::{KnownState, LightCommand};

pub use light::VirtualLight;

/// Light command sink backed by in-memory virtual lights.
pub struct VirtualLightSink {
    lights: BTreeMap<LightId, Arc<VirtualLight>>,
    latency: Option<Duration>,
}

impl VirtualLightSink {
    /// Create one virtual light per id.
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = LightId>) -> Self {
        let lights = ids
            .into_iter()
            .map(|id| (id.clone(), Arc::new(VirtualLight::new(id))))
            .collect();
        Self {
            lights,
            latency: None,
        }
    }

    /// Delay every command by `latency` before applying it.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    #[must_use]
    pub fn light(&self, id: &LightId) -> Option<&VirtualLight> {
        self.lights.get(id).map(|light| &**light)
    }

    /// Current state of every virtual light, sorted by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(LightId, KnownState)> {
        self.lights
            .iter()
            .map(|(id, light)| (id.clone(), light.state()))
            .collect()
    }
}

impl LightCommandSink for VirtualLightSink {
    fn send(
        &self,
        command: LightCommand,
    ) -> impl Future<Output = Result<(), ActuationError>> + Send {
        let light = self.lights.get(&command.light_id).cloned();
        let latency = self.latency;
        async move {
            let Some(light) = light else {
                return Err(ActuationError::Rejected {
                    light_id: command.light_id,
                    reason: "no such virtual light".to_string(),
                });
            };
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            let state = light.apply(&command)?;
            tracing::debug!(light_id = %command.light_id, %state, "virtual light updated");
            Ok(())
        }
    }
}
