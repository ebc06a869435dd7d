//! Presence aggregator — per-device presence and the "anyone home" flag.

use std::collections::{BTreeMap, HashMap};

use dusklight_domain::event::PresenceChanged;
use dusklight_domain::id::DeviceId;
use dusklight_domain::presence::{HomeState, PresenceAggregate, TrackedDevice};
use dusklight_domain::time::Timestamp;

/// Tracks every device ever reported and the OR-reduction over them.
pub struct PresenceAggregator {
    devices: BTreeMap<DeviceId, TrackedDevice>,
    known_names: HashMap<DeviceId, String>,
    aggregate: PresenceAggregate,
}

impl PresenceAggregator {
    /// Create an aggregator with nobody home as of `started_at`.
    ///
    /// `known_names` supplies display names for devices listed in
    /// configuration; any other device is named after its id.
    pub fn new(
        known_names: impl IntoIterator<Item = (DeviceId, String)>,
        started_at: Timestamp,
    ) -> Self {
        Self {
            devices: BTreeMap::new(),
            known_names: known_names.into_iter().collect(),
            aggregate: PresenceAggregate::empty(started_at),
        }
    }

    /// Apply a presence report.
    ///
    /// Returns a [`PresenceChanged`] only when the aggregate flips; individual
    /// device changes that leave the OR-reduction untouched are silent.
    pub fn on_device_event(
        &mut self,
        device_id: DeviceId,
        state: HomeState,
        at: Timestamp,
    ) -> Option<PresenceChanged> {
        if state == HomeState::Unknown {
            tracing::warn!(device = %device_id, "unrecognised presence state, excluding device from aggregate");
        }

        let device = self.devices.entry(device_id).or_insert_with_key(|id| {
            let name = self
                .known_names
                .get(id)
                .cloned()
                .unwrap_or_else(|| id.to_string());
            tracing::debug!(device = %id, name = %name, "tracking new device");
            TrackedDevice::new(id.clone(), name, at)
        });

        if !device.update(state, at) {
            return None;
        }
        tracing::debug!(device = %device.id, state = %state, "device presence changed");

        let anyone_home = PresenceAggregate::reduce(self.devices.values());
        if anyone_home == self.aggregate.anyone_home {
            return None;
        }

        self.aggregate = PresenceAggregate {
            anyone_home,
            last_transition: at,
        };
        tracing::info!(anyone_home, "presence aggregate flipped");
        Some(PresenceChanged {
            anyone_home,
            timestamp: at,
        })
    }

    #[must_use]
    pub fn anyone_home(&self) -> bool {
        self.aggregate.anyone_home
    }

    #[must_use]
    pub fn aggregate(&self) -> PresenceAggregate {
        self.aggregate
    }

    #[must_use]
    pub fn device(&self, id: &DeviceId) -> Option<&TrackedDevice> {
        self.devices.get(id)
    }

    /// All tracked devices, ordered by id.
    pub fn devices(&self) -> impl Iterator<Item = &TrackedDevice> {
        self.devices.values()
    }
}
