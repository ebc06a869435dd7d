//! Virtual light — obeys `on` / `off` commands and remembers the last one.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use dusklight_domain::error::ActuationError;
use dusklight_domain::id::LightId;
use dusklight_domain::light::{KnownState, LightCommand};

/// A simulated light.
///
/// Starts off and reachable. While unreachable every command fails and the
/// state is left untouched.
pub struct VirtualLight {
    id: LightId,
    state: Mutex<KnownState>,
    last_command: Mutex<Option<LightCommand>>,
    reachable: AtomicBool,
}

impl VirtualLight {
    #[must_use]
    pub fn new(id: LightId) -> Self {
        Self {
            id,
            state: Mutex::new(KnownState::Off),
            last_command: Mutex::new(None),
            reachable: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn id(&self) -> &LightId {
        &self.id
    }

    /// Apply a command, returning the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`ActuationError::Unreachable`] while the light is unreachable.
    pub fn apply(&self, command: &LightCommand) -> Result<KnownState, ActuationError> {
        if !self.is_reachable() {
            return Err(ActuationError::Unreachable {
                light_id: self.id.clone(),
            });
        }
        let new_state = KnownState::from(command.desired_state);
        *lock(&self.state) = new_state;
        *lock(&self.last_command) = Some(command.clone());
        Ok(new_state)
    }

    #[must_use]
    pub fn state(&self) -> KnownState {
        *lock(&self.state)
    }

    /// The last command this light accepted.
    #[must_use]
    pub fn last_command(&self) -> Option<LightCommand> {
        lock(&self.last_command).clone()
    }

    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
