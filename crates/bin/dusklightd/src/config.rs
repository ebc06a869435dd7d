//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `dusklight.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use dusklight_app::trigger_engine::TriggerSettings;
use dusklight_domain::error::ValidationError;
use dusklight_domain::id::{DeviceId, LightId};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trigger engine tunables.
    pub engine: EngineConfig,
    /// Ids of the lights the engine manages.
    pub lights: Vec<String>,
    /// Known presence-tracked devices.
    pub devices: Vec<DeviceConfig>,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Trigger engine configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pending events the queue holds before producers wait.
    pub queue_capacity: usize,
    /// Per-light command timeout, in milliseconds.
    pub actuation_timeout_ms: u64,
    /// How long past the forecast change a sun phase is still trusted.
    pub phase_grace_secs: u64,
    /// Fade for lights turned on by sunset. `0` disables it.
    pub sunset_transition_secs: u64,
    /// Light profile attached to every "on" command.
    pub light_profile: Option<String>,
    /// Keep lights on when everyone leaves.
    pub disable_turn_off: bool,
}

/// A presence-tracked device with a display name.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `dusklight.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("dusklight.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DUSKLIGHT_LIGHTS") {
            self.lights = split_list(&val);
        }
        if let Ok(val) = std::env::var("DUSKLIGHT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "queue_capacity must be non-zero".to_string(),
            ));
        }
        if self.engine.actuation_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "actuation_timeout_ms must be non-zero".to_string(),
            ));
        }
        self.light_ids()?;
        self.known_devices()?;
        Ok(())
    }

    /// Managed light ids, in configuration order.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty or duplicated id.
    pub fn light_ids(&self) -> Result<Vec<LightId>, ValidationError> {
        let mut seen = HashSet::new();
        self.lights
            .iter()
            .map(|raw| {
                let id = LightId::parse(raw.trim())?;
                if !seen.insert(id.clone()) {
                    return Err(ValidationError::DuplicateLight(id));
                }
                Ok(id)
            })
            .collect()
    }

    /// Known devices with their display names.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty device id.
    pub fn known_devices(&self) -> Result<Vec<(DeviceId, String)>, ValidationError> {
        self.devices
            .iter()
            .map(|device| Ok((DeviceId::parse(device.id.trim())?, device.name.clone())))
            .collect()
    }

    #[must_use]
    pub fn actuation_timeout(&self) -> Duration {
        Duration::from_millis(self.engine.actuation_timeout_ms)
    }

    #[must_use]
    pub fn trigger_settings(&self) -> TriggerSettings {
        TriggerSettings {
            sunset_transition: (self.engine.sunset_transition_secs > 0)
                .then(|| Duration::from_secs(self.engine.sunset_transition_secs)),
            light_profile: self
                .engine
                .light_profile
                .clone()
                .filter(|profile| !profile.is_empty()),
            disable_turn_off: self.engine.disable_turn_off,
            phase_grace: Duration::from_secs(self.engine.phase_grace_secs),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            actuation_timeout_ms: 10_000,
            phase_grace_secs: 120,
            sunset_transition_secs: 0,
            light_profile: None,
            disable_turn_off: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "dusklightd=info,dusklight_app=info,dusklight_adapter_virtual=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
