//! Engine limits and per-machine timing, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid. Times
//! are in milliseconds.
//!
//! ```toml
//! [engine]
//! max_microsteps = 32
//!
//! [switch]
//! turn_timeout_ms = 2500
//!
//! [config]
//! max_retries = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid settings: {0}")]
    Validation(String),
}

/// Limits of the RTC interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Microsteps per dispatched event before a livelock is reported.
    pub max_microsteps: usize,
    /// Slot changes kept in each machine's history; 0 disables it.
    pub history_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_microsteps: 64,
            history_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSettings {
    pub init_delay_ms: u64,
    pub flash_delay_ms: u64,
    pub boot_timeout_ms: u64,
    pub max_retries: u32,
}

impl Default for ConfigSettings {
    fn default() -> Self {
        Self {
            init_delay_ms: 100,
            flash_delay_ms: 2000,
            boot_timeout_ms: 5000,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingModeSettings {
    pub init_timeout_ms: u64,
    /// Idle time before the display is blanked.
    pub blank_timeout_ms: u64,
}

impl Default for OperatingModeSettings {
    fn default() -> Self {
        Self {
            init_timeout_ms: 10_000,
            blank_timeout_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    pub turn_timeout_ms: u64,
    pub disable_timeout_ms: u64,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            turn_timeout_ms: 5000,
            disable_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSettings {
    pub init_timeout_ms: u64,
}

impl Default for SectionSettings {
    fn default() -> Self {
        Self {
            init_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalControllerSettings {
    pub init_timeout_ms: u64,
    pub turn_timeout_ms: u64,
}

impl Default for SignalControllerSettings {
    fn default() -> Self {
        Self {
            init_timeout_ms: 5000,
            turn_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    pub init_timeout_ms: u64,
    pub turn_timeout_ms: u64,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            init_timeout_ms: 5000,
            turn_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchSettings {
    pub init_timeout_ms: u64,
    pub turn_timeout_ms: u64,
}

impl Default for SwitchSettings {
    fn default() -> Self {
        Self {
            init_timeout_ms: 5000,
            turn_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Time a simulated train needs to advance by one section.
    pub step_ms: u64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self { step_ms: 1000 }
    }
}

/// Complete settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub config: ConfigSettings,
    pub operating_mode: OperatingModeSettings,
    pub route: RouteSettings,
    pub section: SectionSettings,
    pub signal_controller: SignalControllerSettings,
    pub signal: SignalSettings,
    pub switch: SwitchSettings,
    pub tracker: TrackerSettings,
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject values the engine cannot run with. Every delay must be positive.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.engine.max_microsteps == 0 {
            return Err(SettingsError::Validation(
                "engine.max_microsteps must be at least 1".to_string(),
            ));
        }

        let timeouts = [
            ("config.init_delay_ms", self.config.init_delay_ms),
            ("config.flash_delay_ms", self.config.flash_delay_ms),
            ("config.boot_timeout_ms", self.config.boot_timeout_ms),
            ("operating_mode.init_timeout_ms", self.operating_mode.init_timeout_ms),
            ("operating_mode.blank_timeout_ms", self.operating_mode.blank_timeout_ms),
            ("route.turn_timeout_ms", self.route.turn_timeout_ms),
            ("route.disable_timeout_ms", self.route.disable_timeout_ms),
            ("section.init_timeout_ms", self.section.init_timeout_ms),
            ("signal_controller.init_timeout_ms", self.signal_controller.init_timeout_ms),
            ("signal_controller.turn_timeout_ms", self.signal_controller.turn_timeout_ms),
            ("signal.init_timeout_ms", self.signal.init_timeout_ms),
            ("signal.turn_timeout_ms", self.signal.turn_timeout_ms),
            ("switch.init_timeout_ms", self.switch.init_timeout_ms),
            ("switch.turn_timeout_ms", self.switch.turn_timeout_ms),
            ("tracker.step_ms", self.tracker.step_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, value)| *value == 0) {
            return Err(SettingsError::Validation(format!("{name} must be positive")));
        }
        Ok(())
    }
}

pub(crate) fn millis(value: u64) -> Duration {
    Duration::from_millis(value)
}
