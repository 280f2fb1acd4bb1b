//! TOML-based site configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::core::{CoreSettings, FaultInjection};
use crate::policy::Objective;

/// Top-level configuration parsed from TOML.
///
/// All fields have defaults matching the baseline preset. Load from TOML
/// with [`EmsConfig::from_toml_file`] or use [`EmsConfig::baseline`] for the
/// built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmsConfig {
    /// Run length, timing and seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Fixed site parameters.
    #[serde(default)]
    pub site: SiteConfig,
    /// Recommender settings.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Default battery fault for the inject-fault control.
    #[serde(default)]
    pub fault: FaultConfig,
    /// Log filter and output format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Master random seed.
    pub seed: u64,
    /// Number of ticks in a headless run (must be > 0).
    pub ticks: usize,
    /// Wall-clock tick period for the dashboard and API (ms, must be > 0).
    pub tick_interval_ms: u64,
    /// Whether generated ticks run from the start.
    pub streaming: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 20,
            tick_interval_ms: 3000,
            streaming: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// EV charging stations on site (must be > 0).
    pub total_stations: u32,
    /// Battery cycle count reported by the generator.
    pub cycle_count: u32,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            total_stations: 8,
            cycle_count: 1245,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// `"cost"`, `"emission"`, `"reliability"` or `"balanced"`.
    pub objective: Objective,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FaultConfig {
    /// Battery SOC forced by the fault (%).
    pub state_of_charge: f64,
    /// Battery temperature forced by the fault (°C).
    pub temperature: f64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        let fault = FaultInjection::default();
        Self {
            state_of_charge: fault.state_of_charge,
            temperature: fault.temperature,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive, used when no env override is set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"site.total_stations"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl EmsConfig {
    /// Returns the baseline site: 8 stations, a young battery, 20 ticks.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the aging-fleet preset: battery past 4000 cycles, so every
    /// reading carries the high-cycle diagnostic.
    pub fn aging_fleet() -> Self {
        Self {
            site: SiteConfig {
                cycle_count: 4200,
                ..SiteConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the large-site preset: 16 stations and a longer run.
    pub fn large_site() -> Self {
        Self {
            simulation: SimulationConfig {
                ticks: 40,
                ..SimulationConfig::default()
            },
            site: SiteConfig {
                total_stations: 16,
                ..SiteConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "aging_fleet", "large_site"];

    /// Loads a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "aging_fleet" => Ok(Self::aging_fleet()),
            "large_site" => Ok(Self::large_site()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.ticks == 0 {
            errors.push(ConfigError::new("simulation.ticks", "must be > 0"));
        }
        if s.tick_interval_ms == 0 {
            errors.push(ConfigError::new("simulation.tick_interval_ms", "must be > 0"));
        }
        if self.site.total_stations == 0 {
            errors.push(ConfigError::new("site.total_stations", "must be > 0"));
        }

        let f = &self.fault;
        if !(0.0..=100.0).contains(&f.state_of_charge) {
            errors.push(ConfigError::new("fault.state_of_charge", "must be in [0, 100]"));
        }
        if !f.temperature.is_finite() {
            errors.push(ConfigError::new("fault.temperature", "must be finite"));
        }

        if let Err(e) = EnvFilter::try_new(&self.logging.filter) {
            errors.push(ConfigError::new(
                "logging.filter",
                format!("invalid filter \"{}\": {e}", self.logging.filter),
            ));
        }

        errors
    }

    /// Core settings derived from this configuration.
    ///
    /// # Panics
    ///
    /// Panics if `site.total_stations` is zero; call [`validate`](Self::validate)
    /// first.
    pub fn core_settings(&self) -> CoreSettings {
        let mut settings = CoreSettings::new(
            self.site.total_stations,
            self.site.cycle_count,
            self.simulation.seed,
        );
        settings.objective = self.policy.objective;
        settings.streaming = self.simulation.streaming;
        settings.fault = FaultInjection {
            state_of_charge: self.fault.state_of_charge,
            temperature: self.fault.temperature,
        };
        settings
    }
}
