//! Telemetry snapshot types shared by every stage of the decision pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReadingError;

/// Number of series cells in the battery pack.
pub const CELL_COUNT: usize = 16;

/// A timestamped snapshot of every subsystem on the site.
///
/// Field names are snake_case on the wire. The camelCase group and field
/// names used by the legacy cloud feed are accepted as aliases so that feed
/// payloads can be ingested unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Solar and wind generation.
    pub renewables: Renewables,
    /// Battery management system readings.
    #[serde(alias = "batteries")]
    pub battery: BatteryReading,
    /// EV charging subsystem.
    #[serde(alias = "evSubsystems")]
    pub ev: EvReading,
    /// Grid connection.
    pub grid: GridReading,
    /// Fire and air-quality sensors.
    #[serde(alias = "fireDetection")]
    pub fire: FireReading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renewables {
    pub solar: SolarReading,
    pub wind: WindReading,
}

/// Solar array output (kW), DC bus voltage (V) and current (A).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarReading {
    pub output: f64,
    pub voltage: f64,
    pub current: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindReading {
    pub output: f64,
    pub wind_speed: f64,
}

/// Battery pack readings. SOC and SOH are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    pub state_of_charge: f64,
    pub state_of_health: f64,
    pub voltage: f64,
    /// Pack temperature (°C).
    pub temperature: f64,
    pub cycle_count: u32,
    /// Per-cell voltages (V), in pack order.
    pub cell_voltages: [f64; CELL_COUNT],
}

impl BatteryReading {
    /// Spread between the highest and lowest cell voltage (V).
    pub fn cell_voltage_spread(&self) -> f64 {
        let max = self
            .cell_voltages
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let min = self
            .cell_voltages
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        max - min
    }
}

/// EV charging subsystem readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvReading {
    pub active_sessions: u32,
    pub available_stations: u32,
    pub total_stations: u32,
    /// Current charging power draw (kW).
    pub power_usage: f64,
    /// Cumulative energy delivered (kWh).
    pub total_energy_delivered: f64,
}

impl EvReading {
    /// Builds a consistent station count: `available = total - active`.
    pub fn with_sessions(active_sessions: u32, total_stations: u32) -> Self {
        let active_sessions = active_sessions.min(total_stations);
        Self {
            active_sessions,
            available_stations: total_stations - active_sessions,
            total_stations,
            power_usage: 0.0,
            total_energy_delivered: 0.0,
        }
    }
}

/// Grid connection: load (kW), frequency (Hz), voltage (V).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridReading {
    pub load: f64,
    pub frequency: f64,
    pub voltage: f64,
}

/// Fire detection sensors. Smoke level and air quality are percentages,
/// CO level is in ppm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireReading {
    pub temperature: f64,
    #[serde(alias = "coLevel")]
    pub co_level: f64,
    #[serde(alias = "airQuality")]
    pub air_quality: f64,
    #[serde(alias = "smokeLevel")]
    pub smoke_level: f64,
}

impl Reading {
    /// Parses and validates a reading supplied by an external feed.
    ///
    /// # Errors
    ///
    /// Returns [`ReadingError::Malformed`] when a required field is missing or
    /// has the wrong type, and the errors of [`Reading::validate`] otherwise.
    pub fn from_json(raw: &str) -> Result<Self, ReadingError> {
        let reading: Reading = serde_json::from_str(raw)?;
        reading.validate()?;
        Ok(reading)
    }

    /// Checks the invariants the rest of the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ReadingError::NonFinite`] for NaN or infinite values and
    /// [`ReadingError::StationMismatch`] when EV station counts do not add up.
    pub fn validate(&self) -> Result<(), ReadingError> {
        let fields = [
            ("renewables.solar.output", self.renewables.solar.output),
            ("renewables.solar.voltage", self.renewables.solar.voltage),
            ("renewables.solar.current", self.renewables.solar.current),
            ("renewables.wind.output", self.renewables.wind.output),
            ("renewables.wind.wind_speed", self.renewables.wind.wind_speed),
            ("battery.state_of_charge", self.battery.state_of_charge),
            ("battery.state_of_health", self.battery.state_of_health),
            ("battery.voltage", self.battery.voltage),
            ("battery.temperature", self.battery.temperature),
            ("ev.power_usage", self.ev.power_usage),
            ("ev.total_energy_delivered", self.ev.total_energy_delivered),
            ("grid.load", self.grid.load),
            ("grid.frequency", self.grid.frequency),
            ("grid.voltage", self.grid.voltage),
            ("fire.temperature", self.fire.temperature),
            ("fire.co_level", self.fire.co_level),
            ("fire.air_quality", self.fire.air_quality),
            ("fire.smoke_level", self.fire.smoke_level),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ReadingError::NonFinite {
                    field: field.to_string(),
                });
            }
        }
        for (i, v) in self.battery.cell_voltages.iter().enumerate() {
            if !v.is_finite() {
                return Err(ReadingError::NonFinite {
                    field: format!("battery.cell_voltages[{i}]"),
                });
            }
        }

        let ev = &self.ev;
        if ev.active_sessions.checked_add(ev.available_stations) != Some(ev.total_stations) {
            return Err(ReadingError::StationMismatch {
                active: ev.active_sessions,
                available: ev.available_stations,
                total: ev.total_stations,
            });
        }
        Ok(())
    }
}
