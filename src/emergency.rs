//! Emergency mode state machine and the fixed site states it switches between.
//!
//! Triggering an emergency overwrites the site with the crisis constants and
//! raises four critical alerts. Clearing restores the nominal baseline. Both
//! transitions are external; nothing in the pipeline enters or leaves
//! emergency mode on its own.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::alerts::AlertCode;
use crate::diagnostics::{HealthLevel, HealthVerdict};
use crate::error::CoreError;
use crate::policy::PolicyState;
use crate::telemetry::{
    BatteryReading, CELL_COUNT, EvReading, FireReading, GridReading, Reading, Renewables,
    SolarReading, WindReading,
};

/// Alerts raised unconditionally when an emergency is triggered.
pub const EMERGENCY_ALERTS: [AlertCode; 4] = [
    AlertCode::FireEmergencyActivated,
    AlertCode::BatteryCriticalEmergency,
    AlertCode::GridDisconnectEmergency,
    AlertCode::EvChargingEmergencyStop,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyMode {
    #[default]
    Normal,
    Emergency,
}

impl EmergencyMode {
    pub fn is_emergency(self) -> bool {
        self == EmergencyMode::Emergency
    }
}

impl fmt::Display for EmergencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EmergencyMode::Normal => "normal",
            EmergencyMode::Emergency => "emergency",
        })
    }
}

/// Two-state controller. Only [`trigger`](Self::trigger) and
/// [`clear`](Self::clear) change the mode.
#[derive(Debug, Default, Clone)]
pub struct EmergencyController {
    mode: EmergencyMode,
}

impl EmergencyController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> EmergencyMode {
        self.mode
    }

    /// Enters emergency mode.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyInEmergency`] if the mode is already
    /// `Emergency`; the mode is left unchanged.
    pub fn trigger(&mut self) -> Result<(), CoreError> {
        if self.mode.is_emergency() {
            return Err(CoreError::AlreadyInEmergency);
        }
        self.mode = EmergencyMode::Emergency;
        warn!("emergency mode activated");
        Ok(())
    }

    /// Returns to normal mode.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInEmergency`] if the mode is `Normal`.
    pub fn clear(&mut self) -> Result<(), CoreError> {
        if !self.mode.is_emergency() {
            return Err(CoreError::NotInEmergency);
        }
        self.mode = EmergencyMode::Normal;
        info!("emergency cleared");
        Ok(())
    }
}

/// Dashboard health gauges, 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthIndices {
    pub renewable: f64,
    pub bms: f64,
    pub ev: f64,
    pub safety: f64,
}

impl HealthIndices {
    pub const NOMINAL: Self = Self {
        renewable: 94.0,
        bms: 92.0,
        ev: 91.0,
        safety: 96.0,
    };

    pub const CRISIS: Self = Self {
        renewable: 60.0,
        bms: 45.0,
        ev: 20.0,
        safety: 15.0,
    };

    /// Updates the renewable and BMS gauges from the latest verdicts.
    ///
    /// The BMS gauge maps critical to 35, warning to 65 and anything else
    /// back to the nominal 92. The renewable gauge tracks solar output,
    /// capped at 100, and drops to 70 on a renewable warning.
    pub fn refresh(&mut self, solar_output: f64, battery: &HealthVerdict, renewable: &HealthVerdict) {
        self.bms = match battery.health {
            HealthLevel::Critical => 35.0,
            HealthLevel::Warning => 65.0,
            _ => Self::NOMINAL.bms,
        };
        self.renewable = if renewable.health == HealthLevel::Warning {
            70.0
        } else {
            solar_output.clamp(0.0, 100.0)
        };
    }
}

impl Default for HealthIndices {
    fn default() -> Self {
        Self::NOMINAL
    }
}

/// Savings and environmental KPIs shown on the dashboard.
///
/// These are fixed figures; they only change on emergency transitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteEconomics {
    /// Daily EV optimization savings ($).
    pub cost_savings: f64,
    /// Vehicle-to-grid revenue ($).
    pub v2g_revenue: f64,
    /// Share of EV energy from renewables (%).
    pub renewable_usage: f64,
    pub energy_savings: f64,
    pub cost_reduction: f64,
    pub co2_reduction: f64,
    /// Total environmental savings ($).
    pub total_savings: f64,
    /// Carbon saved (kg).
    pub carbon_saved: f64,
    /// Usage patterns found so far. Unchanged by emergencies.
    pub patterns_identified: u32,
}

impl SiteEconomics {
    pub const NOMINAL: Self = Self {
        cost_savings: 24.50,
        v2g_revenue: 8.20,
        renewable_usage: 85.0,
        energy_savings: 24.7,
        cost_reduction: 31.2,
        co2_reduction: 18.3,
        total_savings: 45.80,
        carbon_saved: 128.0,
        patterns_identified: 12,
    };

    pub const CRISIS: Self = Self {
        cost_savings: 0.0,
        v2g_revenue: 0.0,
        renewable_usage: 25.0,
        energy_savings: 5.2,
        cost_reduction: 8.7,
        co2_reduction: 12.1,
        total_savings: 12.30,
        carbon_saved: 45.0,
        patterns_identified: 12,
    };
}

impl Default for SiteEconomics {
    fn default() -> Self {
        Self::NOMINAL
    }
}

/// Everything an emergency transition overwrites.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteState {
    pub reading: Reading,
    pub indices: HealthIndices,
    pub economics: SiteEconomics,
    pub policy: PolicyState,
}

impl SiteState {
    /// Initial state, and the state restored by clearing an emergency.
    pub fn nominal(total_stations: u32, cycle_count: u32) -> Self {
        Self {
            reading: nominal_reading(total_stations, cycle_count),
            indices: HealthIndices::NOMINAL,
            economics: SiteEconomics::NOMINAL,
            policy: PolicyState {
                battery_soc: 85.0,
                demand: 45.0,
                solar_output: 65.0,
                electricity_price: 0.18,
                grid_stability: 92.0,
            },
        }
    }

    pub fn crisis(total_stations: u32, cycle_count: u32) -> Self {
        Self {
            reading: crisis_reading(total_stations, cycle_count),
            indices: HealthIndices::CRISIS,
            economics: SiteEconomics::CRISIS,
            policy: PolicyState {
                battery_soc: 18.0,
                demand: 85.0,
                solar_output: 15.0,
                electricity_price: 0.45,
                grid_stability: 35.0,
            },
        }
    }
}

/// The nominal reading: every analyzed subsystem healthy, no alert rule
/// firing.
///
/// Three stations are busy when the site has at least three.
pub fn nominal_reading(total_stations: u32, cycle_count: u32) -> Reading {
    let mut ev = EvReading::with_sessions(3, total_stations);
    ev.power_usage = 45.0;
    ev.total_energy_delivered = 1245.8;

    Reading {
        timestamp: Utc::now(),
        renewables: Renewables {
            solar: SolarReading {
                output: 65.0,
                voltage: 240.0,
                current: 13.5,
            },
            wind: WindReading {
                output: 32.5,
                wind_speed: 8.5,
            },
        },
        battery: BatteryReading {
            state_of_charge: 85.0,
            state_of_health: 92.0,
            voltage: 48.95,
            temperature: 25.5,
            cycle_count,
            cell_voltages: [3.65; CELL_COUNT],
        },
        ev,
        grid: GridReading {
            load: 45.0,
            frequency: 59.98,
            voltage: 120.2,
        },
        fire: FireReading {
            temperature: 23.5,
            co_level: 3.0,
            air_quality: 92.0,
            smoke_level: 0.2,
        },
    }
}

/// The crisis reading shown while emergency mode is active.
///
/// Cells 0..4 sag to 2.9 V, cells 13..16 overshoot to 4.25 V and the rest
/// sit at 3.5 V. All EV charging is stopped.
pub fn crisis_reading(total_stations: u32, cycle_count: u32) -> Reading {
    let mut reading = nominal_reading(total_stations, cycle_count);

    reading.renewables.solar.output = 15.0;
    reading.battery.state_of_charge = 18.0;
    reading.battery.state_of_health = 75.0;
    reading.battery.temperature = 42.5;
    reading.battery.cell_voltages = std::array::from_fn(|i| match i {
        0..4 => 2.9,
        13.. => 4.25,
        _ => 3.5,
    });
    reading.ev = EvReading::with_sessions(0, total_stations);
    reading.grid.load = 85.0;
    reading.fire = FireReading {
        temperature: 67.8,
        co_level: 156.0,
        air_quality: 18.0,
        smoke_level: 23.5,
    };
    reading
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{self, SubsystemKind};

    #[test]
    fn controller_transitions() {
        let mut c = EmergencyController::new();
        assert_eq!(c.mode(), EmergencyMode::Normal);
        assert!(matches!(c.clear(), Err(CoreError::NotInEmergency)));

        c.trigger().expect("normal -> emergency");
        assert_eq!(c.mode(), EmergencyMode::Emergency);
        assert!(matches!(c.trigger(), Err(CoreError::AlreadyInEmergency)));
        assert_eq!(c.mode(), EmergencyMode::Emergency);

        c.clear().expect("emergency -> normal");
        assert_eq!(c.mode(), EmergencyMode::Normal);
    }

    #[test]
    fn nominal_reading_is_valid_and_quiet() {
        let r = nominal_reading(8, 1245);
        r.validate().expect("nominal reading validates");
        assert_eq!(r.ev.active_sessions, 3);
        assert_eq!(r.ev.available_stations, 5);
        assert_eq!(r.battery.cell_voltage_spread(), 0.0);
    }

    #[test]
    fn nominal_reading_on_small_site_clamps_sessions() {
        let r = nominal_reading(2, 1245);
        assert_eq!(r.ev.active_sessions, 2);
        assert_eq!(r.ev.available_stations, 0);
        r.validate().expect("clamped reading validates");
    }

    #[test]
    fn crisis_cell_layout() {
        let cells = crisis_reading(8, 1245).battery.cell_voltages;
        assert!(cells[..4].iter().all(|v| *v == 2.9));
        assert!(cells[4..13].iter().all(|v| *v == 3.5));
        assert!(cells[13..].iter().all(|v| *v == 4.25));
    }

    #[test]
    fn crisis_reading_stops_charging() {
        let r = crisis_reading(8, 1245);
        r.validate().expect("crisis reading validates");
        assert_eq!(r.ev.active_sessions, 0);
        assert_eq!(r.ev.available_stations, 8);
        assert_eq!(r.ev.power_usage, 0.0);
    }

    #[test]
    fn crisis_reading_is_critical_in_diagnostics() {
        let r = crisis_reading(8, 1245);
        let battery = diagnostics::evaluate(SubsystemKind::Battery, &r);
        assert_eq!(battery.health, HealthLevel::Critical);
        let safety = diagnostics::evaluate(SubsystemKind::Safety, &r);
        assert_eq!(safety.health, HealthLevel::Critical);
    }

    #[test]
    fn site_states_carry_policy_constants() {
        let crisis = SiteState::crisis(8, 1245);
        assert_eq!(crisis.policy.electricity_price, 0.45);
        assert_eq!(crisis.indices, HealthIndices::CRISIS);
        let nominal = SiteState::nominal(8, 1245);
        assert_eq!(nominal.policy.grid_stability, 92.0);
        assert_eq!(nominal.economics, SiteEconomics::NOMINAL);
    }

    #[test]
    fn refresh_maps_battery_levels() {
        let renewable = HealthVerdict::new(SubsystemKind::Renewable, HealthLevel::Healthy);
        let mut indices = HealthIndices::NOMINAL;

        let critical = HealthVerdict::new(SubsystemKind::Battery, HealthLevel::Critical);
        indices.refresh(72.0, &critical, &renewable);
        assert_eq!(indices.bms, 35.0);
        assert_eq!(indices.renewable, 72.0);

        let warning = HealthVerdict::new(SubsystemKind::Battery, HealthLevel::Warning);
        indices.refresh(72.0, &warning, &renewable);
        assert_eq!(indices.bms, 65.0);

        let info = HealthVerdict::new(SubsystemKind::Battery, HealthLevel::Info);
        indices.refresh(140.0, &info, &renewable);
        assert_eq!(indices.bms, 92.0);
        assert_eq!(indices.renewable, 100.0);
    }

    #[test]
    fn refresh_renewable_warning_pins_gauge() {
        let battery = HealthVerdict::new(SubsystemKind::Battery, HealthLevel::Healthy);
        let renewable = HealthVerdict::new(SubsystemKind::Renewable, HealthLevel::Warning);
        let mut indices = HealthIndices::NOMINAL;
        indices.refresh(40.0, &battery, &renewable);
        assert_eq!(indices.renewable, 70.0);
        assert_eq!(indices.safety, 96.0);
    }
}
