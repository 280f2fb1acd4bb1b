use serde::{Deserialize, Serialize};

use super::{HealthLevel, HealthVerdict, SubsystemKind};
use crate::telemetry::{BatteryReading, CELL_COUNT};

pub const ISSUE_LOW_SOC: &str = "Critical: SOC too low (<20%)";
pub const ISSUE_HIGH_TEMPERATURE: &str = "Warning: High temperature (>35°C)";
pub const ISSUE_END_OF_LIFE: &str = "Maintenance: Battery nearing end of life (SOH <80%)";
pub const ISSUE_HIGH_CYCLES: &str = "Info: High cycle count detected";
pub const ISSUE_CELL_DEVIATION: &str = "Warning: High cell voltage deviation";

/// Action used for any issue missing from the action table.
pub const FALLBACK_ACTION: &str = "Monitor system parameters";

/// Rated cycle life of the pack.
pub const RATED_CYCLES: u32 = 5000;

const SOC_CRITICAL_PCT: f64 = 20.0;
const TEMPERATURE_WARN_C: f64 = 35.0;
const SOH_WARN_PCT: f64 = 80.0;
const CYCLE_INFO: u32 = 4000;
const CELL_SPREAD_WARN_V: f64 = 0.2;

/// Recommended actions for a battery issue string.
///
/// Unknown issues map to [`FALLBACK_ACTION`].
pub fn actions_for_issue(issue: &str) -> &'static [&'static str] {
    match issue {
        ISSUE_LOW_SOC => &[
            "Connect to grid immediately",
            "Reduce load on battery",
            "Emergency charging",
        ],
        ISSUE_HIGH_TEMPERATURE => &[
            "Reduce charging rate",
            "Check cooling system",
            "Improve ventilation",
        ],
        ISSUE_END_OF_LIFE => &[
            "Schedule replacement",
            "Reduce cycling frequency",
            "Monitor degradation",
        ],
        ISSUE_CELL_DEVIATION => &["Balance cells", "Check BMS calibration", "Monitor closely"],
        ISSUE_HIGH_CYCLES => &["Plan for replacement", "Optimize usage patterns"],
        _ => &[FALLBACK_ACTION],
    }
}

/// Analyzes the battery pack.
///
/// Rules are evaluated independently; the verdict takes the most severe
/// level among the rules that fired.
pub fn analyze(battery: &BatteryReading) -> HealthVerdict {
    let mut verdict = HealthVerdict::new(SubsystemKind::Battery, HealthLevel::Healthy);
    let spread = battery.cell_voltage_spread();

    if battery.state_of_charge < SOC_CRITICAL_PCT {
        verdict.flag(HealthLevel::Critical, ISSUE_LOW_SOC);
    }
    if battery.temperature > TEMPERATURE_WARN_C {
        verdict.flag(HealthLevel::Warning, ISSUE_HIGH_TEMPERATURE);
    }
    if battery.state_of_health < SOH_WARN_PCT {
        verdict.flag(HealthLevel::Warning, ISSUE_END_OF_LIFE);
    }
    if battery.cycle_count > CYCLE_INFO {
        verdict.flag(HealthLevel::Info, ISSUE_HIGH_CYCLES);
    }
    if spread > CELL_SPREAD_WARN_V {
        verdict.flag(HealthLevel::Warning, ISSUE_CELL_DEVIATION);
    }

    verdict.recommended_actions = verdict
        .issues
        .iter()
        .flat_map(|issue| actions_for_issue(issue).iter().map(|a| (*a).to_string()))
        .collect();

    verdict.metric("soc", battery.state_of_charge);
    verdict.metric("soh", battery.state_of_health);
    verdict.metric("temperature", battery.temperature);
    verdict.metric("cycles", f64::from(battery.cycle_count));
    verdict.metric("voltage_spread", spread);
    verdict.metric("voltage_deviation_mv", spread * 1000.0);
    verdict.predicted_life = Some(predict_battery_life(battery.cycle_count));
    verdict
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementUrgency {
    Low,
    Medium,
    High,
}

/// Remaining-life outlook derived from the cycle count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifePrediction {
    pub remaining_cycles: u32,
    /// Assumes one full cycle per day.
    pub years_remaining: f64,
    pub replacement_urgency: ReplacementUrgency,
}

pub fn predict_battery_life(cycle_count: u32) -> LifePrediction {
    let remaining_cycles = RATED_CYCLES.saturating_sub(cycle_count);
    let replacement_urgency = if remaining_cycles < 1000 {
        ReplacementUrgency::High
    } else if remaining_cycles < 2000 {
        ReplacementUrgency::Medium
    } else {
        ReplacementUrgency::Low
    };
    LifePrediction {
        remaining_cycles,
        years_remaining: f64::from(remaining_cycles) / 365.0,
        replacement_urgency,
    }
}

/// Per-cell voltage band used by the cell status strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    Normal,
    Warning,
    Critical,
}

impl CellStatus {
    /// Outside 3.50–3.70 V is critical, outside 3.55–3.65 V is a warning.
    pub fn classify(voltage: f64) -> Self {
        if !(3.5..=3.7).contains(&voltage) {
            CellStatus::Critical
        } else if !(3.55..=3.65).contains(&voltage) {
            CellStatus::Warning
        } else {
            CellStatus::Normal
        }
    }
}

pub fn cell_statuses(cells: &[f64; CELL_COUNT]) -> [CellStatus; CELL_COUNT] {
    cells.map(CellStatus::classify)
}
