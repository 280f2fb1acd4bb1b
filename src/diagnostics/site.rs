use super::{HealthLevel, HealthVerdict, SubsystemKind};
use crate::telemetry::{EvReading, FireReading, GridReading};

pub const ISSUE_FIRE_TEMPERATURE: &str = "Warning: Elevated temperature - fire risk";
pub const ISSUE_SMOKE: &str = "Critical: Smoke detected";

const FIRE_TEMPERATURE_WARN_C: f64 = 40.0;
const SMOKE_CRITICAL_PCT: f64 = 5.0;

/// EV chargers report no fault channel; the verdict only carries occupancy.
pub fn analyze_ev(ev: &EvReading) -> HealthVerdict {
    let mut verdict = HealthVerdict::new(SubsystemKind::EvCharger, HealthLevel::Healthy);
    verdict.metric("active_sessions", f64::from(ev.active_sessions));
    verdict.metric("available_stations", f64::from(ev.available_stations));
    verdict.metric("total_stations", f64::from(ev.total_stations));
    verdict.metric("power_usage", ev.power_usage);
    verdict
}

/// No grid rules are defined, so the level stays unknown.
pub fn analyze_grid(grid: &GridReading) -> HealthVerdict {
    let mut verdict = HealthVerdict::new(SubsystemKind::Grid, HealthLevel::Unknown);
    verdict.metric("load", grid.load);
    verdict.metric("frequency", grid.frequency);
    verdict.metric("voltage", grid.voltage);
    verdict
}

/// Fire-safety sensors, using the same thresholds as the alert rules.
pub fn analyze_safety(fire: &FireReading) -> HealthVerdict {
    let mut verdict = HealthVerdict::new(SubsystemKind::Safety, HealthLevel::Healthy);
    if fire.temperature > FIRE_TEMPERATURE_WARN_C {
        verdict.flag(HealthLevel::Warning, ISSUE_FIRE_TEMPERATURE);
        verdict.recommended_actions.extend(
            [
                "Check ventilation systems",
                "Monitor temperature trends",
                "Prepare emergency protocols",
            ]
            .map(String::from),
        );
    }
    if fire.smoke_level > SMOKE_CRITICAL_PCT {
        verdict.flag(HealthLevel::Critical, ISSUE_SMOKE);
        verdict.recommended_actions.extend(
            [
                "Activate emergency protocols",
                "Evacuate if necessary",
                "Contact emergency services",
            ]
            .map(String::from),
        );
    }
    verdict.metric("temperature", fire.temperature);
    verdict.metric("co_level", fire.co_level);
    verdict.metric("air_quality", fire.air_quality);
    verdict.metric("smoke_level", fire.smoke_level);
    verdict
}
