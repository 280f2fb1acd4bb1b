use super::{HealthLevel, HealthVerdict, SubsystemKind};
use crate::telemetry::Renewables;

pub const ISSUE_LOW_EFFICIENCY: &str = "Low solar generation efficiency";
pub const ISSUE_VOLTAGE_RANGE: &str = "Solar voltage out of optimal range";

/// Output the efficiency figure is referenced against (kW).
const REFERENCE_OUTPUT: f64 = 100.0;
const EFFICIENCY_WARN_PCT: f64 = 60.0;
const VOLTAGE_MIN: f64 = 230.0;
const VOLTAGE_MAX: f64 = 250.0;

const INSPECTION_ACTIONS: [&str; 3] = [
    "Check panel cleanliness",
    "Verify inverter settings",
    "Inspect connections",
];

/// Solar efficiency in percent of the reference output.
///
/// With a reference of 100 this equals the output value itself.
pub fn solar_efficiency(output: f64) -> f64 {
    output / REFERENCE_OUTPUT * 100.0
}

/// Analyzes the solar array. The inspection checklist is always attached.
pub fn analyze(renewables: &Renewables) -> HealthVerdict {
    let solar = &renewables.solar;
    let mut verdict = HealthVerdict::new(SubsystemKind::Renewable, HealthLevel::Healthy);
    let efficiency = solar_efficiency(solar.output);

    if efficiency < EFFICIENCY_WARN_PCT {
        verdict.flag(HealthLevel::Warning, ISSUE_LOW_EFFICIENCY);
    }
    if !(VOLTAGE_MIN..=VOLTAGE_MAX).contains(&solar.voltage) {
        verdict.flag(HealthLevel::Warning, ISSUE_VOLTAGE_RANGE);
    }

    verdict.recommended_actions = INSPECTION_ACTIONS.iter().map(|a| (*a).to_string()).collect();
    verdict.metric("efficiency", efficiency);
    verdict.metric("voltage", solar.voltage);
    verdict.metric("wind_output", renewables.wind.output);
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{SolarReading, WindReading};

    fn array(output: f64, voltage: f64) -> Renewables {
        Renewables {
            solar: SolarReading {
                output,
                voltage,
                current: 13.0,
            },
            wind: WindReading {
                output: 30.0,
                wind_speed: 8.0,
            },
        }
    }

    #[test]
    fn efficiency_is_the_output_value() {
        assert_eq!(solar_efficiency(72.5), 72.5);
        assert_eq!(solar_efficiency(0.0), 0.0);
    }

    #[test]
    fn low_output_warns() {
        let v = analyze(&array(55.0, 240.0));
        assert_eq!(v.health, HealthLevel::Warning);
        assert_eq!(v.issues, vec![ISSUE_LOW_EFFICIENCY]);
    }

    #[test]
    fn voltage_bounds_are_inclusive() {
        assert_eq!(analyze(&array(70.0, 230.0)).health, HealthLevel::Healthy);
        assert_eq!(analyze(&array(70.0, 250.0)).health, HealthLevel::Healthy);
        let v = analyze(&array(70.0, 251.0));
        assert_eq!(v.health, HealthLevel::Warning);
        assert!(v.has_issue(ISSUE_VOLTAGE_RANGE));
    }

    #[test]
    fn both_rules_can_fire() {
        let v = analyze(&array(10.0, 200.0));
        assert_eq!(v.issues.len(), 2);
        assert_eq!(v.health, HealthLevel::Warning);
    }

    #[test]
    fn checklist_always_present() {
        let v = analyze(&array(80.0, 240.0));
        assert_eq!(v.health, HealthLevel::Healthy);
        assert_eq!(v.recommended_actions.len(), 3);
        assert_eq!(v.metrics.get("efficiency"), Some(&80.0));
    }
}
