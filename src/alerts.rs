//! Threshold alerting with per-code de-duplication.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::telemetry::Reading;

const SOC_CRITICAL_PCT: f64 = 20.0;
const BATTERY_TEMPERATURE_WARN_C: f64 = 35.0;
const SOLAR_LOW_OUTPUT_KW: f64 = 30.0;
const FIRE_TEMPERATURE_WARN_C: f64 = 40.0;
const SMOKE_CRITICAL_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        })
    }
}

/// Subsystem an alert is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSubsystem {
    Battery,
    Renewable,
    Safety,
    Grid,
    EvCharging,
    System,
}

impl fmt::Display for AlertSubsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertSubsystem::Battery => "Battery",
            AlertSubsystem::Renewable => "Renewable",
            AlertSubsystem::Safety => "Safety",
            AlertSubsystem::Grid => "Grid",
            AlertSubsystem::EvCharging => "EV Charging",
            AlertSubsystem::System => "System",
        })
    }
}

/// Alert type code. The code is the de-duplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertCode {
    BatteryCriticalSoc,
    BatteryOverheat,
    SolarLowOutput,
    HighTemperatureRisk,
    SmokeDetected,
    FireEmergencyActivated,
    BatteryCriticalEmergency,
    GridDisconnectEmergency,
    EvChargingEmergencyStop,
    EmergencyCleared,
}

/// Fixed attributes attached to every alert of a given code.
struct AlertTemplate {
    severity: Severity,
    subsystem: AlertSubsystem,
    message: &'static str,
    actions: [&'static str; 3],
}

impl AlertCode {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertCode::BatteryCriticalSoc => "BATTERY_CRITICAL_SOC",
            AlertCode::BatteryOverheat => "BATTERY_OVERHEAT",
            AlertCode::SolarLowOutput => "SOLAR_LOW_OUTPUT",
            AlertCode::HighTemperatureRisk => "HIGH_TEMPERATURE_RISK",
            AlertCode::SmokeDetected => "SMOKE_DETECTED",
            AlertCode::FireEmergencyActivated => "FIRE_EMERGENCY_ACTIVATED",
            AlertCode::BatteryCriticalEmergency => "BATTERY_CRITICAL_EMERGENCY",
            AlertCode::GridDisconnectEmergency => "GRID_DISCONNECT_EMERGENCY",
            AlertCode::EvChargingEmergencyStop => "EV_CHARGING_EMERGENCY_STOP",
            AlertCode::EmergencyCleared => "EMERGENCY_CLEARED",
        }
    }

    fn template(self) -> AlertTemplate {
        use AlertSubsystem as S;
        use Severity::{Critical, Info, Warning};

        let (severity, subsystem, message, actions) = match self {
            AlertCode::BatteryCriticalSoc => (
                Critical,
                S::Battery,
                "Battery state of charge critically low (<20%)",
                [
                    "Connect to grid immediately",
                    "Reduce load on battery",
                    "Emergency charging",
                ],
            ),
            AlertCode::BatteryOverheat => (
                Warning,
                S::Battery,
                "Battery temperature elevated (>35°C)",
                [
                    "Reduce charging rate",
                    "Check cooling system",
                    "Improve ventilation",
                ],
            ),
            AlertCode::SolarLowOutput => (
                Warning,
                S::Renewable,
                "Solar generation below expected levels",
                [
                    "Check panel cleanliness",
                    "Verify inverter operation",
                    "Inspect for shading",
                ],
            ),
            AlertCode::HighTemperatureRisk => (
                Warning,
                S::Safety,
                "Elevated temperature detected - fire risk",
                [
                    "Check ventilation systems",
                    "Monitor temperature trends",
                    "Prepare emergency protocols",
                ],
            ),
            AlertCode::SmokeDetected => (
                Critical,
                S::Safety,
                "Smoke detection triggered",
                [
                    "Activate emergency protocols",
                    "Evacuate if necessary",
                    "Contact emergency services",
                ],
            ),
            AlertCode::FireEmergencyActivated => (
                Critical,
                S::Safety,
                "FIRE DETECTED - EMERGENCY PROTOCOLS ACTIVATED",
                [
                    "EVACUATE AREA",
                    "ACTIVATE FIRE SUPPRESSION",
                    "CALL EMERGENCY SERVICES",
                ],
            ),
            AlertCode::BatteryCriticalEmergency => (
                Critical,
                S::Battery,
                "BATTERY SYSTEM CRITICAL - THERMAL RUNAWAY DETECTED",
                [
                    "ISOLATE BATTERY BANK",
                    "ACTIVATE COOLING SYSTEMS",
                    "PREPARE FOR QUARANTINE",
                ],
            ),
            AlertCode::GridDisconnectEmergency => (
                Critical,
                S::Grid,
                "GRID INSTABILITY - AUTOMATIC ISOLATION",
                [
                    "SWITCH TO BACKUP POWER",
                    "SHED NON-CRITICAL LOADS",
                    "STABILIZE FREQUENCY",
                ],
            ),
            AlertCode::EvChargingEmergencyStop => (
                Critical,
                S::EvCharging,
                "ALL EV CHARGING TERMINATED - SAFETY PROTOCOL",
                [
                    "VERIFY CHARGER SHUTDOWN",
                    "ISOLATE POWER FEEDS",
                    "INITIATE SAFETY CHECKS",
                ],
            ),
            AlertCode::EmergencyCleared => (
                Info,
                S::System,
                "Emergency cleared - Systems returning to normal operation",
                [
                    "Verify all systems normal",
                    "Complete safety checklist",
                    "Resume normal operations",
                ],
            ),
        };
        AlertTemplate {
            severity,
            subsystem,
            message,
            actions,
        }
    }
}

impl fmt::Display for AlertCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique per alert.
    pub id: String,
    pub code: AlertCode,
    pub severity: Severity,
    pub subsystem: AlertSubsystem,
    pub message: String,
    pub recommended_actions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub acknowledged: bool,
}

impl Alert {
    /// Creates an un-acknowledged alert with a fresh id.
    pub fn new(code: AlertCode) -> Self {
        let t = code.template();
        Self {
            id: format!("alert_{}", Uuid::new_v4().simple()),
            code,
            severity: t.severity,
            subsystem: t.subsystem,
            message: t.message.to_string(),
            recommended_actions: t.actions.iter().map(|a| (*a).to_string()).collect(),
            created_at: Utc::now(),
            acknowledged: false,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}{}",
            self.severity,
            self.code,
            self.subsystem,
            self.message,
            if self.acknowledged { " (ack)" } else { "" }
        )
    }
}

/// Codes whose threshold rule fires for `reading`, in rule order.
pub fn triggered_codes(reading: &Reading) -> Vec<AlertCode> {
    let mut codes = Vec::new();
    if reading.battery.state_of_charge < SOC_CRITICAL_PCT {
        codes.push(AlertCode::BatteryCriticalSoc);
    }
    if reading.battery.temperature > BATTERY_TEMPERATURE_WARN_C {
        codes.push(AlertCode::BatteryOverheat);
    }
    if reading.renewables.solar.output < SOLAR_LOW_OUTPUT_KW {
        codes.push(AlertCode::SolarLowOutput);
    }
    if reading.fire.temperature > FIRE_TEMPERATURE_WARN_C {
        codes.push(AlertCode::HighTemperatureRisk);
    }
    if reading.fire.smoke_level > SMOKE_CRITICAL_PCT {
        codes.push(AlertCode::SmokeDetected);
    }
    codes
}

/// Owns the alert list and the append-only history.
///
/// Alerts are never removed. Acknowledging flips the flag in the list in
/// place; the history keeps each alert as it was raised.
#[derive(Debug, Default, Clone)]
pub struct AlertEngine {
    alerts: Vec<Alert>,
    history: Vec<Alert>,
}

impl AlertEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates the threshold rules and returns the alerts appended by this
    /// call. Alerts whose code is already active are dropped.
    pub fn check(&mut self, reading: &Reading) -> Vec<Alert> {
        triggered_codes(reading)
            .into_iter()
            .filter_map(|code| self.raise(Alert::new(code)))
            .collect()
    }

    /// Appends `alert` unless an un-acknowledged alert with the same code is
    /// already active. Returns the appended alert.
    pub fn raise(&mut self, alert: Alert) -> Option<Alert> {
        if self.is_active(alert.code) {
            return None;
        }
        warn!(
            code = alert.code.as_str(),
            severity = %alert.severity,
            id = %alert.id,
            "{}",
            alert.message
        );
        self.alerts.push(alert.clone());
        self.history.push(alert.clone());
        Some(alert)
    }

    /// Marks one alert as acknowledged.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownAlert`] if no alert has this id.
    pub fn acknowledge(&mut self, id: &str) -> Result<(), CoreError> {
        let alert = self
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| CoreError::UnknownAlert(id.to_string()))?;
        if !alert.acknowledged {
            alert.acknowledged = true;
            info!(code = alert.code.as_str(), id, "alert acknowledged");
        }
        Ok(())
    }

    /// Acknowledges every active alert and returns how many were changed.
    pub fn acknowledge_all(&mut self) -> usize {
        let mut count = 0;
        for alert in self.alerts.iter_mut().filter(|a| !a.acknowledged) {
            alert.acknowledged = true;
            count += 1;
        }
        count
    }

    /// Whether an un-acknowledged alert with `code` exists.
    pub fn is_active(&self, code: AlertCode) -> bool {
        self.alerts.iter().any(|a| a.code == code && !a.acknowledged)
    }

    /// Un-acknowledged alerts, oldest first.
    pub fn active(&self) -> Vec<&Alert> {
        self.alerts.iter().filter(|a| !a.acknowledged).collect()
    }

    pub fn active_count(&self) -> usize {
        self.alerts.iter().filter(|a| !a.acknowledged).count()
    }

    /// Every alert ever appended, with current acknowledgement state.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Every alert ever appended, as raised.
    pub fn history(&self) -> &[Alert] {
        &self.history
    }
}
