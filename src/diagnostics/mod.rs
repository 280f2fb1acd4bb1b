//! Rule-based health diagnostics for each subsystem.
//!
//! Every analyzer is a pure function of a [`Reading`]: the same reading
//! always yields the same verdict.

/// Battery pack analyzer and life prediction.
pub mod battery;
/// Solar array analyzer.
pub mod renewable;
/// EV, grid and fire-safety analyzers.
pub mod site;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::telemetry::Reading;

pub use battery::{CellStatus, LifePrediction, ReplacementUrgency, cell_statuses, predict_battery_life};

/// Subsystems the evaluator knows how to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemKind {
    Renewable,
    Battery,
    EvCharger,
    Grid,
    Safety,
}

impl SubsystemKind {
    /// All subsystems in display order.
    pub const ALL: [SubsystemKind; 5] = [
        SubsystemKind::Renewable,
        SubsystemKind::Battery,
        SubsystemKind::EvCharger,
        SubsystemKind::Grid,
        SubsystemKind::Safety,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubsystemKind::Renewable => "renewable",
            SubsystemKind::Battery => "battery",
            SubsystemKind::EvCharger => "ev_charger",
            SubsystemKind::Grid => "grid",
            SubsystemKind::Safety => "safety",
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health level of a subsystem.
///
/// Variants are ordered by severity so that combining rule outcomes is a
/// `max`: critical > warning > info > healthy. `Unknown` sorts lowest and is
/// only produced for subsystems without an analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Unknown,
    Healthy,
    Info,
    Warning,
    Critical,
}

impl HealthLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthLevel::Unknown => "unknown",
            HealthLevel::Healthy => "healthy",
            HealthLevel::Info => "info",
            HealthLevel::Warning => "warning",
            HealthLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of analyzing one subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthVerdict {
    pub subsystem: SubsystemKind,
    pub health: HealthLevel,
    /// Issues in rule order.
    pub issues: Vec<String>,
    /// Recommended actions in issue order.
    pub recommended_actions: Vec<String>,
    /// Display metrics keyed by name.
    pub metrics: BTreeMap<String, f64>,
    /// Battery life outlook; only set for the battery subsystem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_life: Option<LifePrediction>,
}

impl HealthVerdict {
    /// An empty verdict at the given level.
    pub fn new(subsystem: SubsystemKind, health: HealthLevel) -> Self {
        Self {
            subsystem,
            health,
            issues: Vec::new(),
            recommended_actions: Vec::new(),
            metrics: BTreeMap::new(),
            predicted_life: None,
        }
    }

    /// Records an issue and raises the health level to at least `level`.
    pub fn flag(&mut self, level: HealthLevel, issue: &str) {
        self.health = self.health.max(level);
        self.issues.push(issue.to_string());
    }

    pub fn metric(&mut self, name: &str, value: f64) {
        self.metrics.insert(name.to_string(), value);
    }

    pub fn has_issue(&self, issue: &str) -> bool {
        self.issues.iter().any(|i| i == issue)
    }
}

/// Analyzes one subsystem of the reading.
pub fn evaluate(kind: SubsystemKind, reading: &Reading) -> HealthVerdict {
    match kind {
        SubsystemKind::Battery => battery::analyze(&reading.battery),
        SubsystemKind::Renewable => renewable::analyze(&reading.renewables),
        SubsystemKind::EvCharger => site::analyze_ev(&reading.ev),
        SubsystemKind::Grid => site::analyze_grid(&reading.grid),
        SubsystemKind::Safety => site::analyze_safety(&reading.fire),
    }
}

/// Analyzes every subsystem, in [`SubsystemKind::ALL`] order.
pub fn evaluate_all(reading: &Reading) -> Vec<HealthVerdict> {
    SubsystemKind::ALL
        .iter()
        .map(|kind| evaluate(*kind, reading))
        .collect()
}
