//! Color constants and auto-scaling helpers for the TUI.

use ratatui::style::Color;

use crate::alerts::Severity;
use crate::diagnostics::{CellStatus, HealthLevel};

/// Solar output line color.
pub const SOLAR_COLOR: Color = Color::Yellow;
/// Grid load line color.
pub const LOAD_COLOR: Color = Color::Cyan;
/// Gauge color when high (>= 50%).
pub const LEVEL_HIGH: Color = Color::Green;
/// Gauge color when medium (>= 20%).
pub const LEVEL_MID: Color = Color::Yellow;
/// Gauge color when low (< 20%).
pub const LEVEL_LOW: Color = Color::Red;
/// Header bar foreground.
pub const HEADER_FG: Color = Color::White;
/// Header bar background.
pub const HEADER_BG: Color = Color::DarkGray;
/// Header background while emergency mode is active.
pub const EMERGENCY_BG: Color = Color::Red;
/// Footer help text color.
pub const FOOTER_FG: Color = Color::DarkGray;
/// Recommendation text color.
pub const POLICY_COLOR: Color = Color::Magenta;

/// Returns a color for a 0–100 percentage such as state of charge.
pub fn level_color(percent: f64) -> Color {
    if percent >= 50.0 {
        LEVEL_HIGH
    } else if percent >= 20.0 {
        LEVEL_MID
    } else {
        LEVEL_LOW
    }
}

pub fn health_color(level: HealthLevel) -> Color {
    match level {
        HealthLevel::Unknown => Color::DarkGray,
        HealthLevel::Healthy => Color::Green,
        HealthLevel::Info => Color::Blue,
        HealthLevel::Warning => Color::Yellow,
        HealthLevel::Critical => Color::Red,
    }
}

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Blue,
        Severity::Warning => Color::Yellow,
        Severity::Critical => Color::Red,
    }
}

pub fn cell_color(status: CellStatus) -> Color {
    match status {
        CellStatus::Normal => Color::Green,
        CellStatus::Warning => Color::Yellow,
        CellStatus::Critical => Color::Red,
    }
}

/// Computes Y-axis bounds from chart data points with 10% padding.
pub fn auto_bounds_y(first: &[(f64, f64)], second: &[(f64, f64)]) -> [f64; 2] {
    let all = first.iter().chain(second.iter()).map(|&(_, y)| y);
    let min = all.clone().fold(f64::INFINITY, f64::min);
    let max = all.fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return [-1.0, 1.0];
    }
    let range = (max - min).max(0.1);
    let pad = range * 0.1;
    [min - pad, max + pad]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_color_thresholds() {
        assert_eq!(level_color(85.0), LEVEL_HIGH);
        assert_eq!(level_color(50.0), LEVEL_HIGH);
        assert_eq!(level_color(35.0), LEVEL_MID);
        assert_eq!(level_color(19.9), LEVEL_LOW);
    }

    #[test]
    fn empty_series_get_default_bounds() {
        assert_eq!(auto_bounds_y(&[], &[]), [-1.0, 1.0]);
    }

    #[test]
    fn bounds_are_padded() {
        let [lo, hi] = auto_bounds_y(&[(0.0, 10.0)], &[(0.0, 20.0)]);
        assert!(lo < 10.0 && hi > 20.0);
        assert!((lo - 9.0).abs() < 1e-9);
        assert!((hi - 21.0).abs() < 1e-9);
    }

    #[test]
    fn flat_series_still_has_range() {
        let [lo, hi] = auto_bounds_y(&[(0.0, 5.0), (1.0, 5.0)], &[]);
        assert!(hi > lo);
    }
}
