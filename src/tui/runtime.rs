//! TUI application state wrapped around a live decision core.

use std::collections::VecDeque;
use std::time::Instant;

use crate::config::EmsConfig;
use crate::core::{CoreEvent, CoreSnapshot, DecisionCore, TickReport};
use crate::emergency::EmergencyMode;
use crate::sim::generator::RandomTelemetry;

/// Maximum number of tick reports kept for the rolling chart.
const MAX_HISTORY: usize = 200;

/// Tick interval options in milliseconds (slowest → fastest).
const SPEED_LEVELS_MS: [u64; 6] = [5000, 3000, 1000, 500, 250, 100];

/// Number of frames the critical banner flashes after a critical alert.
const FLASH_FRAMES: u8 = 6;

/// TUI application state.
pub struct App {
    core: DecisionCore<RandomTelemetry>,
    /// Configuration the core was built from (kept for restart/preset switch).
    config: EmsConfig,
    /// Rolling history of tick reports for the chart.
    pub history: VecDeque<TickReport>,
    /// Current index into `SPEED_LEVELS_MS`.
    pub speed_idx: usize,
    /// Whether the user has requested quit.
    pub quit: bool,
    /// When the last tick was attempted.
    pub last_tick: Instant,
    /// Name of the active preset.
    pub preset_name: String,
    /// Last control outcome, shown in the footer.
    pub status: Option<String>,
    /// Remaining frames of the critical-alert flash.
    pub flash: u8,
}

impl App {
    /// Creates a new app from a configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration has zero stations; validate first.
    pub fn new(config: EmsConfig, preset_name: &str) -> Self {
        let speed_idx = nearest_speed(config.simulation.tick_interval_ms);
        Self {
            core: DecisionCore::with_random_telemetry(config.core_settings()),
            config,
            history: VecDeque::with_capacity(MAX_HISTORY),
            speed_idx,
            quit: false,
            last_tick: Instant::now(),
            preset_name: preset_name.to_string(),
            status: None,
            flash: 0,
        }
    }

    /// Runs one generated tick. No-op while paused or in emergency mode.
    pub fn tick(&mut self) {
        if let Some(report) = self.core.tick() {
            self.record(report);
        }
        self.pump_events();
    }

    fn record(&mut self, report: TickReport) {
        if self.history.len() >= MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(report);
    }

    /// Drains the core's outbox, arming the flash on critical signals.
    fn pump_events(&mut self) {
        for event in self.core.drain_events() {
            if let CoreEvent::CriticalSignal { code } = event {
                self.flash = FLASH_FRAMES;
                self.status = Some(format!("CRITICAL: {code}"));
            }
        }
    }

    /// Counts one drawn frame down from the flash.
    pub fn on_frame(&mut self) {
        self.flash = self.flash.saturating_sub(1);
    }

    pub fn toggle_streaming(&mut self) {
        let streaming = self.core.toggle_streaming();
        self.status = Some(if streaming {
            "streaming resumed".to_string()
        } else {
            "streaming paused".to_string()
        });
        self.pump_events();
    }

    /// Triggers an emergency in normal mode, clears it otherwise.
    pub fn toggle_emergency(&mut self) {
        let result = match self.core.mode() {
            EmergencyMode::Normal => self.core.trigger_emergency(),
            EmergencyMode::Emergency => self.core.clear_emergency(),
        };
        self.status = Some(match result {
            Ok(_) => format!("mode: {}", self.core.mode()),
            Err(e) => e.to_string(),
        });
        self.pump_events();
    }

    /// Applies the configured default battery fault.
    pub fn inject_fault(&mut self) {
        match self.core.inject_default_fault() {
            Ok(report) => {
                self.status = Some(format!(
                    "fault injected: SoC {:.1}%, {:.1}C",
                    report.reading.battery.state_of_charge, report.reading.battery.temperature
                ));
                self.record(report);
            }
            Err(e) => self.status = Some(e.to_string()),
        }
        self.pump_events();
    }

    pub fn cycle_objective(&mut self) {
        let next = self.core.objective().next();
        self.core.set_objective(next);
        self.status = Some(format!("objective: {next}"));
        self.pump_events();
    }

    pub fn acknowledge_all(&mut self) {
        let n = self.core.acknowledge_all_alerts();
        self.status = Some(format!("acknowledged {n} alert(s)"));
        self.pump_events();
    }

    /// Increases tick rate (shorter interval).
    pub fn speed_up(&mut self) {
        if self.speed_idx + 1 < SPEED_LEVELS_MS.len() {
            self.speed_idx += 1;
        }
    }

    /// Decreases tick rate (longer interval).
    pub fn speed_down(&mut self) {
        if self.speed_idx > 0 {
            self.speed_idx -= 1;
        }
    }

    /// Returns the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        SPEED_LEVELS_MS[self.speed_idx]
    }

    /// Switches to a different preset, resetting all core state.
    pub fn switch_preset(&mut self, name: &str) {
        let Ok(config) = EmsConfig::from_preset(name) else {
            return;
        };
        self.core = DecisionCore::with_random_telemetry(config.core_settings());
        self.config = config;
        self.history.clear();
        self.flash = 0;
        self.preset_name = name.to_string();
        self.status = Some(format!("preset: {name}"));
    }

    /// Rebuilds the core from the current configuration.
    pub fn restart(&mut self) {
        self.core = DecisionCore::with_random_telemetry(self.config.core_settings());
        self.history.clear();
        self.flash = 0;
        self.status = Some("restarted".to_string());
    }

    pub fn snapshot(&self) -> CoreSnapshot {
        self.core.snapshot()
    }

    pub fn mode(&self) -> EmergencyMode {
        self.core.mode()
    }

    pub fn is_streaming(&self) -> bool {
        self.core.is_streaming()
    }
}

fn nearest_speed(interval_ms: u64) -> usize {
    SPEED_LEVELS_MS
        .iter()
        .enumerate()
        .min_by_key(|(_, ms)| ms.abs_diff(interval_ms))
        .map_or(1, |(i, _)| i)
}
