//! Shared fixtures for integration tests.

#![allow(dead_code)]

use smart_ems::core::{CoreSettings, DecisionCore};
use smart_ems::emergency::nominal_reading;
use smart_ems::sim::generator::FixtureTelemetry;
use smart_ems::telemetry::Reading;

/// Default site: 8 stations, 1245 cycles, seed 42.
pub fn default_settings() -> CoreSettings {
    CoreSettings::new(8, 1245, 42)
}

/// The nominal reading for the default site.
pub fn nominal() -> Reading {
    nominal_reading(8, 1245)
}

/// Nominal reading with a depleted, hot battery (SOC 15 %, 38.5 °C).
pub fn faulted() -> Reading {
    let mut reading = nominal();
    reading.battery.state_of_charge = 15.0;
    reading.battery.temperature = 38.5;
    reading
}

/// A core whose generated ticks replay `readings` in order.
pub fn fixture_core(readings: Vec<Reading>) -> DecisionCore<FixtureTelemetry> {
    DecisionCore::new(FixtureTelemetry::new(readings), default_settings())
}

/// A core that replays the nominal reading on every tick.
pub fn nominal_core() -> DecisionCore<FixtureTelemetry> {
    fixture_core(vec![nominal()])
}
