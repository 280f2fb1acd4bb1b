/// Tick clock for headless runs.
pub mod clock;
/// Randomized and fixture telemetry sources.
pub mod generator;
