//! Synthetic telemetry sources.

use chrono::Utc;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::telemetry::{
    BatteryReading, CELL_COUNT, EvReading, FireReading, GridReading, Reading, Renewables,
    SolarReading, WindReading,
};

/// Trait defining a producer of site telemetry.
///
/// The decision core pulls one reading per tick from its source, so tests can
/// swap the randomized generator for a deterministic fixture.
pub trait TelemetrySource {
    /// Produces the reading for the next tick.
    fn generate(&mut self) -> Reading;

    /// Returns a human-readable name for the source.
    fn source_type(&self) -> &'static str;
}

/// Randomized generator: each field is a fixed base value plus a uniform
/// perturbation drawn from a seeded RNG.
///
/// Two generators built with the same seed produce identical sequences
/// (timestamps aside).
#[derive(Debug, Clone)]
pub struct RandomTelemetry {
    /// Number of EV charging stations on site.
    pub total_stations: u32,

    /// Battery cycle count reported with every reading.
    pub cycle_count: u32,

    rng: StdRng,
}

impl RandomTelemetry {
    /// Creates a new generator.
    ///
    /// # Arguments
    ///
    /// * `total_stations` - Number of EV stations (must be > 0)
    /// * `cycle_count` - Battery cycle count to report
    /// * `seed` - Random seed for reproducible sequences
    ///
    /// # Panics
    ///
    /// Panics if `total_stations` is zero.
    pub fn new(total_stations: u32, cycle_count: u32, seed: u64) -> Self {
        assert!(total_stations > 0, "total_stations must be > 0");
        Self {
            total_stations,
            cycle_count,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `base + U(lo, hi)`.
    fn jitter(&mut self, base: f64, lo: f64, hi: f64) -> f64 {
        base + self.rng.random_range(lo..hi)
    }

    fn active_sessions(&mut self) -> u32 {
        let offset = self.rng.random_range(-2.0..2.0_f64).floor() as i64;
        (3 + offset).clamp(1, i64::from(self.total_stations)) as u32
    }
}

impl TelemetrySource for RandomTelemetry {
    fn generate(&mut self) -> Reading {
        let solar = SolarReading {
            output: self.jitter(65.0, 0.0, 25.0),
            voltage: self.jitter(240.0, -5.0, 5.0),
            current: self.jitter(12.0, 0.0, 3.0),
        };
        let wind = WindReading {
            output: self.jitter(25.0, 0.0, 15.0),
            wind_speed: self.jitter(6.5, 0.0, 4.0),
        };

        let mut cell_voltages = [0.0; CELL_COUNT];
        for cell in &mut cell_voltages {
            *cell = self.jitter(3.6, -0.15, 0.15);
        }
        let battery = BatteryReading {
            state_of_charge: self.jitter(80.0, 0.0, 20.0),
            state_of_health: self.jitter(90.0, 0.0, 8.0),
            voltage: self.jitter(48.2, 0.0, 1.5),
            temperature: self.jitter(25.0, 0.0, 10.0),
            cycle_count: self.cycle_count,
            cell_voltages,
        };

        let active = self.active_sessions();
        let ev = EvReading {
            power_usage: self.jitter(45.0, -12.5, 12.5),
            total_energy_delivered: self.jitter(1245.8, 0.0, 15.0),
            ..EvReading::with_sessions(active, self.total_stations)
        };

        let grid = GridReading {
            load: self.jitter(45.0, 0.0, 30.0),
            frequency: self.jitter(59.98, -0.04, 0.04),
            voltage: self.jitter(120.2, -0.6, 0.6),
        };

        let fire = FireReading {
            temperature: self.jitter(23.5, -3.0, 3.0),
            co_level: self.jitter(3.0, 0.0, 4.0),
            air_quality: self.jitter(90.0, -7.5, 7.5),
            smoke_level: self.jitter(0.2, 0.0, 0.5),
        };

        Reading {
            timestamp: Utc::now(),
            renewables: Renewables { solar, wind },
            battery,
            ev,
            grid,
            fire,
        }
    }

    fn source_type(&self) -> &'static str {
        "RandomTelemetry"
    }
}

impl<T: TelemetrySource + ?Sized> TelemetrySource for Box<T> {
    fn generate(&mut self) -> Reading {
        (**self).generate()
    }

    fn source_type(&self) -> &'static str {
        (**self).source_type()
    }
}

/// Replays a fixed list of readings, cycling back to the first when the
/// list is exhausted.
#[derive(Debug, Clone)]
pub struct FixtureTelemetry {
    readings: Vec<Reading>,
    next: usize,
}

impl FixtureTelemetry {
    /// Creates a fixture source.
    ///
    /// # Panics
    ///
    /// Panics if `readings` is empty.
    pub fn new(readings: Vec<Reading>) -> Self {
        assert!(!readings.is_empty(), "fixture needs at least one reading");
        Self { readings, next: 0 }
    }
}

impl TelemetrySource for FixtureTelemetry {
    fn generate(&mut self) -> Reading {
        let reading = self.readings[self.next % self.readings.len()].clone();
        self.next += 1;
        reading
    }

    fn source_type(&self) -> &'static str {
        "FixtureTelemetry"
    }
}
