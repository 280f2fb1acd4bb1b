//! Table-driven action recommender.
//!
//! The site state is bucketed on three thresholds (demand, solar output,
//! price) and the bucket is looked up in a fixed table of canned actions.
//! There is no learning: the "training" counters only track how many
//! recommendations have been issued, and the learning gauges only creep
//! upward with generated ticks.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::telemetry::Reading;

const DEMAND_HIGH_KW: f64 = 50.0;
const SOLAR_HIGH_KW: f64 = 60.0;
const PRICE_HIGH: f64 = 0.15;

/// Used when the table has no entry for a bucket.
pub const FALLBACK: (PolicyAction, f64) = (PolicyAction::ChargeBatterySolar, 0.75);

/// Inputs the recommender buckets on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyState {
    pub battery_soc: f64,
    /// Site demand (kW), taken from grid load.
    pub demand: f64,
    pub solar_output: f64,
    /// Electricity price ($/kWh).
    pub electricity_price: f64,
    /// Grid stability (%).
    pub grid_stability: f64,
}

impl PolicyState {
    /// Derives the policy inputs from a reading.
    ///
    /// Price and grid stability have no telemetry source, so they are drawn
    /// as `0.12 + U(0, 0.15)` and `90 + U(0, 10)`.
    pub fn from_reading<R: Rng>(reading: &Reading, rng: &mut R) -> Self {
        Self {
            battery_soc: reading.battery.state_of_charge,
            demand: reading.grid.load,
            solar_output: reading.renewables.solar.output,
            electricity_price: 0.12 + rng.random_range(0.0..0.15),
            grid_stability: 90.0 + rng.random_range(0.0..10.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DemandLevel {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolarLevel {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceLevel {
    High,
    Low,
}

/// Discretized policy state. Renders as e.g.
/// `high_demand_low_solar_high_price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub demand: DemandLevel,
    pub solar: SolarLevel,
    pub price: PriceLevel,
}

impl BucketKey {
    /// Buckets a state. All thresholds are strict: a value equal to the
    /// threshold falls in the low bucket.
    pub fn from_state(state: &PolicyState) -> Self {
        Self {
            demand: if state.demand > DEMAND_HIGH_KW {
                DemandLevel::High
            } else {
                DemandLevel::Low
            },
            solar: if state.solar_output > SOLAR_HIGH_KW {
                SolarLevel::High
            } else {
                SolarLevel::Low
            },
            price: if state.electricity_price > PRICE_HIGH {
                PriceLevel::High
            } else {
                PriceLevel::Low
            },
        }
    }

    pub const fn new(demand: DemandLevel, solar: SolarLevel, price: PriceLevel) -> Self {
        Self {
            demand,
            solar,
            price,
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let demand = match self.demand {
            DemandLevel::High => "high_demand",
            DemandLevel::Low => "low_demand",
        };
        let solar = match self.solar {
            SolarLevel::High => "high_solar",
            SolarLevel::Low => "low_solar",
        };
        let price = match self.price {
            PriceLevel::High => "high_price",
            PriceLevel::Low => "low_price",
        };
        write!(f, "{demand}_{solar}_{price}")
    }
}

impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    ChargeBatterySolar,
    DischargeBatteryGrid,
    EvChargeOffpeak,
    V2gSellEnergy,
    LoadShedNonCritical,
    OptimizeHvac,
}

impl PolicyAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyAction::ChargeBatterySolar => "charge_battery_solar",
            PolicyAction::DischargeBatteryGrid => "discharge_battery_grid",
            PolicyAction::EvChargeOffpeak => "ev_charge_offpeak",
            PolicyAction::V2gSellEnergy => "v2g_sell_energy",
            PolicyAction::LoadShedNonCritical => "load_shed_non_critical",
            PolicyAction::OptimizeHvac => "optimize_hvac",
        }
    }

    /// Operator-facing description.
    pub fn describe(self) -> &'static str {
        match self {
            PolicyAction::ChargeBatterySolar => "Charge battery from solar surplus",
            PolicyAction::DischargeBatteryGrid => "Discharge battery to cover grid demand",
            PolicyAction::EvChargeOffpeak => "Shift EV charging to off-peak hours",
            PolicyAction::V2gSellEnergy => "Sell stored EV energy back to the grid",
            PolicyAction::LoadShedNonCritical => "Shed non-critical loads",
            PolicyAction::OptimizeHvac => "Optimize HVAC setpoints",
        }
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-selected optimization objective.
///
/// Stored and echoed with each recommendation; the table does not depend
/// on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    #[default]
    Cost,
    Emission,
    Reliability,
    Balanced,
}

impl Objective {
    pub const ALL: [Objective; 4] = [
        Objective::Cost,
        Objective::Emission,
        Objective::Reliability,
        Objective::Balanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Objective::Cost => "cost",
            Objective::Emission => "emission",
            Objective::Reliability => "reliability",
            Objective::Balanced => "balanced",
        }
    }

    /// The next objective in [`Objective::ALL`], wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|o| *o == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownObjective(s.to_string()))
    }
}

/// Expected outcome figures attached to a recommendation. These are fixed
/// placeholders, not model output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Outlook {
    /// Expected savings ($).
    pub expected_savings: f64,
    /// Emission reduction (%).
    pub emission_reduction: f64,
    /// Efficiency (%).
    pub efficiency: f64,
}

impl Outlook {
    pub const PLACEHOLDER: Self = Self {
        expected_savings: 19.5,
        emission_reduction: 20.0,
        efficiency: 94.0,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub action: PolicyAction,
    pub confidence: f64,
    pub key: BucketKey,
    pub objective: Objective,
    pub outlook: Outlook,
    /// Recommendation count including this one.
    pub episodes: u64,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.0}% confidence, {}, objective {})",
            self.action,
            self.confidence * 100.0,
            self.key,
            self.objective
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingProgress {
    pub episodes: u64,
    /// `min(100, episodes / 1000 * 100)`.
    pub convergence: f64,
    /// `max(0.1, 1 - episodes / 5000)`.
    pub exploration_rate: f64,
}

impl TrainingProgress {
    pub fn at(episodes: u64) -> Self {
        let n = episodes as f64;
        Self {
            episodes,
            convergence: (n / 1000.0 * 100.0).min(100.0),
            exploration_rate: (1.0 - n / 5000.0).max(0.1),
        }
    }
}

/// Pattern-learning gauges (%) shown next to the training counters.
///
/// Each generated tick nudges every gauge up by `U(0, 0.5)`, capped at 100.
/// Emergency transitions leave them alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LearningProgress {
    pub temperature_patterns: f64,
    pub occupancy_learning: f64,
    pub energy_correlation: f64,
    pub predictive_accuracy: f64,
}

impl LearningProgress {
    pub const INITIAL: Self = Self {
        temperature_patterns: 75.0,
        occupancy_learning: 82.0,
        energy_correlation: 68.0,
        predictive_accuracy: 91.0,
    };

    pub fn advance<R: Rng>(&mut self, rng: &mut R) {
        for gauge in [
            &mut self.temperature_patterns,
            &mut self.occupancy_learning,
            &mut self.energy_correlation,
            &mut self.predictive_accuracy,
        ] {
            *gauge = (*gauge + rng.random_range(0.0..0.5)).min(100.0);
        }
    }
}

impl Default for LearningProgress {
    fn default() -> Self {
        Self::INITIAL
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyEntry {
    pub key: BucketKey,
    pub action: PolicyAction,
    pub confidence: f64,
}

const fn entry(
    demand: DemandLevel,
    solar: SolarLevel,
    price: PriceLevel,
    action: PolicyAction,
    confidence: f64,
) -> PolicyEntry {
    PolicyEntry {
        key: BucketKey::new(demand, solar, price),
        action,
        confidence,
    }
}

/// The canned table, one entry per bucket.
pub const POLICY_TABLE: [PolicyEntry; 8] = {
    use DemandLevel as D;
    use PolicyAction as A;
    use PriceLevel as P;
    use SolarLevel as S;
    [
        entry(D::High, S::High, P::High, A::V2gSellEnergy, 0.89),
        entry(D::High, S::High, P::Low, A::DischargeBatteryGrid, 0.85),
        entry(D::High, S::Low, P::High, A::LoadShedNonCritical, 0.82),
        entry(D::High, S::Low, P::Low, A::EvChargeOffpeak, 0.78),
        entry(D::Low, S::High, P::High, A::V2gSellEnergy, 0.91),
        entry(D::Low, S::High, P::Low, A::ChargeBatterySolar, 0.88),
        entry(D::Low, S::Low, P::High, A::OptimizeHvac, 0.76),
        entry(D::Low, S::Low, P::Low, A::ChargeBatterySolar, 0.83),
    ]
};

#[derive(Debug, Clone)]
pub struct PolicyRecommender {
    table: Vec<PolicyEntry>,
    objective: Objective,
    episodes: u64,
}

impl Default for PolicyRecommender {
    fn default() -> Self {
        Self::new(Objective::default())
    }
}

impl PolicyRecommender {
    /// Creates a recommender over [`POLICY_TABLE`].
    pub fn new(objective: Objective) -> Self {
        Self::with_table(POLICY_TABLE.to_vec(), objective)
    }

    /// Creates a recommender over a custom table. Buckets missing from the
    /// table resolve to [`FALLBACK`].
    pub fn with_table(table: Vec<PolicyEntry>, objective: Objective) -> Self {
        Self {
            table,
            objective,
            episodes: 0,
        }
    }

    /// Looks up the action for a bucket without counting an episode.
    pub fn lookup(&self, key: BucketKey) -> (PolicyAction, f64) {
        self.table
            .iter()
            .find(|e| e.key == key)
            .map_or(FALLBACK, |e| (e.action, e.confidence))
    }

    /// Recommends an action for `state` and counts one episode.
    pub fn recommend(&mut self, state: &PolicyState) -> Recommendation {
        self.episodes += 1;
        let key = BucketKey::from_state(state);
        let (action, confidence) = self.lookup(key);
        debug!(%key, %action, confidence, episodes = self.episodes, "policy recommendation");
        Recommendation {
            action,
            confidence,
            key,
            objective: self.objective,
            outlook: Outlook::PLACEHOLDER,
            episodes: self.episodes,
        }
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn set_objective(&mut self, objective: Objective) {
        if objective != self.objective {
            info!(from = %self.objective, to = %objective, "policy objective changed");
        }
        self.objective = objective;
    }

    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn training_progress(&self) -> TrainingProgress {
        TrainingProgress::at(self.episodes)
    }
}
