//! Decision core orchestrator.
//!
//! [`DecisionCore`] owns every piece of mutable site state and runs the
//! pipeline (diagnostics, alerts, policy) once per generated tick or per
//! externally supplied reading. Presentation layers read [`CoreSnapshot`]s
//! and drain [`CoreEvent`]s; they never touch the state directly.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::alerts::{Alert, AlertCode, AlertEngine, Severity};
use crate::diagnostics::{self, CellStatus, HealthLevel, HealthVerdict, SubsystemKind};
use crate::emergency::{
    EMERGENCY_ALERTS, EmergencyController, EmergencyMode, HealthIndices, SiteEconomics, SiteState,
};
use crate::error::CoreError;
use crate::policy::{
    LearningProgress, Objective, PolicyRecommender, PolicyState, Recommendation, TrainingProgress,
};
use crate::sim::generator::{RandomTelemetry, TelemetrySource};
use crate::telemetry::{CELL_COUNT, Reading};

/// Static parameters of a decision core.
///
/// # Examples
///
/// ```
/// use smart_ems::core::CoreSettings;
///
/// let settings = CoreSettings::new(8, 1245, 42);
/// assert_eq!(settings.total_stations, 8);
/// assert!(settings.streaming);
/// ```
#[derive(Debug, Clone)]
pub struct CoreSettings {
    /// Number of EV charging stations on site.
    pub total_stations: u32,
    /// Battery cycle count used for the fixed site states.
    pub cycle_count: u32,
    /// Seed for the policy-state RNG.
    pub seed: u64,
    /// Objective the recommender starts with.
    pub objective: Objective,
    /// Whether generated ticks run from the start.
    pub streaming: bool,
    /// Values applied by [`DecisionCore::inject_fault`] callers that do not
    /// supply their own.
    pub fault: FaultInjection,
}

impl CoreSettings {
    /// Creates settings with the default objective, streaming on and the
    /// default fault values.
    ///
    /// # Panics
    ///
    /// Panics if `total_stations` is zero.
    pub fn new(total_stations: u32, cycle_count: u32, seed: u64) -> Self {
        assert!(total_stations > 0, "total_stations must be > 0");
        Self {
            total_stations,
            cycle_count,
            seed,
            objective: Objective::default(),
            streaming: true,
            fault: FaultInjection::default(),
        }
    }
}

/// Battery fault applied on top of the current reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FaultInjection {
    pub state_of_charge: f64,
    pub temperature: f64,
}

impl Default for FaultInjection {
    fn default() -> Self {
        Self {
            state_of_charge: 15.0,
            temperature: 38.5,
        }
    }
}

/// Where a processed reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingOrigin {
    Generated,
    Feed,
    Fault,
}

impl fmt::Display for ReadingOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ReadingOrigin::Generated => "gen",
            ReadingOrigin::Feed => "feed",
            ReadingOrigin::Fault => "fault",
        })
    }
}

/// Notification published on the event outbox.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    ReadingProcessed { tick: u64, origin: ReadingOrigin },
    AlertRaised { alert: Alert },
    /// Emitted once per new critical alert; consumers play the audible or
    /// visual cue.
    CriticalSignal { code: AlertCode },
    AlertAcknowledged { id: String },
    ModeChanged { mode: EmergencyMode },
    StreamingChanged { streaming: bool },
    ObjectiveChanged { objective: Objective },
}

/// Record of one pipeline pass.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub origin: ReadingOrigin,
    /// When the core processed the reading; `reading.timestamp` is when it
    /// was taken.
    pub processed_at: DateTime<Utc>,
    pub reading: Reading,
    pub battery_health: HealthLevel,
    pub renewable_health: HealthLevel,
    pub safety_health: HealthLevel,
    pub new_alerts: Vec<Alert>,
    pub recommendation: Recommendation,
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.new_alerts.iter().map(|a| a.code.as_str()).collect();
        write!(
            f,
            "t={:>3} [{:<5}] solar={:>5.1} kW  load={:>5.1} kW  SoC={:>5.1}%  \
             bat_temp={:>4.1}C | battery={} renewable={} safety={} | -> {} ({:.0}%)",
            self.tick,
            self.origin,
            self.reading.renewables.solar.output,
            self.reading.grid.load,
            self.reading.battery.state_of_charge,
            self.reading.battery.temperature,
            self.battery_health,
            self.renewable_health,
            self.safety_health,
            self.recommendation.action,
            self.recommendation.confidence * 100.0,
        )?;
        if !codes.is_empty() {
            write!(f, " | new alerts: {}", codes.join(", "))?;
        }
        Ok(())
    }
}

/// Presentation-ready copy of the core state.
#[derive(Debug, Clone, Serialize)]
pub struct CoreSnapshot {
    pub mode: EmergencyMode,
    pub streaming: bool,
    pub ticks: u64,
    pub reading: Reading,
    pub verdicts: Vec<HealthVerdict>,
    pub cell_statuses: [CellStatus; CELL_COUNT],
    pub active_alerts: Vec<Alert>,
    pub alert_history_len: usize,
    pub recommendation: Option<Recommendation>,
    pub objective: Objective,
    pub policy_state: PolicyState,
    pub training: TrainingProgress,
    pub learning: LearningProgress,
    pub health_indices: HealthIndices,
    pub economics: SiteEconomics,
}

impl CoreSnapshot {
    pub fn verdict(&self, kind: SubsystemKind) -> Option<&HealthVerdict> {
        self.verdicts.iter().find(|v| v.subsystem == kind)
    }
}

/// Undrained events kept by the outbox before the oldest are dropped.
pub const MAX_PENDING_EVENTS: usize = 1024;

/// Owns the site state and runs the decision pipeline.
///
/// Generic over the telemetry source so tests can drive it with fixtures.
pub struct DecisionCore<S: TelemetrySource> {
    source: S,
    settings: CoreSettings,
    reading: Reading,
    indices: HealthIndices,
    economics: SiteEconomics,
    policy_state: PolicyState,
    emergency: EmergencyController,
    streaming: bool,
    alerts: AlertEngine,
    recommender: PolicyRecommender,
    verdicts: Vec<HealthVerdict>,
    recommendation: Option<Recommendation>,
    rng: StdRng,
    ticks: u64,
    learning: LearningProgress,
    events: VecDeque<CoreEvent>,
}

impl DecisionCore<RandomTelemetry> {
    /// Creates a core driven by the randomized generator, seeded from
    /// `settings.seed`.
    pub fn with_random_telemetry(settings: CoreSettings) -> Self {
        let source = RandomTelemetry::new(settings.total_stations, settings.cycle_count, settings.seed);
        Self::new(source, settings)
    }
}

impl<S: TelemetrySource> DecisionCore<S> {
    /// Creates a core in normal mode at the nominal baseline.
    ///
    /// The policy RNG is seeded with `settings.seed` offset by one so it
    /// does not mirror a generator built from the same seed.
    pub fn new(source: S, settings: CoreSettings) -> Self {
        let site = SiteState::nominal(settings.total_stations, settings.cycle_count);
        let verdicts = diagnostics::evaluate_all(&site.reading);
        info!(
            source = source.source_type(),
            stations = settings.total_stations,
            seed = settings.seed,
            "decision core ready"
        );
        Self {
            source,
            reading: site.reading,
            indices: site.indices,
            economics: site.economics,
            policy_state: site.policy,
            emergency: EmergencyController::new(),
            streaming: settings.streaming,
            alerts: AlertEngine::new(),
            recommender: PolicyRecommender::new(settings.objective),
            verdicts,
            recommendation: None,
            rng: StdRng::seed_from_u64(settings.seed.wrapping_add(1)),
            ticks: 0,
            learning: LearningProgress::INITIAL,
            events: VecDeque::new(),
            settings,
        }
    }

    /// Runs one generated tick.
    ///
    /// Returns `None` without generating anything while streaming is paused
    /// or emergency mode is active.
    pub fn tick(&mut self) -> Option<TickReport> {
        if !self.streaming {
            debug!("tick skipped: streaming paused");
            return None;
        }
        if self.emergency.mode().is_emergency() {
            debug!("tick skipped: emergency mode");
            return None;
        }
        let reading = self.source.generate();
        let report = self.process(reading, ReadingOrigin::Generated);
        self.learning.advance(&mut self.rng);
        Some(report)
    }

    /// Runs the pipeline on a reading from the cloud feed.
    ///
    /// Feed readings are processed even while streaming is paused.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmergencyActive`] in emergency mode and
    /// [`CoreError::InvalidReading`] if the reading fails validation. The
    /// state is unchanged in both cases.
    pub fn ingest(&mut self, reading: Reading) -> Result<TickReport, CoreError> {
        self.reject_in_emergency("reading ingestion")?;
        if let Err(e) = reading.validate() {
            error!(error = %e, "rejected feed reading");
            return Err(e.into());
        }
        Ok(self.process(reading, ReadingOrigin::Feed))
    }

    /// Parses a JSON feed payload and ingests it.
    ///
    /// # Errors
    ///
    /// Same as [`ingest`](Self::ingest), plus malformed JSON.
    pub fn ingest_json(&mut self, raw: &str) -> Result<TickReport, CoreError> {
        self.reject_in_emergency("reading ingestion")?;
        let reading = Reading::from_json(raw).inspect_err(|e| {
            error!(error = %e, "rejected feed payload");
        })?;
        Ok(self.process(reading, ReadingOrigin::Feed))
    }

    /// Overwrites battery SOC and temperature on the current reading and
    /// runs the pipeline on the result.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmergencyActive`] in emergency mode, and
    /// [`CoreError::InvalidReading`] for non-finite fault values.
    pub fn inject_fault(&mut self, fault: FaultInjection) -> Result<TickReport, CoreError> {
        self.reject_in_emergency("fault injection")?;
        let mut reading = self.reading.clone();
        reading.timestamp = Utc::now();
        reading.battery.state_of_charge = fault.state_of_charge;
        reading.battery.temperature = fault.temperature;
        reading.validate()?;
        info!(
            soc = fault.state_of_charge,
            temperature = fault.temperature,
            "injecting battery fault"
        );
        Ok(self.process(reading, ReadingOrigin::Fault))
    }

    /// Injects the configured default fault.
    ///
    /// # Errors
    ///
    /// See [`inject_fault`](Self::inject_fault).
    pub fn inject_default_fault(&mut self) -> Result<TickReport, CoreError> {
        self.inject_fault(self.settings.fault)
    }

    /// Enters emergency mode: loads the crisis state and raises the four
    /// emergency alerts. Returns the alerts that were appended.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyInEmergency`] if already active.
    pub fn trigger_emergency(&mut self) -> Result<Vec<Alert>, CoreError> {
        self.emergency.trigger().inspect_err(|e| error!(error = %e, "trigger refused"))?;
        self.apply_site(SiteState::crisis(self.settings.total_stations, self.settings.cycle_count));
        self.publish(CoreEvent::ModeChanged {
            mode: EmergencyMode::Emergency,
        });
        let raised = EMERGENCY_ALERTS
            .into_iter()
            .filter_map(|code| self.alerts.raise(Alert::new(code)))
            .collect::<Vec<_>>();
        self.publish_alerts(&raised);
        Ok(raised)
    }

    /// Leaves emergency mode: restores the nominal baseline and appends an
    /// `EMERGENCY_CLEARED` alert. Returns the alerts that were appended.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInEmergency`] in normal mode.
    pub fn clear_emergency(&mut self) -> Result<Vec<Alert>, CoreError> {
        self.emergency.clear().inspect_err(|e| error!(error = %e, "clear refused"))?;
        self.apply_site(SiteState::nominal(self.settings.total_stations, self.settings.cycle_count));
        self.publish(CoreEvent::ModeChanged {
            mode: EmergencyMode::Normal,
        });
        let raised: Vec<Alert> = self
            .alerts
            .raise(Alert::new(AlertCode::EmergencyCleared))
            .into_iter()
            .collect();
        self.publish_alerts(&raised);
        Ok(raised)
    }

    /// Flips streaming and returns the new value.
    pub fn toggle_streaming(&mut self) -> bool {
        self.set_streaming(!self.streaming);
        self.streaming
    }

    pub fn set_streaming(&mut self, streaming: bool) {
        if streaming != self.streaming {
            info!(streaming, "streaming toggled");
            self.streaming = streaming;
            self.publish(CoreEvent::StreamingChanged { streaming });
        }
    }

    pub fn set_objective(&mut self, objective: Objective) {
        if objective != self.recommender.objective() {
            self.recommender.set_objective(objective);
            self.publish(CoreEvent::ObjectiveChanged { objective });
        }
    }

    /// # Errors
    ///
    /// Returns [`CoreError::UnknownAlert`] if no alert has this id.
    pub fn acknowledge_alert(&mut self, id: &str) -> Result<(), CoreError> {
        self.alerts.acknowledge(id)?;
        self.publish(CoreEvent::AlertAcknowledged { id: id.to_string() });
        Ok(())
    }

    /// Acknowledges every active alert and returns how many changed.
    pub fn acknowledge_all_alerts(&mut self) -> usize {
        let ids: Vec<String> = self.alerts.active().iter().map(|a| a.id.clone()).collect();
        let count = self.alerts.acknowledge_all();
        for id in ids {
            self.publish(CoreEvent::AlertAcknowledged { id });
        }
        count
    }

    pub fn snapshot(&self) -> CoreSnapshot {
        CoreSnapshot {
            mode: self.emergency.mode(),
            streaming: self.streaming,
            ticks: self.ticks,
            reading: self.reading.clone(),
            verdicts: self.verdicts.clone(),
            cell_statuses: diagnostics::cell_statuses(&self.reading.battery.cell_voltages),
            active_alerts: self.alerts.active().into_iter().cloned().collect(),
            alert_history_len: self.alerts.history().len(),
            recommendation: self.recommendation.clone(),
            objective: self.recommender.objective(),
            policy_state: self.policy_state,
            training: self.recommender.training_progress(),
            learning: self.learning,
            health_indices: self.indices,
            economics: self.economics,
        }
    }

    /// Takes every event published since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        self.events.drain(..).collect()
    }

    pub fn mode(&self) -> EmergencyMode {
        self.emergency.mode()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    pub fn health_indices(&self) -> HealthIndices {
        self.indices
    }

    pub fn economics(&self) -> SiteEconomics {
        self.economics
    }

    pub fn learning(&self) -> LearningProgress {
        self.learning
    }

    pub fn policy_state(&self) -> PolicyState {
        self.policy_state
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        self.recommendation.as_ref()
    }

    pub fn objective(&self) -> Objective {
        self.recommender.objective()
    }

    /// Number of readings processed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    fn reject_in_emergency(&self, operation: &'static str) -> Result<(), CoreError> {
        if self.emergency.mode().is_emergency() {
            error!(operation, "rejected during emergency");
            return Err(CoreError::EmergencyActive(operation));
        }
        Ok(())
    }

    fn process(&mut self, reading: Reading, origin: ReadingOrigin) -> TickReport {
        self.ticks += 1;
        let verdicts = diagnostics::evaluate_all(&reading);
        let find = |kind: SubsystemKind| verdicts.iter().find(|v| v.subsystem == kind);
        let level = |kind: SubsystemKind| find(kind).map_or(HealthLevel::Unknown, |v| v.health);
        let battery_health = level(SubsystemKind::Battery);
        let renewable_health = level(SubsystemKind::Renewable);
        let safety_health = level(SubsystemKind::Safety);

        if let (Some(battery), Some(renewable)) =
            (find(SubsystemKind::Battery), find(SubsystemKind::Renewable))
        {
            self.indices
                .refresh(reading.renewables.solar.output, battery, renewable);
        }

        let new_alerts = self.alerts.check(&reading);
        self.policy_state = PolicyState::from_reading(&reading, &mut self.rng);
        let recommendation = self.recommender.recommend(&self.policy_state);

        debug!(
            tick = self.ticks,
            %origin,
            battery = %battery_health,
            renewable = %renewable_health,
            new_alerts = new_alerts.len(),
            action = %recommendation.action,
            "reading processed"
        );

        self.publish(CoreEvent::ReadingProcessed {
            tick: self.ticks,
            origin,
        });
        self.publish_alerts(&new_alerts);

        self.verdicts = verdicts;
        self.recommendation = Some(recommendation.clone());
        self.reading = reading.clone();

        TickReport {
            tick: self.ticks,
            origin,
            processed_at: Utc::now(),
            reading,
            battery_health,
            renewable_health,
            safety_health,
            new_alerts,
            recommendation,
        }
    }

    /// Overwrites the site state and re-derives verdicts and the
    /// recommendation from it.
    fn apply_site(&mut self, site: SiteState) {
        self.verdicts = diagnostics::evaluate_all(&site.reading);
        self.reading = site.reading;
        self.indices = site.indices;
        self.economics = site.economics;
        self.policy_state = site.policy;
        self.recommendation = Some(self.recommender.recommend(&self.policy_state));
    }

    /// Queues an event, evicting the oldest once the outbox is full.
    fn publish(&mut self, event: CoreEvent) {
        if self.events.len() == MAX_PENDING_EVENTS {
            if let Some(dropped) = self.events.pop_front() {
                debug!(?dropped, "event outbox full, dropping oldest");
            }
        }
        self.events.push_back(event);
    }

    fn publish_alerts(&mut self, alerts: &[Alert]) {
        for alert in alerts {
            self.publish(CoreEvent::AlertRaised {
                alert: alert.clone(),
            });
            if alert.severity == Severity::Critical {
                self.publish(CoreEvent::CriticalSignal { code: alert.code });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emergency::{self, crisis_reading, nominal_reading};
    use crate::policy::PolicyAction;
    use crate::sim::generator::FixtureTelemetry;

    fn fixture_core(readings: Vec<Reading>) -> DecisionCore<FixtureTelemetry> {
        DecisionCore::new(FixtureTelemetry::new(readings), CoreSettings::new(8, 1245, 42))
    }

    fn faulted() -> Reading {
        let mut r = nominal_reading(8, 1245);
        r.battery.state_of_charge = 15.0;
        r.battery.temperature = 38.5;
        r
    }

    fn without_timestamp(mut r: Reading) -> Reading {
        r.timestamp = DateTime::<Utc>::UNIX_EPOCH;
        r
    }

    #[test]
    fn starts_at_nominal_baseline() {
        let core = fixture_core(vec![nominal_reading(8, 1245)]);
        let snap = core.snapshot();
        assert_eq!(snap.mode, EmergencyMode::Normal);
        assert!(snap.streaming);
        assert_eq!(snap.health_indices, HealthIndices::NOMINAL);
        assert_eq!(snap.economics, SiteEconomics::NOMINAL);
        assert!(snap.active_alerts.is_empty());
        assert!(snap.recommendation.is_none());
        assert_eq!(snap.verdicts.len(), 5);
    }

    #[test]
    fn tick_runs_the_pipeline() {
        let mut core = fixture_core(vec![faulted()]);
        let report = core.tick().expect("streaming tick");
        assert_eq!(report.tick, 1);
        assert_eq!(report.battery_health, HealthLevel::Critical);
        let codes: Vec<_> = report.new_alerts.iter().map(|a| a.code).collect();
        assert_eq!(codes, vec![AlertCode::BatteryCriticalSoc, AlertCode::BatteryOverheat]);
        assert_eq!(core.health_indices().bms, 35.0);
        assert!(core.recommendation().is_some());
    }

    #[test]
    fn paused_tick_is_a_no_op() {
        let mut core = fixture_core(vec![faulted()]);
        assert!(!core.toggle_streaming());
        assert!(core.tick().is_none());
        assert_eq!(core.ticks(), 0);
        assert!(core.alerts().alerts().is_empty());
    }

    #[test]
    fn feed_ingest_works_while_paused() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        core.set_streaming(false);
        let report = core.ingest(faulted()).expect("valid reading");
        assert_eq!(report.origin, ReadingOrigin::Feed);
        assert_eq!(core.alerts().active_count(), 2);
    }

    #[test]
    fn invalid_feed_reading_leaves_state_unchanged() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        let mut bad = nominal_reading(8, 1245);
        bad.ev.available_stations = 7;
        assert!(matches!(core.ingest(bad), Err(CoreError::InvalidReading(_))));
        assert!(matches!(
            core.ingest_json("{\"renewables\": 1}"),
            Err(CoreError::InvalidReading(_))
        ));
        assert_eq!(core.ticks(), 0);
        assert!(core.drain_events().is_empty());
    }

    #[test]
    fn ingest_json_accepts_serialized_reading() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        let raw = serde_json::to_string(&faulted()).expect("serializes");
        let report = core.ingest_json(&raw).expect("valid payload");
        assert_eq!(report.reading.battery.state_of_charge, 15.0);
    }

    #[test]
    fn repeated_fault_keeps_one_active_soc_alert() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        core.inject_default_fault().expect("fault applies");
        let second = core.inject_default_fault().expect("fault applies");
        assert!(second.new_alerts.is_empty());
        let soc_alerts = core
            .alerts()
            .active()
            .into_iter()
            .filter(|a| a.code == AlertCode::BatteryCriticalSoc)
            .count();
        assert_eq!(soc_alerts, 1);
    }

    #[test]
    fn fault_bucket_ignores_battery_fields() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        let report = core.inject_default_fault().expect("fault applies");
        assert_eq!(report.reading.battery.state_of_charge, 15.0);
        assert_eq!(report.reading.battery.temperature, 38.5);
        assert_eq!(report.reading.fire.temperature, 23.5);
        // demand 45 and solar 65 from the nominal reading
        let key = report.recommendation.key.to_string();
        assert!(key.starts_with("low_demand_high_solar_"), "{key}");
    }

    #[test]
    fn trigger_loads_crisis_state_and_alerts() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        let raised = core.trigger_emergency().expect("trigger");
        assert_eq!(raised.len(), 4);
        assert!(raised.iter().all(|a| a.severity == Severity::Critical));

        let snap = core.snapshot();
        assert_eq!(snap.mode, EmergencyMode::Emergency);
        assert_eq!(snap.health_indices, HealthIndices::CRISIS);
        assert_eq!(snap.economics, SiteEconomics::CRISIS);
        assert_eq!(
            without_timestamp(snap.reading),
            without_timestamp(crisis_reading(8, 1245))
        );
        assert_eq!(snap.policy_state.electricity_price, 0.45);
        let rec = snap.recommendation.expect("recommendation after trigger");
        assert_eq!(rec.action, PolicyAction::LoadShedNonCritical);

        let events = core.drain_events();
        let signals = events
            .iter()
            .filter(|e| matches!(e, CoreEvent::CriticalSignal { .. }))
            .count();
        assert_eq!(signals, 4);
        assert!(events.contains(&CoreEvent::ModeChanged {
            mode: EmergencyMode::Emergency
        }));
    }

    #[test]
    fn emergency_blocks_generation_and_input() {
        let mut core = fixture_core(vec![faulted()]);
        core.trigger_emergency().expect("trigger");
        assert!(core.tick().is_none());
        assert!(matches!(
            core.ingest(nominal_reading(8, 1245)),
            Err(CoreError::EmergencyActive(_))
        ));
        assert!(matches!(
            core.inject_default_fault(),
            Err(CoreError::EmergencyActive(_))
        ));
        assert!(matches!(
            core.trigger_emergency(),
            Err(CoreError::AlreadyInEmergency)
        ));
    }

    #[test]
    fn trigger_then_clear_restores_baseline() {
        let mut core = fixture_core(vec![faulted()]);
        core.tick().expect("tick");
        core.trigger_emergency().expect("trigger");
        let cleared = core.clear_emergency().expect("clear");
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared[0].code, AlertCode::EmergencyCleared);
        assert_eq!(cleared[0].severity, Severity::Info);

        let baseline = emergency::SiteState::nominal(8, 1245);
        assert_eq!(core.mode(), EmergencyMode::Normal);
        assert_eq!(without_timestamp(core.reading().clone()), without_timestamp(baseline.reading));
        assert_eq!(core.health_indices(), baseline.indices);
        assert_eq!(core.economics(), baseline.economics);
        assert_eq!(core.policy_state(), baseline.policy);
    }

    #[test]
    fn clear_while_normal_is_rejected() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        assert!(matches!(core.clear_emergency(), Err(CoreError::NotInEmergency)));
        assert!(core.alerts().alerts().is_empty());
    }

    #[test]
    fn acknowledge_through_core() {
        let mut core = fixture_core(vec![faulted()]);
        let report = core.tick().expect("tick");
        let id = report.new_alerts[0].id.clone();
        core.acknowledge_alert(&id).expect("known id");
        assert_eq!(core.alerts().active_count(), 1);
        assert!(matches!(
            core.acknowledge_alert("nope"),
            Err(CoreError::UnknownAlert(_))
        ));
        assert_eq!(core.acknowledge_all_alerts(), 1);
        assert_eq!(core.snapshot().active_alerts.len(), 0);
    }

    #[test]
    fn objective_change_is_published_once() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        core.set_objective(Objective::Reliability);
        core.set_objective(Objective::Reliability);
        let events = core.drain_events();
        assert_eq!(
            events,
            vec![CoreEvent::ObjectiveChanged {
                objective: Objective::Reliability
            }]
        );
        let report = core.tick().expect("tick");
        assert_eq!(report.recommendation.objective, Objective::Reliability);
    }

    #[test]
    fn drain_empties_the_outbox() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        core.tick().expect("tick");
        assert!(!core.drain_events().is_empty());
        assert!(core.drain_events().is_empty());
    }

    #[test]
    fn outbox_drops_oldest_when_full() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        for _ in 0..(MAX_PENDING_EVENTS + 500) {
            core.tick().expect("tick");
        }
        let events = core.drain_events();
        assert_eq!(events.len(), MAX_PENDING_EVENTS);
        let newest = MAX_PENDING_EVENTS as u64 + 500;
        assert_eq!(
            events.first(),
            Some(&CoreEvent::ReadingProcessed {
                tick: newest - MAX_PENDING_EVENTS as u64 + 1,
                origin: ReadingOrigin::Generated,
            })
        );
        assert_eq!(
            events.last(),
            Some(&CoreEvent::ReadingProcessed {
                tick: newest,
                origin: ReadingOrigin::Generated,
            })
        );
    }

    #[test]
    fn learning_gauges_only_climb_on_generated_ticks() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        assert_eq!(core.learning(), LearningProgress::INITIAL);

        core.ingest(nominal_reading(8, 1245)).expect("valid reading");
        core.inject_default_fault().expect("fault applies");
        assert_eq!(core.learning(), LearningProgress::INITIAL);

        let mut previous = core.learning();
        for _ in 0..400 {
            core.tick().expect("tick");
            let now = core.learning();
            for (before, after) in [
                (previous.temperature_patterns, now.temperature_patterns),
                (previous.occupancy_learning, now.occupancy_learning),
                (previous.energy_correlation, now.energy_correlation),
                (previous.predictive_accuracy, now.predictive_accuracy),
            ] {
                assert!(after >= before);
                assert!(after <= 100.0);
            }
            previous = now;
        }
        assert_eq!(previous.energy_correlation, 100.0);

        core.trigger_emergency().expect("trigger");
        assert_eq!(core.learning(), previous);
        core.clear_emergency().expect("clear");
        assert_eq!(core.snapshot().learning, previous);
    }

    #[test]
    fn report_carries_processing_time() {
        let mut core = fixture_core(vec![nominal_reading(8, 1245)]);
        let before = Utc::now();
        let report = core
            .ingest(without_timestamp(nominal_reading(8, 1245)))
            .expect("valid reading");
        assert_eq!(report.reading.timestamp, DateTime::<Utc>::UNIX_EPOCH);
        assert!(report.processed_at >= before);
        assert_ne!(report.processed_at, report.reading.timestamp);
    }

    #[test]
    fn seeded_random_cores_agree() {
        let mut a = DecisionCore::with_random_telemetry(CoreSettings::new(8, 1245, 9));
        let mut b = DecisionCore::with_random_telemetry(CoreSettings::new(8, 1245, 9));
        for _ in 0..5 {
            let ra = a.tick().expect("tick");
            let rb = b.tick().expect("tick");
            assert_eq!(without_timestamp(ra.reading), without_timestamp(rb.reading));
            assert_eq!(ra.recommendation.key, rb.recommendation.key);
        }
    }

    #[test]
    fn report_display_lists_new_alerts() {
        let mut core = fixture_core(vec![faulted()]);
        let line = core.tick().expect("tick").to_string();
        assert!(line.contains("battery=critical"), "{line}");
        assert!(line.contains("BATTERY_CRITICAL_SOC"), "{line}");
    }
}
