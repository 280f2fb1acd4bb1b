//! SmartEMS entry point: CLI wiring, headless runs, dashboard and API.

mod cli;

use std::process;

use clap::Parser;
use tracing::info;

use smart_ems::core::{DecisionCore, TickReport};
use smart_ems::io::export::export_csv;
use smart_ems::logging::init_tracing;
use smart_ems::sim::clock::Clock;
use smart_ems::sim::generator::TelemetrySource;

use cli::Cli;

/// Runs the optional pre-steps and the generated ticks, printing one line per
/// report.
fn run_headless<S: TelemetrySource>(
    core: &mut DecisionCore<S>,
    cli: &Cli,
    ticks: usize,
) -> Result<Vec<TickReport>, String> {
    let mut reports = Vec::new();

    if let Some(ref value) = cli.reading {
        let raw = cli::reading_json(value).map_err(|e| format!("failed to read {value}: {e}"))?;
        let report = core.ingest_json(&raw).map_err(|e| e.to_string())?;
        println!("{report}");
        reports.push(report);
    }

    if cli.inject_fault {
        let report = core.inject_default_fault().map_err(|e| e.to_string())?;
        println!("{report}");
        reports.push(report);
    }

    if cli.emergency {
        for alert in core.trigger_emergency().map_err(|e| e.to_string())? {
            println!("{alert}");
        }
    }

    Clock::new(ticks).run(|_| {
        if let Some(report) = core.tick() {
            println!("{report}");
            reports.push(report);
        }
    });

    Ok(reports)
}

fn print_summary<S: TelemetrySource>(core: &DecisionCore<S>) {
    let snapshot = core.snapshot();
    println!();
    println!(
        "mode={}  ticks={}  objective={}",
        snapshot.mode, snapshot.ticks, snapshot.objective
    );
    println!(
        "alerts: {} active, {} raised",
        snapshot.active_alerts.len(),
        snapshot.alert_history_len
    );
    for alert in &snapshot.active_alerts {
        println!("  {alert}");
    }
    if let Some(rec) = &snapshot.recommendation {
        println!("recommendation: {rec}");
    }
    println!(
        "training: {} episodes, {:.1}% converged, exploration {:.2}",
        snapshot.training.episodes, snapshot.training.convergence, snapshot.training.exploration_rate
    );
}

fn finish<S: TelemetrySource>(core: &DecisionCore<S>, cli: &Cli, reports: &[TickReport]) {
    print_summary(core);

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(reports, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {}", path.display());
    }
}

fn main() {
    let cli = Cli::parse();

    let (config, name) = cli.resolve_config().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    init_tracing(&config.logging, cli.interactive());
    info!(config = %name, seed = config.simulation.seed, "starting smart-ems");

    #[cfg(feature = "tui")]
    if cli.tui {
        if let Err(e) = smart_ems::tui::run(config, &name) {
            eprintln!("error: TUI crashed: {e}");
            process::exit(1);
        }
        return;
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;
        use std::time::Duration;

        use smart_ems::api::{AppState, BoxedSource};
        use smart_ems::sim::generator::RandomTelemetry;

        let settings = config.core_settings();
        let source: BoxedSource = Box::new(RandomTelemetry::new(
            settings.total_stations,
            settings.cycle_count,
            settings.seed,
        ));
        let mut core = DecisionCore::new(source, settings);
        let reports = run_headless(&mut core, &cli, config.simulation.ticks).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(1);
        });
        finish(&core, &cli, &reports);

        let state = Arc::new(AppState::new(core));
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let period = Duration::from_millis(config.simulation.tick_interval_ms);
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(smart_ems::api::serve(state, addr, period)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
        return;
    }

    let mut core = DecisionCore::with_random_telemetry(config.core_settings());
    let reports = run_headless(&mut core, &cli, config.simulation.ticks).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });
    finish(&core, &cli, &reports);
}
