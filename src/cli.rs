//! Command-line arguments and config resolution for the binary.

use std::path::{Path, PathBuf};

use clap::Parser;

use smart_ems::config::{ConfigError, EmsConfig};
use smart_ems::policy::Objective;

#[derive(Parser, Debug)]
#[command(
    name = "smart-ems",
    version,
    about = "SmartEMS decision core: diagnostics, alerts and policy recommendations for a microgrid site"
)]
pub struct Cli {
    /// Load site configuration from a TOML file
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (baseline, aging_fleet, large_site)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the number of generated ticks in a headless run
    #[arg(long)]
    pub ticks: Option<usize>,

    /// Override the policy objective (cost, emission, reliability, balanced)
    #[arg(long)]
    pub objective: Option<Objective>,

    /// Ingest a feed reading first: inline JSON or a path to a JSON file
    #[arg(long, value_name = "JSON|PATH")]
    pub reading: Option<String>,

    /// Apply the configured battery fault before the run
    #[arg(long)]
    pub inject_fault: bool,

    /// Trigger emergency mode before the run
    #[arg(long)]
    pub emergency: bool,

    /// Export tick reports to CSV
    #[arg(long, value_name = "PATH")]
    pub telemetry_out: Option<PathBuf>,

    /// Launch the live terminal dashboard
    #[cfg(feature = "tui")]
    #[arg(long, conflicts_with_all = ["reading", "inject_fault", "emergency", "telemetry_out"])]
    pub tui: bool,

    /// Start the REST API server after the headless run
    #[cfg(feature = "api")]
    #[arg(long)]
    pub serve: bool,

    /// API server port
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000)]
    pub port: u16,
}

impl Cli {
    /// Whether the dashboard owns the terminal.
    pub fn interactive(&self) -> bool {
        #[cfg(feature = "tui")]
        {
            self.tui
        }
        #[cfg(not(feature = "tui"))]
        {
            false
        }
    }

    /// Resolves the configuration and its display name, then applies the
    /// command-line overrides.
    ///
    /// `--scenario` takes priority, then `--preset`, then the baseline.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be loaded or the preset is
    /// unknown.
    pub fn resolve_config(&self) -> Result<(EmsConfig, String), ConfigError> {
        let (mut config, name) = match (&self.scenario, &self.preset) {
            (Some(path), _) => (EmsConfig::from_toml_file(path)?, scenario_name(path)),
            (None, Some(preset)) => (EmsConfig::from_preset(preset)?, preset.clone()),
            (None, None) => (EmsConfig::baseline(), "baseline".to_string()),
        };

        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
        }
        if let Some(ticks) = self.ticks {
            config.simulation.ticks = ticks;
        }
        if let Some(objective) = self.objective {
            config.policy.objective = objective;
        }
        Ok((config, name))
    }
}

fn scenario_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "scenario".to_string(), |s| s.to_string_lossy().into_owned())
}

/// Returns the raw JSON for `--reading`: the value itself when it looks like
/// an object, otherwise the contents of the named file.
///
/// # Errors
///
/// Returns an `io::Error` if the file cannot be read.
pub fn reading_json(value: &str) -> std::io::Result<String> {
    if value.trim_start().starts_with('{') {
        Ok(value.to_string())
    } else {
        std::fs::read_to_string(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("smart-ems").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_to_baseline() {
        let cli = parse(&[]).unwrap();
        let (config, name) = cli.resolve_config().unwrap();
        assert_eq!(name, "baseline");
        assert_eq!(config.simulation.ticks, 20);
        assert!(!cli.inject_fault);
        assert!(!cli.emergency);
    }

    #[test]
    fn preset_and_overrides() {
        let cli = parse(&[
            "--preset",
            "large_site",
            "--seed",
            "7",
            "--ticks",
            "5",
            "--objective",
            "Reliability",
        ])
        .unwrap();
        let (config, name) = cli.resolve_config().unwrap();
        assert_eq!(name, "large_site");
        assert_eq!(config.site.total_stations, 16);
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.simulation.ticks, 5);
        assert_eq!(config.policy.objective, Objective::Reliability);
    }

    #[test]
    fn scenario_and_preset_conflict() {
        assert!(parse(&["--scenario", "site.toml", "--preset", "baseline"]).is_err());
    }

    #[test]
    fn unknown_objective_is_rejected() {
        assert!(parse(&["--objective", "speed"]).is_err());
    }

    #[test]
    fn unknown_preset_fails_resolution() {
        let cli = parse(&["--preset", "nope"]).unwrap();
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn bad_seed_is_rejected() {
        assert!(parse(&["--seed", "abc"]).is_err());
    }

    #[test]
    fn scenario_name_comes_from_file_stem() {
        assert_eq!(scenario_name(Path::new("configs/aging.toml")), "aging");
    }

    #[test]
    fn inline_reading_is_returned_verbatim() {
        let raw = r#"{"battery": {}}"#;
        assert_eq!(reading_json(raw).unwrap(), raw);
    }

    #[test]
    fn missing_reading_file_is_an_error() {
        assert!(reading_json("/nonexistent/reading.json").is_err());
    }
}
