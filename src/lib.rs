//! SmartEMS decision core for a renewable microgrid site.
//!
//! Telemetry flows from a [`sim::generator::TelemetrySource`] (or an external
//! feed) through rule-based [`diagnostics`], the [`alerts`] engine and the
//! [`policy`] recommender. [`core::DecisionCore`] owns all site state;
//! the CLI, terminal dashboard and REST API only drive it.

pub mod alerts;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod emergency;
pub mod error;
pub mod io;
pub mod logging;
pub mod policy;
/// Tick clock and telemetry sources.
pub mod sim;
pub mod telemetry;

#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "tui")]
pub mod tui;
