//! REST API over a live decision core.
//!
//! Read endpoints:
//! - `GET /state` returns a [`CoreSnapshot`](crate::core::CoreSnapshot)
//! - `GET /alerts` returns active alerts and the history
//! - `GET /events` drains the event outbox
//!
//! Control and feed endpoints:
//! - `POST /readings` ingests a cloud-feed reading (JSON body)
//! - `POST /control/streaming` toggles streaming
//! - `POST /control/emergency`, `POST /control/emergency/clear`
//! - `POST /control/fault` with an optional fault body
//! - `POST /control/objective` with `{"objective": "..."}`
//! - `POST /alerts/{id}/ack`

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tracing::{debug, info, warn};

use crate::core::DecisionCore;
use crate::sim::generator::TelemetrySource;

pub use types::{ApiError, ErrorResponse};

/// Telemetry source type held by the API core.
pub type BoxedSource = Box<dyn TelemetrySource + Send>;

/// Application state shared across all request handlers and the ticker.
///
/// Every mutation runs to completion under the mutex.
pub struct AppState {
    core: Mutex<DecisionCore<BoxedSource>>,
}

impl AppState {
    pub fn new(core: DecisionCore<BoxedSource>) -> Self {
        Self {
            core: Mutex::new(core),
        }
    }

    /// Locks the core.
    ///
    /// # Errors
    ///
    /// Returns a 500 `ApiError` if a previous holder panicked.
    pub fn lock(&self) -> Result<MutexGuard<'_, DecisionCore<BoxedSource>>, ApiError> {
        self.core
            .lock()
            .map_err(|_| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "core state poisoned"))
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/alerts", get(handlers::get_alerts))
        .route("/events", get(handlers::drain_events))
        .route("/readings", post(handlers::post_reading))
        .route("/control/streaming", post(handlers::toggle_streaming))
        .route("/control/emergency", post(handlers::trigger_emergency))
        .route("/control/emergency/clear", post(handlers::clear_emergency))
        .route("/control/fault", post(handlers::inject_fault))
        .route("/control/objective", post(handlers::set_objective))
        .route("/alerts/{id}/ack", post(handlers::acknowledge_alert))
        .with_state(state)
}

/// Drives generated ticks at a fixed period until the task is dropped.
pub async fn run_ticker(state: Arc<AppState>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // the first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        match state.lock() {
            Ok(mut core) => {
                if let Some(report) = core.tick() {
                    debug!(tick = report.tick, "ticker advanced");
                }
            }
            Err(e) => {
                warn!(error = %e.message, "ticker stopped");
                return;
            }
        }
    }
}

/// Binds to the given address, starts the ticker and serves the API.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr, tick_period: Duration) -> std::io::Result<()> {
    let app = router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, period_ms = tick_period.as_millis() as u64, "API server listening");
    let ticker = tokio::spawn(run_ticker(state, tick_period));
    let result = axum::serve(listener, app).await;
    ticker.abort();
    result
}
