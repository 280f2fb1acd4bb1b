//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::AppState;
use super::types::{
    AlertsResponse, ApiError, ModeResponse, ObjectiveRequest, ObjectiveResponse,
    StreamingResponse,
};
use crate::core::{CoreEvent, CoreSnapshot, FaultInjection, TickReport};
use crate::policy::Objective;

/// `GET /state` → 200 + `CoreSnapshot` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Result<Json<CoreSnapshot>, ApiError> {
    Ok(Json(state.lock()?.snapshot()))
}

/// `GET /alerts` → 200 + `AlertsResponse` JSON
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let core = state.lock()?;
    let alerts = core.alerts();
    Ok(Json(AlertsResponse {
        active: alerts.active().into_iter().cloned().collect(),
        history: alerts.history().to_vec(),
    }))
}

/// `GET /events` → 200 + events published since the last drain
pub async fn drain_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CoreEvent>>, ApiError> {
    Ok(Json(state.lock()?.drain_events()))
}

/// Ingests a cloud-feed reading.
///
/// `POST /readings` → 200 + `TickReport`
/// Malformed or invalid reading → 400, emergency active → 409
pub async fn post_reading(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<TickReport>, ApiError> {
    let report = state.lock()?.ingest_json(&body)?;
    Ok(Json(report))
}

/// `POST /control/streaming` → 200 + new streaming flag
pub async fn toggle_streaming(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StreamingResponse>, ApiError> {
    let streaming = state.lock()?.toggle_streaming();
    Ok(Json(StreamingResponse { streaming }))
}

/// `POST /control/emergency` → 200, or 409 if already active
pub async fn trigger_emergency(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModeResponse>, ApiError> {
    let mut core = state.lock()?;
    let alerts = core.trigger_emergency()?;
    Ok(Json(ModeResponse {
        mode: core.mode(),
        alerts,
    }))
}

/// `POST /control/emergency/clear` → 200, or 409 if not active
pub async fn clear_emergency(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModeResponse>, ApiError> {
    let mut core = state.lock()?;
    let alerts = core.clear_emergency()?;
    Ok(Json(ModeResponse {
        mode: core.mode(),
        alerts,
    }))
}

/// Applies a battery fault. An empty body uses the configured default.
///
/// `POST /control/fault` → 200 + `TickReport`
pub async fn inject_fault(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TickReport>, ApiError> {
    let mut core = state.lock()?;
    let fault = if body.iter().all(u8::is_ascii_whitespace) {
        core.settings().fault
    } else {
        serde_json::from_slice::<FaultInjection>(&body)
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid fault: {e}")))?
    };
    Ok(Json(core.inject_fault(fault)?))
}

/// `POST /control/objective` → 200, or 400 for an unknown objective
pub async fn set_objective(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ObjectiveRequest>,
) -> Result<Json<ObjectiveResponse>, ApiError> {
    let objective: Objective = req.objective.parse()?;
    state.lock()?.set_objective(objective);
    Ok(Json(ObjectiveResponse { objective }))
}

/// `POST /alerts/{id}/ack` → 204, or 404 for an unknown id
pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.lock()?.acknowledge_alert(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::{BoxedSource, router};
    use crate::core::{CoreSettings, DecisionCore};
    use crate::emergency::nominal_reading;
    use crate::sim::generator::FixtureTelemetry;

    fn make_test_state() -> Arc<AppState> {
        let source: BoxedSource = Box::new(FixtureTelemetry::new(vec![nominal_reading(8, 1245)]));
        Arc::new(AppState::new(DecisionCore::new(
            source,
            CoreSettings::new(8, 1245, 42),
        )))
    }

    async fn send(
        state: &Arc<AppState>,
        method: &str,
        uri: &str,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = router(Arc::clone(state)).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn state_returns_200() {
        let state = make_test_state();
        let (status, json) = send(&state, "GET", "/state", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["mode"], "normal");
        assert_eq!(json["streaming"], true);
        assert!(json.get("health_indices").is_some());
        assert_eq!(json["verdicts"].as_array().map(Vec::len), Some(5));
        assert_eq!(json["learning"]["predictive_accuracy"], 91.0);
        assert_eq!(json["economics"]["patterns_identified"], 12);
    }

    #[tokio::test]
    async fn feed_reading_raises_alerts() {
        let state = make_test_state();
        let mut reading = nominal_reading(8, 1245);
        reading.battery.state_of_charge = 15.0;
        reading.battery.temperature = 38.5;
        let body = serde_json::to_string(&reading).unwrap();

        let (status, json) = send(&state, "POST", "/readings", &body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["battery_health"], "critical");
        assert_eq!(json["new_alerts"].as_array().map(Vec::len), Some(2));

        let (_, alerts) = send(&state, "GET", "/alerts", "").await;
        assert_eq!(alerts["active"].as_array().map(Vec::len), Some(2));
        assert_eq!(alerts["history"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn malformed_reading_returns_400() {
        let state = make_test_state();
        let (status, json) = send(&state, "POST", "/readings", "{\"grid\": {}}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn emergency_round_trip() {
        let state = make_test_state();
        let (status, json) = send(&state, "POST", "/control/emergency", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["mode"], "emergency");
        assert_eq!(json["alerts"].as_array().map(Vec::len), Some(4));

        let (status, _) = send(&state, "POST", "/control/emergency", "").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&state, "POST", "/control/fault", "").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = send(&state, "POST", "/control/emergency/clear", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["mode"], "normal");
        assert_eq!(json["alerts"][0]["code"], "EMERGENCY_CLEARED");

        let (status, _) = send(&state, "POST", "/control/emergency/clear", "").await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn fault_uses_defaults_or_body() {
        let state = make_test_state();
        let (status, json) = send(&state, "POST", "/control/fault", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["reading"]["battery"]["state_of_charge"], 15.0);

        let (status, json) = send(
            &state,
            "POST",
            "/control/fault",
            r#"{"state_of_charge": 10.0, "temperature": 50.0}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["reading"]["battery"]["temperature"], 50.0);

        let (status, _) = send(&state, "POST", "/control/fault", "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn objective_and_streaming_controls() {
        let state = make_test_state();
        let (status, json) = send(
            &state,
            "POST",
            "/control/objective",
            r#"{"objective": "emission"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["objective"], "emission");

        let (status, _) = send(
            &state,
            "POST",
            "/control/objective",
            r#"{"objective": "speed"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, json) = send(&state, "POST", "/control/streaming", "").await;
        assert_eq!(json["streaming"], false);

        let (_, events) = send(&state, "GET", "/events", "").await;
        let kinds: Vec<&str> = events
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["type"].as_str())
            .collect();
        assert_eq!(kinds, vec!["objective_changed", "streaming_changed"]);
    }

    #[tokio::test]
    async fn acknowledge_known_and_unknown_ids() {
        let state = make_test_state();
        let (_, json) = send(&state, "POST", "/control/fault", "").await;
        let id = json["new_alerts"][0]["id"].as_str().unwrap().to_string();

        let (status, _) = send(&state, "POST", &format!("/alerts/{id}/ack"), "").await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, json) = send(&state, "POST", "/alerts/alert_missing/ack", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json.get("error").is_some());
    }
}
