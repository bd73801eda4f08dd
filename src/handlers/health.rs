// src/handlers/health.rs

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{config::AppState, resilience::CircuitState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub circuit: CircuitState,
    pub failure_count: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// GET /api/health (public): probes the sentinel document through the breaker
pub async fn health(State(app_state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let probe = app_state.store.probe().await;
    let breaker = app_state.store.breaker();

    let (code, status, error) = match probe {
        Ok(()) => (StatusCode::OK, "ok", None),
        Err(e) => {
            tracing::warn!(error = %e, "Health probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable", Some(e.to_string()))
        }
    };

    let response = HealthResponse {
        status,
        circuit: breaker.state().await,
        failure_count: breaker.failure_count().await,
        error,
    };
    (code, Json(response))
}
