// src/handlers/dashboard.rs

use axum::{extract::State, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{ferme::FermeScope, i18n::Locale},
    models::dashboard::DashboardSummary,
};

// GET /api/dashboard/summary
pub async fn get_dashboard_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: FermeScope,
) -> Result<Json<DashboardSummary>, ApiError> {
    let summary = app_state
        .dashboard_service
        .get_summary(&scope)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(summary))
}
