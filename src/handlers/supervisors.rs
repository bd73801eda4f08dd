// src/handlers/supervisors.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminRole, RequireRole},
    },
    models::supervisor::{CreateSupervisorPayload, Supervisor, UpdateSupervisorPayload},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorQuery {
    #[serde(default)]
    pub only_active: bool,
}

pub async fn list_supervisors(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Query(query): Query<SupervisorQuery>,
) -> Result<Json<Vec<Supervisor>>, ApiError> {
    let supervisors = app_state
        .supervisor_service
        .list(query.only_active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(supervisors))
}

pub async fn create_supervisor(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    Json(payload): Json<CreateSupervisorPayload>,
) -> Result<(StatusCode, Json<Supervisor>), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let supervisor = app_state
        .supervisor_service
        .create(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(supervisor)))
}

pub async fn update_supervisor(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateSupervisorPayload>,
) -> Result<Json<Supervisor>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let supervisor = app_state
        .supervisor_service
        .update(&id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(supervisor))
}

pub async fn delete_supervisor(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app_state
        .supervisor_service
        .delete(&id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
