// src/handlers/fermes.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireRole, SuperAdminRole},
    },
    models::ferme::{CreateFermePayload, Ferme, UpdateFermePayload},
};

// Farms the caller may work on (all of them for a superadmin)
pub async fn list_fermes(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Ferme>>, ApiError> {
    let fermes = app_state
        .ferme_service
        .list_for(&user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(fermes))
}

pub async fn create_ferme(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<SuperAdminRole>,
    Json(payload): Json<CreateFermePayload>,
) -> Result<(StatusCode, Json<Ferme>), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let ferme = app_state
        .ferme_service
        .create(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ferme)))
}

pub async fn update_ferme(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<SuperAdminRole>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateFermePayload>,
) -> Result<Json<Ferme>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let ferme = app_state
        .ferme_service
        .update(&id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ferme))
}

pub async fn delete_ferme(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<SuperAdminRole>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app_state
        .ferme_service
        .delete(&id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
