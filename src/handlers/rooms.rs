// src/handlers/rooms.rs

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
        ferme::FermeScope,
        i18n::Locale,
        rbac::{AdminRole, RequireRole},
    },
    models::room::{CreateRoomPayload, ReconciliationReport, Room, UpdateRoomPayload},
};

pub async fn list_rooms(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: FermeScope,
) -> Result<Json<Vec<Room>>, ApiError> {
    let rooms = app_state
        .room_service
        .list(&scope)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(rooms))
}

pub async fn get_room(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: FermeScope,
    Path(id): Path<String>,
) -> Result<Json<Room>, ApiError> {
    let room = app_state
        .room_service
        .get(&scope, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(room))
}

pub async fn create_room(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Json(payload): Json<CreateRoomPayload>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let ferme_id = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let room = app_state
        .room_service
        .create(ferme_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn update_room(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRoomPayload>,
) -> Result<Json<Room>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let room = app_state
        .room_service
        .update(&scope, &id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(room))
}

pub async fn delete_room(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app_state
        .room_service
        .delete(&scope, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Occupancy reconciliation
// ---

pub async fn reconcile_all(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
) -> Result<Json<ReconciliationReport>, ApiError> {
    let report = app_state
        .occupancy_service
        .reconcile_all()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(report))
}

pub async fn reconcile_room(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Path(id): Path<String>,
) -> Result<Json<ReconciliationReport>, ApiError> {
    // Visibility check before touching the room
    app_state
        .room_service
        .get(&scope, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .occupancy_service
        .reconcile_room(&id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(report))
}
