// src/handlers/workers.rs

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
    models::{
        import::{ImportReport, ImportWorkersPayload},
        worker::{
            AssignRoomPayload, BulkDeletePayload, BulkDeleteResponse, CreateWorkerPayload,
            ExitWorkerPayload, UpdateWorkerPayload, Worker,
        },
    },
};

// ---
// Reads
// ---

pub async fn list_workers(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: FermeScope,
) -> Result<Json<Vec<Worker>>, ApiError> {
    let workers = app_state
        .worker_service
        .list(&scope)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(workers))
}

pub async fn get_worker(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: FermeScope,
    Path(id): Path<String>,
) -> Result<Json<Worker>, ApiError> {
    let worker = app_state
        .worker_service
        .get(&scope, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(worker))
}

// ---
// Writes (admin)
// ---

pub async fn create_worker(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Json(payload): Json<CreateWorkerPayload>,
) -> Result<(StatusCode, Json<Worker>), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let ferme_id = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let worker = app_state
        .worker_service
        .create(ferme_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(worker)))
}

pub async fn update_worker(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Path(id): Path<String>,
    Json(payload): Json<UpdateWorkerPayload>,
) -> Result<Json<Worker>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let worker = app_state
        .worker_service
        .update(&scope, &id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(worker))
}

pub async fn assign_room(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Path(id): Path<String>,
    Json(payload): Json<AssignRoomPayload>,
) -> Result<Json<Worker>, ApiError> {
    let worker = app_state
        .worker_service
        .assign_room(&scope, &id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(worker))
}

pub async fn exit_worker(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Path(id): Path<String>,
    Json(payload): Json<ExitWorkerPayload>,
) -> Result<Json<Worker>, ApiError> {
    let worker = app_state
        .worker_service
        .exit(&scope, &id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(worker))
}

pub async fn delete_worker(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app_state
        .worker_service
        .delete(&scope, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete_workers(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Json(payload): Json<BulkDeletePayload>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .worker_service
        .bulk_delete(&scope, &payload.ids)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(response))
}

pub async fn import_workers(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Json(payload): Json<ImportWorkersPayload>,
) -> Result<Json<ImportReport>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let ferme_id = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .import_service
        .import_workers(ferme_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(report))
}
