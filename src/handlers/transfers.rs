// src/handlers/transfers.rs

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
        ferme::FermeScope,
        i18n::Locale,
        rbac::{AdminRole, RequireRole},
    },
    models::transfer::{CreateTransferPayload, TransferRequest, TransferStatus},
};

#[derive(Debug, Deserialize)]
pub struct TransferQuery {
    pub statut: Option<TransferStatus>,
}

pub async fn list_transfers(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: FermeScope,
    Query(query): Query<TransferQuery>,
) -> Result<Json<Vec<TransferRequest>>, ApiError> {
    let transfers = app_state
        .transfer_service
        .list(&scope, query.statut)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(transfers))
}

pub async fn create_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Json(payload): Json<CreateTransferPayload>,
) -> Result<(StatusCode, Json<TransferRequest>), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let transfer = app_state
        .transfer_service
        .create(&scope, &user, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(transfer)))
}

pub async fn accept_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(id): Path<String>,
) -> Result<Json<TransferRequest>, ApiError> {
    let transfer = app_state
        .transfer_service
        .accept(&user, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(transfer))
}

pub async fn reject_transfer(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    Path(id): Path<String>,
) -> Result<Json<TransferRequest>, ApiError> {
    let transfer = app_state
        .transfer_service
        .reject(&user, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(transfer))
}
