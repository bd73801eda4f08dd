// src/handlers/catalog.rs
// Exit reasons and stock article names. Everyone reads, superadmins write.

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
    models::{
        motif::{Motif, MotifPayload},
        stock::{ArticleName, ArticleNamePayload},
    },
};

// --- Motifs ---

pub async fn list_motifs(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Motif>>, ApiError> {
    let motifs = app_state
        .catalog_service
        .list_motifs()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(motifs))
}

pub async fn create_motif(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<SuperAdminRole>,
    Json(payload): Json<MotifPayload>,
) -> Result<(StatusCode, Json<Motif>), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let motif = app_state
        .catalog_service
        .create_motif(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(motif)))
}

pub async fn update_motif(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<SuperAdminRole>,
    Path(id): Path<String>,
    Json(payload): Json<MotifPayload>,
) -> Result<Json<Motif>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let motif = app_state
        .catalog_service
        .update_motif(&id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(motif))
}

pub async fn delete_motif(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<SuperAdminRole>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app_state
        .catalog_service
        .delete_motif(&id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// --- Article names ---

pub async fn list_article_names(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<ArticleName>>, ApiError> {
    let names = app_state
        .catalog_service
        .list_article_names()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(names))
}

pub async fn create_article_name(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<SuperAdminRole>,
    Json(payload): Json<ArticleNamePayload>,
) -> Result<(StatusCode, Json<ArticleName>), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let name = app_state
        .catalog_service
        .create_article_name(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(name)))
}

pub async fn update_article_name(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<SuperAdminRole>,
    Path(id): Path<String>,
    Json(payload): Json<ArticleNamePayload>,
) -> Result<Json<ArticleName>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let name = app_state
        .catalog_service
        .update_article_name(&id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(name))
}

pub async fn delete_article_name(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<SuperAdminRole>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app_state
        .catalog_service
        .delete_article_name(&id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
