// src/handlers/stock.rs

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
        ferme::FermeScope,
        i18n::Locale,
        rbac::{AdminRole, RequireRole},
    },
    models::stock::{CreateStockArticlePayload, StockArticle, StockMovement, StockMovementPayload},
};

pub async fn list_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: FermeScope,
) -> Result<Json<Vec<StockArticle>>, ApiError> {
    let articles = app_state
        .stock_service
        .list(&scope)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(articles))
}

pub async fn list_low_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: FermeScope,
) -> Result<Json<Vec<StockArticle>>, ApiError> {
    let articles = app_state
        .stock_service
        .low_stock(&scope)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(articles))
}

pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: FermeScope,
    Path(id): Path<String>,
) -> Result<Json<Vec<StockMovement>>, ApiError> {
    let movements = app_state
        .stock_service
        .movements(&scope, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movements))
}

pub async fn create_article(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Json(payload): Json<CreateStockArticlePayload>,
) -> Result<(StatusCode, Json<StockArticle>), ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let ferme_id = scope
        .require()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let article = app_state
        .stock_service
        .create(ferme_id, &user.id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(article)))
}

// Entry or withdrawal
pub async fn record_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Path(id): Path<String>,
    Json(payload): Json<StockMovementPayload>,
) -> Result<Json<StockArticle>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let article = app_state
        .stock_service
        .record_movement(&scope, &id, &user.id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(article))
}

pub async fn delete_article(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<AdminRole>,
    scope: FermeScope,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app_state
        .stock_service
        .delete(&scope, &id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
