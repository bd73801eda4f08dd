// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::{I18nStore, DEFAULT_LANG};
use crate::db::StoreError;
use crate::middleware::i18n::Locale;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("E-mail already exists")]
    EmailAlreadyExists,

    #[error("Insufficient role")]
    Forbidden,

    #[error("No farm selected")]
    FermeRequired,

    #[error("Access to farm {0} denied")]
    FermeAccessDenied(String),

    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Worker with CIN {0} already exists")]
    CinAlreadyExists(String),

    #[error("Room {0} already exists")]
    RoomAlreadyExists(String),

    #[error("Insufficient stock")]
    InsufficientStock,

    #[error("Transfer {0} already processed")]
    TransferAlreadyProcessed(String),

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    // Network failure or open circuit: the client may retry later
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(StoreError),

    #[error("Document store error: {0}")]
    Store(StoreError),

    // A read or the batch commit of a reconciliation run failed; nothing was written
    #[error("Occupancy reconciliation failed: {0}")]
    ReconciliationFailed(#[source] StoreError),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => AppError::NotFound { collection, id },
            err if err.is_unavailable() => AppError::StoreUnavailable(err),
            err => AppError::Store(err),
        }
    }
}

/// Error body returned to clients.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    fn status_and_key(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "email_exists"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::FermeRequired => (StatusCode::BAD_REQUEST, "ferme_required"),
            AppError::FermeAccessDenied(_) => (StatusCode::FORBIDDEN, "ferme_access_denied"),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            AppError::CinAlreadyExists(_) => (StatusCode::CONFLICT, "cin_exists"),
            AppError::RoomAlreadyExists(_) => (StatusCode::CONFLICT, "room_exists"),
            AppError::InsufficientStock => (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock"),
            AppError::TransferAlreadyProcessed(_) => (StatusCode::CONFLICT, "transfer_processed"),
            AppError::InvalidTransfer(_) => (StatusCode::BAD_REQUEST, "invalid_transfer"),
            AppError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            AppError::ReconciliationFailed(source) if source.is_unavailable() => {
                (StatusCode::SERVICE_UNAVAILABLE, "reconciliation_failed")
            }
            AppError::ReconciliationFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "reconciliation_failed"),
            AppError::Store(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_)
            | AppError::InternalServerError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }

    /// Localized error response for the caller's language.
    pub fn to_api_error(self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let (status, key) = self.status_and_key();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let details = match &self {
            // Every field error, translated
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            let key = e.message.as_deref().unwrap_or(e.code.as_ref());
                            i18n.translate(&locale.0, key)
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            _ => None,
        };

        ApiError {
            status,
            error: i18n.translate(&locale.0, key),
            details,
        }
    }
}

// Used where no locale is at hand (middleware rejections)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale(DEFAULT_LANG.to_string()), &I18nStore::new())
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_app_errors() {
        let unavailable: AppError = StoreError::CircuitOpen.into();
        assert!(matches!(unavailable, AppError::StoreUnavailable(_)));

        let missing: AppError = StoreError::NotFound { collection: "rooms".into(), id: "r1".into() }.into();
        assert!(matches!(missing, AppError::NotFound { .. }));

        let denied: AppError = StoreError::PermissionDenied("rules".into()).into();
        assert!(matches!(denied, AppError::Store(_)));
    }

    #[test]
    fn unavailable_reconciliation_is_503() {
        let i18n = I18nStore::new();
        let locale = Locale("en".into());

        let err = AppError::ReconciliationFailed(StoreError::Network("reset".into())).to_api_error(&locale, &i18n);
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error, "Room synchronization failed.");

        let err = AppError::ReconciliationFailed(StoreError::Backend("disk".into())).to_api_error(&locale, &i18n);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
