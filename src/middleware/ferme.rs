// src/middleware/ferme.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::Role,
};

// Header carrying the farm the client is working on
pub const FERME_ID_HEADER: &str = "x-ferme-id";

/// Which farms a request may see.
///
/// Superadmins without the header see every farm; everybody else is pinned
/// to the header's farm (access checked) or to their own farm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FermeScope {
    All,
    Ferme(String),
}

impl FermeScope {
    pub fn includes(&self, ferme_id: &str) -> bool {
        match self {
            FermeScope::All => true,
            FermeScope::Ferme(id) => id == ferme_id,
        }
    }

    /// The single farm targeted by a write.
    pub fn require(&self) -> Result<&str, AppError> {
        match self {
            FermeScope::All => Err(AppError::FermeRequired),
            FermeScope::Ferme(id) => Ok(id),
        }
    }
}

impl<S> FromRequestParts<S> for FermeScope
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        resolve_scope(&app_state, parts)
            .await
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))
    }
}

async fn resolve_scope(app_state: &AppState, parts: &Parts) -> Result<FermeScope, AppError> {
    let AuthenticatedUser(user) = parts
        .extensions
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or(AppError::InvalidToken)?;

    let requested = parts
        .headers
        .get(FERME_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    match (requested, user.role) {
        (Some(ferme_id), Role::SuperAdmin) => Ok(FermeScope::Ferme(ferme_id)),
        (None, Role::SuperAdmin) => Ok(FermeScope::All),
        (Some(ferme_id), _) => {
            if app_state.ferme_service.can_access(&user, &ferme_id).await? {
                Ok(FermeScope::Ferme(ferme_id))
            } else {
                Err(AppError::FermeAccessDenied(ferme_id))
            }
        }
        (None, _) => user.ferme_id.map(FermeScope::Ferme).ok_or(AppError::FermeRequired),
    }
}
