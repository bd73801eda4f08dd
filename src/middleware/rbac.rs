// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::Role,
};

/// 1. What a role requirement is
pub trait RoleRequirement: Send + Sync + 'static {
    fn minimum() -> Role;
}

/// 2. The guard extractor
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleRequirement,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::InvalidToken)
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        if user.0.role < T::minimum() {
            tracing::debug!(user_id = %user.0.id, role = ?user.0.role, required = ?T::minimum(), "Role check failed");
            return Err(AppError::Forbidden.to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// ROLE REQUIREMENTS
// ---

pub struct AdminRole;
impl RoleRequirement for AdminRole {
    fn minimum() -> Role { Role::Admin }
}

pub struct SuperAdminRole;
impl RoleRequirement for SuperAdminRole {
    fn minimum() -> Role { Role::SuperAdmin }
}
