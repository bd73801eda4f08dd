// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::{DocumentStore, Repository},
    models::{
        auth::{AuthResponse, Claims, CreateUserPayload, Role, User, UserProfile},
        new_id,
    },
};

#[derive(Clone)]
pub struct AuthService {
    users: Repository<User>,
    jwt_secret: String,
    token_ttl_days: i64,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(store: Arc<dyn DocumentStore>, jwt_secret: String, token_ttl_days: i64, bcrypt_cost: u32) -> Self {
        Self {
            users: Repository::new(store),
            jwt_secret,
            token_ttl_days,
            bcrypt_cost,
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .users
            .list_where(|u| u.email.eq_ignore_ascii_case(&email))
            .await?
            .into_iter()
            .next())
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let cost = self.bcrypt_cost;

        // bcrypt is CPU-bound
        let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;
        Ok(hashed)
    }

    pub async fn create_user(&self, payload: CreateUserPayload) -> Result<UserProfile, AppError> {
        if self.find_by_email(&payload.email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let user = User {
            id: new_id(),
            email: payload.email.trim().to_lowercase(),
            nom: payload.nom,
            password_hash: self.hash_password(&payload.password).await?,
            role: payload.role,
            ferme_id: payload.ferme_id,
            created_at: Some(Utc::now()),
        };
        self.users.save(&user).await?;

        tracing::info!(user_id = %user.id, role = ?user.role, "👤 User created");
        Ok(user.into())
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, AppError> {
        let mut users = self.users.list().await?;
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.users.get(id).await?;
        self.users.delete(id).await?;
        Ok(())
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_token(&user)?;
        Ok(AuthResponse { token, user: user.into() })
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        // The stored role wins over the one baked into the token
        self.users
            .find(&token_data.claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.token_ttl_days);

        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    /// Creates the first superadmin account when none exists yet.
    pub async fn ensure_superadmin(&self, email: &str, password: &str) -> Result<(), AppError> {
        let existing = self.users.list_where(|u| u.role == Role::SuperAdmin).await?;
        if !existing.is_empty() {
            return Ok(());
        }

        self.create_user(CreateUserPayload {
            email: email.to_string(),
            password: password.to_string(),
            nom: "Super Admin".to_string(),
            role: Role::SuperAdmin,
            ferme_id: None,
        })
        .await?;

        tracing::info!(email, "🔑 Bootstrap superadmin created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryDocumentStore::new()), "secret".into(), 7, 4)
    }

    fn payload(email: &str, role: Role) -> CreateUserPayload {
        CreateUserPayload {
            email: email.into(),
            password: "motdepasse".into(),
            nom: "Amina".into(),
            role,
            ferme_id: Some("F".into()),
        }
    }

    #[tokio::test]
    async fn login_returns_a_token_that_validates() {
        let auth = service();
        auth.create_user(payload("Admin@Ferme.ma", Role::Admin)).await.unwrap();

        let response = auth.login_user("admin@ferme.ma", "motdepasse").await.unwrap();
        assert_eq!(response.user.role, Role::Admin);

        let user = auth.validate_token(&response.token).await.unwrap();
        assert_eq!(user.email, "admin@ferme.ma");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = service();
        auth.create_user(payload("a@ferme.ma", Role::User)).await.unwrap();

        let err = auth.login_user("a@ferme.ma", "mauvais").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
        let err = auth.login_user("inconnu@ferme.ma", "motdepasse").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let auth = service();
        auth.create_user(payload("a@ferme.ma", Role::User)).await.unwrap();
        let err = auth.create_user(payload("A@ferme.ma", Role::User)).await.unwrap_err();
        assert!(matches!(err, AppError::EmailAlreadyExists));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let err = service().validate_token("not.a.jwt").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn superadmin_bootstrap_runs_once() {
        let auth = service();
        auth.ensure_superadmin("root@ferme.ma", "motdepasse").await.unwrap();
        auth.ensure_superadmin("other@ferme.ma", "motdepasse").await.unwrap();

        let users = auth.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::SuperAdmin);
    }
}
