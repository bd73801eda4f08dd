// src/services/ferme_service.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::{DocumentStore, Repository},
    models::{
        auth::{Role, User},
        ferme::{CreateFermePayload, Ferme, UpdateFermePayload},
        new_id,
    },
};

#[derive(Clone)]
pub struct FermeService {
    fermes: Repository<Ferme>,
}

impl FermeService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { fermes: Repository::new(store) }
    }

    /// Superadmins see every farm; an admin also manages the farms listing them.
    pub async fn can_access(&self, user: &User, ferme_id: &str) -> Result<bool, AppError> {
        if user.role == Role::SuperAdmin || user.ferme_id.as_deref() == Some(ferme_id) {
            return Ok(true);
        }
        if user.role < Role::Admin {
            return Ok(false);
        }
        Ok(self
            .fermes
            .find(ferme_id)
            .await?
            .is_some_and(|f| f.admins.iter().any(|id| id == &user.id)))
    }

    pub async fn list_for(&self, user: &User) -> Result<Vec<Ferme>, AppError> {
        let mut fermes = match user.role {
            Role::SuperAdmin => self.fermes.list().await?,
            _ => {
                self.fermes
                    .list_where(|f| user.ferme_id.as_deref() == Some(f.id.as_str()) || f.admins.contains(&user.id))
                    .await?
            }
        };
        fermes.sort_by(|a, b| a.nom.cmp(&b.nom));
        Ok(fermes)
    }

    pub async fn get(&self, id: &str) -> Result<Ferme, AppError> {
        Ok(self.fermes.get(id).await?)
    }

    pub async fn create(&self, payload: CreateFermePayload) -> Result<Ferme, AppError> {
        let ferme = Ferme {
            id: new_id(),
            nom: payload.nom.trim().to_string(),
            admins: payload.admins,
            created_at: Some(Utc::now()),
        };
        self.fermes.save(&ferme).await?;
        tracing::info!(ferme_id = %ferme.id, nom = %ferme.nom, "🌾 Farm created");
        Ok(ferme)
    }

    pub async fn update(&self, id: &str, payload: UpdateFermePayload) -> Result<Ferme, AppError> {
        let mut ferme = self.fermes.get(id).await?;
        if let Some(nom) = payload.nom {
            ferme.nom = nom.trim().to_string();
        }
        if let Some(admins) = payload.admins {
            ferme.admins = admins;
        }
        self.fermes.save(&ferme).await?;
        Ok(ferme)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.fermes.get(id).await?;
        self.fermes.delete(id).await?;
        tracing::info!(ferme_id = %id, "Farm deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;

    fn user(id: &str, role: Role, ferme_id: Option<&str>) -> User {
        User {
            id: id.into(),
            email: format!("{id}@ferme.ma"),
            nom: id.into(),
            password_hash: String::new(),
            role,
            ferme_id: ferme_id.map(str::to_string),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn access_rules() {
        let service = FermeService::new(Arc::new(MemoryDocumentStore::new()));
        let other = service
            .create(CreateFermePayload { nom: "Ferme B".into(), admins: vec!["admin".into()] })
            .await
            .unwrap();

        let admin = user("admin", Role::Admin, Some("A"));
        let plain = user("plain", Role::User, Some("A"));
        let root = user("root", Role::SuperAdmin, None);

        assert!(service.can_access(&admin, "A").await.unwrap());
        assert!(service.can_access(&admin, &other.id).await.unwrap());
        assert!(!service.can_access(&plain, &other.id).await.unwrap());
        assert!(service.can_access(&root, "anything").await.unwrap());

        assert_eq!(service.list_for(&admin).await.unwrap().len(), 1);
        assert!(service.list_for(&plain).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete() {
        let service = FermeService::new(Arc::new(MemoryDocumentStore::new()));
        let ferme = service
            .create(CreateFermePayload { nom: " Ferme A ".into(), admins: vec![] })
            .await
            .unwrap();
        assert_eq!(ferme.nom, "Ferme A");

        let updated = service
            .update(&ferme.id, UpdateFermePayload { nom: Some("Ferme Atlas".into()), admins: None })
            .await
            .unwrap();
        assert_eq!(updated.nom, "Ferme Atlas");

        service.delete(&ferme.id).await.unwrap();
        assert!(matches!(service.get(&ferme.id).await, Err(AppError::NotFound { .. })));
    }
}
