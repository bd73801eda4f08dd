// src/services/supervisor_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::{DocumentStore, Repository},
    models::{
        new_id,
        supervisor::{CreateSupervisorPayload, Supervisor, UpdateSupervisorPayload},
        Statut,
    },
};

#[derive(Clone)]
pub struct SupervisorService {
    supervisors: Repository<Supervisor>,
}

impl SupervisorService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { supervisors: Repository::new(store) }
    }

    pub async fn list(&self, only_active: bool) -> Result<Vec<Supervisor>, AppError> {
        let mut supervisors = self
            .supervisors
            .list_where(|s| !only_active || s.statut == Statut::Actif)
            .await?;
        supervisors.sort_by(|a, b| a.nom.cmp(&b.nom));
        Ok(supervisors)
    }

    pub async fn create(&self, payload: CreateSupervisorPayload) -> Result<Supervisor, AppError> {
        let supervisor = Supervisor {
            id: new_id(),
            nom: payload.nom.trim().to_string(),
            telephone: payload.telephone.trim().to_string(),
            entreprise: payload.entreprise.filter(|e| !e.trim().is_empty()),
            statut: Statut::Actif,
        };
        self.supervisors.save(&supervisor).await?;
        tracing::info!(supervisor_id = %supervisor.id, "Supervisor created");
        Ok(supervisor)
    }

    pub async fn update(&self, id: &str, payload: UpdateSupervisorPayload) -> Result<Supervisor, AppError> {
        let mut supervisor = self.supervisors.get(id).await?;
        if let Some(nom) = payload.nom {
            supervisor.nom = nom.trim().to_string();
        }
        if let Some(telephone) = payload.telephone {
            supervisor.telephone = telephone.trim().to_string();
        }
        if payload.entreprise.is_some() {
            supervisor.entreprise = payload.entreprise.filter(|e| !e.trim().is_empty());
        }
        if let Some(statut) = payload.statut {
            supervisor.statut = statut;
        }
        self.supervisors.save(&supervisor).await?;
        Ok(supervisor)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.supervisors.get(id).await?;
        self.supervisors.delete(id).await?;
        Ok(())
    }
}
