// src/models/supervisor.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Statut;
use crate::db::Document;

// Supervisors are shared by every farm
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supervisor {
    pub id: String,
    pub nom: String,
    pub telephone: String,
    #[serde(default)]
    pub entreprise: Option<String>,
    #[serde(default)]
    pub statut: Statut,
}

impl Document for Supervisor {
    const COLLECTION: &'static str = "supervisors";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupervisorPayload {
    #[validate(length(min = 1, message = "required"))]
    pub nom: String,
    #[validate(length(min = 6, message = "invalid_phone"))]
    pub telephone: String,
    pub entreprise: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSupervisorPayload {
    #[validate(length(min = 1, message = "required"))]
    pub nom: Option<String>,
    #[validate(length(min = 6, message = "invalid_phone"))]
    pub telephone: Option<String>,
    pub entreprise: Option<String>,
    pub statut: Option<Statut>,
}
