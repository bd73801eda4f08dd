// src/models/worker.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Statut;
use crate::db::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Homme,
    Femme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub id: String,
    pub nom: String,
    pub cin: String,
    #[serde(default)]
    pub matricule: Option<String>,
    pub ferme_id: String,

    // Room number inside the farm (matches Room.numero)
    #[serde(default)]
    pub chambre: Option<String>,

    #[serde(default)]
    pub secteur: Option<String>,
    pub sexe: Gender,
    #[serde(default)]
    pub date_entree: Option<NaiveDate>,
    #[serde(default)]
    pub date_sortie: Option<NaiveDate>,
    #[serde(default)]
    pub motif_sortie: Option<String>,
    #[serde(default)]
    pub statut: Statut,
    #[serde(default)]
    pub supervisor_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Worker {
    /// A worker occupies a room until the day after their exit date.
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.date_sortie.is_none_or(|exit| exit > today)
    }
}

impl Document for Worker {
    const COLLECTION: &'static str = "workers";

    fn id(&self) -> &str {
        &self.id
    }
}

/// The part of a worker record that decides room occupancy.
///
/// Decoded straight from stored documents, so records missing unrelated
/// fields (`nom`, `cin`, ...) still count towards their room.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupant {
    pub id: String,
    pub ferme_id: String,
    #[serde(default)]
    pub chambre: Option<String>,
    pub sexe: Gender,
    #[serde(default)]
    pub date_sortie: Option<NaiveDate>,
}

impl Occupant {
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.date_sortie.is_none_or(|exit| exit > today)
    }
}

impl From<&Worker> for Occupant {
    fn from(worker: &Worker) -> Self {
        Self {
            id: worker.id.clone(),
            ferme_id: worker.ferme_id.clone(),
            chambre: worker.chambre.clone(),
            sexe: worker.sexe,
            date_sortie: worker.date_sortie,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkerPayload {
    #[validate(length(min = 1, message = "required"))]
    pub nom: String,
    #[validate(length(min = 1, message = "required"))]
    pub cin: String,
    pub matricule: Option<String>,
    pub chambre: Option<String>,
    pub secteur: Option<String>,
    pub sexe: Gender,
    pub date_entree: Option<NaiveDate>,
    pub supervisor_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkerPayload {
    #[validate(length(min = 1, message = "required"))]
    pub nom: Option<String>,
    #[validate(length(min = 1, message = "required"))]
    pub cin: Option<String>,
    pub matricule: Option<String>,
    pub secteur: Option<String>,
    pub sexe: Option<Gender>,
    pub date_entree: Option<NaiveDate>,
    pub supervisor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoomPayload {
    // `null` takes the worker out of any room
    pub chambre: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitWorkerPayload {
    pub date_sortie: NaiveDate,
    pub motif: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkDeletePayload {
    #[validate(length(min = 1, message = "required"))]
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub deleted: usize,
    // True when the selection covered every active worker of the roster
    pub deleted_all_active: bool,
}
