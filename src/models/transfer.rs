// src/models/transfer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    EnAttente,
    Acceptee,
    Refusee,
}

// Request to move a worker to another farm
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub id: String,
    pub worker_id: String,
    pub from_ferme_id: String,
    pub to_ferme_id: String,
    #[serde(default)]
    pub to_chambre: Option<String>,
    #[serde(default)]
    pub motif: Option<String>,
    pub statut: TransferStatus,
    pub demande_par: String,
    #[serde(default)]
    pub traite_par: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

impl Document for TransferRequest {
    const COLLECTION: &'static str = "transfers";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferPayload {
    #[validate(length(min = 1, message = "required"))]
    pub worker_id: String,
    #[validate(length(min = 1, message = "required"))]
    pub to_ferme_id: String,
    pub to_chambre: Option<String>,
    pub motif: Option<String>,
}
