// src/models.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod auth;
pub mod dashboard;
pub mod ferme;
pub mod import;
pub mod motif;
pub mod room;
pub mod stock;
pub mod supervisor;
pub mod transfer;
pub mod worker;

/// Fresh document id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Active/inactive flag shared by workers and supervisors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statut {
    #[default]
    Actif,
    Inactif,
}
