// src/models/ferme.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::Document;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ferme {
    pub id: String,
    pub nom: String,
    // Ids of the users administering this farm
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Document for Ferme {
    const COLLECTION: &'static str = "fermes";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFermePayload {
    #[validate(length(min = 1, message = "required"))]
    pub nom: String,
    #[serde(default)]
    pub admins: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFermePayload {
    #[validate(length(min = 1, message = "required"))]
    pub nom: Option<String>,
    pub admins: Option<Vec<String>>,
}
