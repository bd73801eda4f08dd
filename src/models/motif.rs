// src/models/motif.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::Document;

// Exit reason offered when a worker leaves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Motif {
    pub id: String,
    pub libelle: String,
}

impl Document for Motif {
    const COLLECTION: &'static str = "motifs";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct MotifPayload {
    #[validate(length(min = 1, message = "required"))]
    pub libelle: String,
}
