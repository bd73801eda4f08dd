// src/models/room.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::worker::Gender;
use crate::db::Document;

/// Gender category of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomGender {
    Hommes,
    Femmes,
}

impl RoomGender {
    pub fn accepts(self, sexe: Gender) -> bool {
        matches!(
            (self, sexe),
            (RoomGender::Hommes, Gender::Homme) | (RoomGender::Femmes, Gender::Femme)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub numero: String,
    pub ferme_id: String,
    pub genre: RoomGender,
    #[serde(default)]
    pub capacite: u32,

    // Denormalized occupancy, kept in sync by the occupancy reconciler
    #[serde(default)]
    pub occupants_actuels: u32,
    #[serde(default)]
    pub liste_occupants: Vec<String>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document for Room {
    const COLLECTION: &'static str = "rooms";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomPayload {
    #[validate(length(min = 1, message = "required"))]
    pub numero: String,
    pub genre: RoomGender,
    #[validate(range(min = 1, message = "invalid_capacity"))]
    pub capacite: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoomPayload {
    #[validate(length(min = 1, message = "required"))]
    pub numero: Option<String>,
    pub genre: Option<RoomGender>,
    #[validate(range(min = 1, message = "invalid_capacity"))]
    pub capacite: Option<u32>,
}

/// A worker left out of a room because their gender does not match it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderMismatch {
    pub room_id: String,
    pub worker_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub rooms_checked: usize,
    pub rooms_updated: usize,
    pub gender_mismatches: Vec<GenderMismatch>,
    // Stored rooms or workers that could not be decoded, left untouched
    pub skipped_documents: usize,
}
