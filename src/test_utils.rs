// src/test_utils.rs

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    config::{AppState, Config, StoreBackend},
    db::{Document, DocumentStore, MemoryDocumentStore, WriteBatch},
    models::{
        room::{Room, RoomGender},
        worker::{Gender, Worker},
        Statut,
    },
    resilience::CircuitBreakerConfig,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn worker(id: &str, ferme_id: &str, chambre: Option<&str>, sexe: Gender) -> Worker {
    Worker {
        id: id.to_string(),
        nom: format!("Worker {id}"),
        cin: format!("CIN-{id}"),
        matricule: None,
        ferme_id: ferme_id.to_string(),
        chambre: chambre.map(str::to_string),
        secteur: None,
        sexe,
        date_entree: None,
        date_sortie: None,
        motif_sortie: None,
        statut: Statut::Actif,
        supervisor_id: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn room(id: &str, ferme_id: &str, numero: &str, genre: RoomGender) -> Room {
    Room {
        id: id.to_string(),
        numero: numero.to_string(),
        ferme_id: ferme_id.to_string(),
        genre,
        capacite: 4,
        occupants_actuels: 0,
        liste_occupants: Vec::new(),
        updated_at: None,
    }
}

/// Writes documents straight into the store in one batch.
pub async fn seed<D: Document>(store: &dyn DocumentStore, docs: &[D]) {
    let mut batch = WriteBatch::new();
    for doc in docs {
        batch.set(doc).unwrap();
    }
    store.commit(batch).await.unwrap();
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        store_backend: StoreBackend::Memory,
        database_url: None,
        jwt_secret: "test-secret".to_string(),
        token_ttl_days: 7,
        bcrypt_cost: 4,
        breaker: CircuitBreakerConfig::default(),
        reconcile_interval: None,
        superadmin_email: None,
        superadmin_password: None,
    }
}

/// Full application state over a fresh in-memory store.
pub fn test_state() -> (Arc<MemoryDocumentStore>, AppState) {
    let memory = Arc::new(MemoryDocumentStore::new());
    let state = AppState::with_backend(test_config(), memory.clone());
    (memory, state)
}
