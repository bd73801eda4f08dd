// src/services/worker_service.rs

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::{Document, DocumentStore, Repository, WriteBatch},
    middleware::ferme::FermeScope,
    models::{
        new_id,
        room::Room,
        worker::{
            AssignRoomPayload, BulkDeleteResponse, CreateWorkerPayload, ExitWorkerPayload,
            UpdateWorkerPayload, Worker,
        },
        Statut,
    },
    services::occupancy_service::{room_key, OccupancyService, RoomKey},
};

/// True when `selected` is exactly the set of workers whose status is active.
///
/// Inactive workers never count, whether selected or not.
pub fn is_delete_all_workers(selected: &[String], workers: &[Worker]) -> bool {
    let active: HashSet<&str> = workers
        .iter()
        .filter(|w| w.statut == Statut::Actif)
        .map(|w| w.id.as_str())
        .collect();
    let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();

    !active.is_empty() && active == selected
}

pub(crate) fn normalize_cin(cin: &str) -> String {
    cin.trim().to_uppercase()
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn key_of(worker: &Worker) -> Option<RoomKey> {
    worker
        .chambre
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(|c| room_key(&worker.ferme_id, c))
}

#[derive(Clone)]
pub struct WorkerService {
    store: Arc<dyn DocumentStore>,
    workers: Repository<Worker>,
    rooms: Repository<Room>,
    occupancy: OccupancyService,
}

impl WorkerService {
    pub fn new(store: Arc<dyn DocumentStore>, occupancy: OccupancyService) -> Self {
        Self {
            workers: Repository::new(store.clone()),
            rooms: Repository::new(store.clone()),
            store,
            occupancy,
        }
    }

    pub async fn list(&self, scope: &FermeScope) -> Result<Vec<Worker>, AppError> {
        let mut workers = self.workers.list_where(|w| scope.includes(&w.ferme_id)).await?;
        workers.sort_by(|a, b| a.nom.to_lowercase().cmp(&b.nom.to_lowercase()));
        Ok(workers)
    }

    pub async fn get(&self, scope: &FermeScope, id: &str) -> Result<Worker, AppError> {
        let worker = self.workers.get(id).await?;
        if !scope.includes(&worker.ferme_id) {
            // Same answer as a missing worker: other farms stay invisible
            return Err(AppError::NotFound {
                collection: Worker::COLLECTION.to_string(),
                id: id.to_string(),
            });
        }
        Ok(worker)
    }

    async fn ensure_unique_cin(&self, ferme_id: &str, cin: &str, except: Option<&str>) -> Result<(), AppError> {
        let cin = normalize_cin(cin);
        let taken = self
            .workers
            .list_where(|w| w.ferme_id == ferme_id && normalize_cin(&w.cin) == cin && Some(w.id.as_str()) != except)
            .await?;
        if taken.is_empty() {
            Ok(())
        } else {
            Err(AppError::CinAlreadyExists(cin))
        }
    }

    /// Re-syncs the rooms touched by a mutation that already succeeded.
    ///
    /// A failure here is only logged; the periodic sync repairs it.
    async fn resync(&self, keys: Vec<RoomKey>) {
        let mut keys = keys;
        keys.sort();
        keys.dedup();
        if let Err(e) = self.occupancy.reconcile_keys(&keys).await {
            tracing::warn!(error = %e, rooms = keys.len(), "Room resync after worker change failed");
        }
    }

    pub async fn create(&self, ferme_id: &str, payload: CreateWorkerPayload) -> Result<Worker, AppError> {
        self.ensure_unique_cin(ferme_id, &payload.cin, None).await?;

        let now = Utc::now();
        let worker = Worker {
            id: new_id(),
            nom: payload.nom.trim().to_string(),
            cin: normalize_cin(&payload.cin),
            matricule: clean(payload.matricule),
            ferme_id: ferme_id.to_string(),
            chambre: clean(payload.chambre),
            secteur: clean(payload.secteur),
            sexe: payload.sexe,
            date_entree: Some(payload.date_entree.unwrap_or_else(|| now.date_naive())),
            date_sortie: None,
            motif_sortie: None,
            statut: Statut::Actif,
            supervisor_id: payload.supervisor_id,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.workers.save(&worker).await?;
        tracing::info!(worker_id = %worker.id, ferme_id, "👷 Worker created");

        self.resync(key_of(&worker).into_iter().collect()).await;
        Ok(worker)
    }

    pub async fn update(&self, scope: &FermeScope, id: &str, payload: UpdateWorkerPayload) -> Result<Worker, AppError> {
        let mut worker = self.get(scope, id).await?;

        if let Some(cin) = payload.cin {
            self.ensure_unique_cin(&worker.ferme_id, &cin, Some(id)).await?;
            worker.cin = normalize_cin(&cin);
        }
        if let Some(nom) = payload.nom {
            worker.nom = nom.trim().to_string();
        }
        if payload.matricule.is_some() {
            worker.matricule = clean(payload.matricule);
        }
        if payload.secteur.is_some() {
            worker.secteur = clean(payload.secteur);
        }
        if let Some(sexe) = payload.sexe {
            worker.sexe = sexe;
        }
        if payload.date_entree.is_some() {
            worker.date_entree = payload.date_entree;
        }
        if payload.supervisor_id.is_some() {
            worker.supervisor_id = payload.supervisor_id;
        }
        worker.updated_at = Some(Utc::now());

        self.workers.save(&worker).await?;
        // A gender change can move the worker in or out of their room
        self.resync(key_of(&worker).into_iter().collect()).await;
        Ok(worker)
    }

    pub async fn assign_room(&self, scope: &FermeScope, id: &str, payload: AssignRoomPayload) -> Result<Worker, AppError> {
        let mut worker = self.get(scope, id).await?;
        let chambre = clean(payload.chambre);

        if let Some(numero) = &chambre {
            let key = room_key(&worker.ferme_id, numero);
            let exists = self
                .rooms
                .list_where(|r| room_key(&r.ferme_id, &r.numero) == key)
                .await?;
            if exists.is_empty() {
                return Err(AppError::NotFound {
                    collection: Room::COLLECTION.to_string(),
                    id: numero.clone(),
                });
            }
        }

        let previous = key_of(&worker);
        worker.chambre = chambre;
        worker.updated_at = Some(Utc::now());
        self.workers.save(&worker).await?;

        tracing::info!(worker_id = %worker.id, chambre = ?worker.chambre, "Room assignment changed");
        self.resync(previous.into_iter().chain(key_of(&worker)).collect()).await;
        Ok(worker)
    }

    pub async fn exit(&self, scope: &FermeScope, id: &str, payload: ExitWorkerPayload) -> Result<Worker, AppError> {
        let mut worker = self.get(scope, id).await?;
        worker.date_sortie = Some(payload.date_sortie);
        worker.motif_sortie = clean(payload.motif);
        worker.statut = Statut::Inactif;
        worker.updated_at = Some(Utc::now());
        self.workers.save(&worker).await?;

        tracing::info!(worker_id = %worker.id, date_sortie = %payload.date_sortie, "🚪 Worker exit recorded");
        self.resync(key_of(&worker).into_iter().collect()).await;
        Ok(worker)
    }

    pub async fn delete(&self, scope: &FermeScope, id: &str) -> Result<(), AppError> {
        let worker = self.get(scope, id).await?;
        self.workers.delete(id).await?;
        tracing::info!(worker_id = %id, "Worker deleted");
        self.resync(key_of(&worker).into_iter().collect()).await;
        Ok(())
    }

    /// Deletes the selected workers in one batch.
    pub async fn bulk_delete(&self, scope: &FermeScope, ids: &[String]) -> Result<BulkDeleteResponse, AppError> {
        let roster = self.workers.list_where(|w| scope.includes(&w.ferme_id)).await?;

        let mut selected = Vec::with_capacity(ids.len());
        for id in ids {
            let worker = roster.iter().find(|w| &w.id == id).ok_or_else(|| AppError::NotFound {
                collection: Worker::COLLECTION.to_string(),
                id: id.clone(),
            })?;
            selected.push(worker);
        }

        let deleted_all_active = is_delete_all_workers(ids, &roster);

        let mut batch = WriteBatch::new();
        for worker in &selected {
            batch.delete(Worker::COLLECTION, &worker.id);
        }
        let deleted = batch.len();
        self.store.commit(batch).await?;

        tracing::info!(deleted, deleted_all_active, "🗑️ Workers deleted in bulk");
        if deleted_all_active {
            tracing::warn!("The whole active roster was deleted");
        }

        self.resync(selected.iter().filter_map(|w| key_of(w)).collect()).await;
        Ok(BulkDeleteResponse { deleted, deleted_all_active })
    }
}
