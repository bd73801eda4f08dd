// src/services/transfer_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map};

use crate::{
    common::error::AppError,
    db::{Document, DocumentStore, Repository, WriteBatch},
    middleware::ferme::FermeScope,
    models::{
        auth::{Role, User},
        ferme::Ferme,
        new_id,
        transfer::{CreateTransferPayload, TransferRequest, TransferStatus},
        worker::Worker,
    },
    services::occupancy_service::{room_key, OccupancyService, RoomKey},
};

#[derive(Clone)]
pub struct TransferService {
    store: Arc<dyn DocumentStore>,
    transfers: Repository<TransferRequest>,
    workers: Repository<Worker>,
    fermes: Repository<Ferme>,
    occupancy: OccupancyService,
}

impl TransferService {
    pub fn new(store: Arc<dyn DocumentStore>, occupancy: OccupancyService) -> Self {
        Self {
            transfers: Repository::new(store.clone()),
            workers: Repository::new(store.clone()),
            fermes: Repository::new(store.clone()),
            store,
            occupancy,
        }
    }

    /// Requests touching the scope, either as origin or destination.
    pub async fn list(&self, scope: &FermeScope, statut: Option<TransferStatus>) -> Result<Vec<TransferRequest>, AppError> {
        let mut transfers = self
            .transfers
            .list_where(|t| {
                (scope.includes(&t.from_ferme_id) || scope.includes(&t.to_ferme_id))
                    && statut.is_none_or(|s| s == t.statut)
            })
            .await?;
        transfers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transfers)
    }

    pub async fn create(&self, scope: &FermeScope, user: &User, payload: CreateTransferPayload) -> Result<TransferRequest, AppError> {
        let worker = self.workers.get(&payload.worker_id).await?;
        if !scope.includes(&worker.ferme_id) {
            return Err(AppError::NotFound {
                collection: Worker::COLLECTION.to_string(),
                id: worker.id,
            });
        }
        if worker.ferme_id == payload.to_ferme_id {
            return Err(AppError::InvalidTransfer("destination is the current farm".into()));
        }
        self.fermes.get(&payload.to_ferme_id).await?;

        let pending = self
            .transfers
            .list_where(|t| t.worker_id == worker.id && t.statut == TransferStatus::EnAttente)
            .await?;
        if !pending.is_empty() {
            return Err(AppError::InvalidTransfer("a transfer is already pending for this worker".into()));
        }

        let transfer = TransferRequest {
            id: new_id(),
            worker_id: worker.id.clone(),
            from_ferme_id: worker.ferme_id.clone(),
            to_ferme_id: payload.to_ferme_id,
            to_chambre: payload.to_chambre.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            motif: payload.motif,
            statut: TransferStatus::EnAttente,
            demande_par: user.id.clone(),
            traite_par: None,
            created_at: Utc::now(),
            processed_at: None,
        };
        self.transfers.save(&transfer).await?;

        tracing::info!(
            transfer_id = %transfer.id,
            worker_id = %transfer.worker_id,
            from = %transfer.from_ferme_id,
            to = %transfer.to_ferme_id,
            "🔁 Transfer requested"
        );
        Ok(transfer)
    }

    async fn pending_for_processing(&self, user: &User, id: &str) -> Result<TransferRequest, AppError> {
        let transfer = self.transfers.get(id).await?;
        if transfer.statut != TransferStatus::EnAttente {
            return Err(AppError::TransferAlreadyProcessed(transfer.id));
        }

        // Only the receiving farm decides
        let allowed = user.role == Role::SuperAdmin
            || user.ferme_id.as_deref() == Some(transfer.to_ferme_id.as_str())
            || self
                .fermes
                .find(&transfer.to_ferme_id)
                .await?
                .is_some_and(|f| f.admins.contains(&user.id));
        if !allowed {
            return Err(AppError::FermeAccessDenied(transfer.to_ferme_id));
        }
        Ok(transfer)
    }

    /// Moves the worker and closes the request in one batch, then re-syncs both rooms.
    pub async fn accept(&self, user: &User, id: &str) -> Result<TransferRequest, AppError> {
        let mut transfer = self.pending_for_processing(user, id).await?;
        let worker = self.workers.get(&transfer.worker_id).await?;

        let now = Utc::now();
        let mut keys: Vec<RoomKey> = Vec::new();
        if let Some(chambre) = worker.chambre.as_deref().filter(|c| !c.trim().is_empty()) {
            keys.push(room_key(&worker.ferme_id, chambre));
        }
        if let Some(chambre) = &transfer.to_chambre {
            keys.push(room_key(&transfer.to_ferme_id, chambre));
        }

        let mut worker_fields = Map::new();
        worker_fields.insert("fermeId".into(), json!(transfer.to_ferme_id));
        worker_fields.insert("chambre".into(), json!(transfer.to_chambre));
        worker_fields.insert("updatedAt".into(), json!(now));

        transfer.statut = TransferStatus::Acceptee;
        transfer.traite_par = Some(user.id.clone());
        transfer.processed_at = Some(now);

        let mut batch = WriteBatch::new();
        batch.update(Worker::COLLECTION, &worker.id, worker_fields);
        batch.set(&transfer)?;
        self.store.commit(batch).await?;

        tracing::info!(transfer_id = %transfer.id, worker_id = %worker.id, "✅ Transfer accepted");

        if let Err(e) = self.occupancy.reconcile_keys(&keys).await {
            tracing::warn!(transfer_id = %transfer.id, error = %e, "Room resync after transfer failed");
        }
        Ok(transfer)
    }

    pub async fn reject(&self, user: &User, id: &str) -> Result<TransferRequest, AppError> {
        let mut transfer = self.pending_for_processing(user, id).await?;
        transfer.statut = TransferStatus::Refusee;
        transfer.traite_par = Some(user.id.clone());
        transfer.processed_at = Some(Utc::now());
        self.transfers.save(&transfer).await?;

        tracing::info!(transfer_id = %transfer.id, "Transfer refused");
        Ok(transfer)
    }
}
