// src/services/dashboard_service.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::{DocumentStore, Repository},
    middleware::ferme::FermeScope,
    models::{
        dashboard::DashboardSummary,
        room::Room,
        stock::StockArticle,
        supervisor::Supervisor,
        transfer::{TransferRequest, TransferStatus},
        worker::{Gender, Worker},
        Statut,
    },
};

#[derive(Clone)]
pub struct DashboardService {
    workers: Repository<Worker>,
    rooms: Repository<Room>,
    supervisors: Repository<Supervisor>,
    transfers: Repository<TransferRequest>,
    stock: Repository<StockArticle>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            workers: Repository::new(store.clone()),
            rooms: Repository::new(store.clone()),
            supervisors: Repository::new(store.clone()),
            transfers: Repository::new(store.clone()),
            stock: Repository::new(store),
        }
    }

    pub async fn get_summary(&self, scope: &FermeScope) -> Result<DashboardSummary, AppError> {
        let (workers, rooms, supervisors, transfers, stock) = tokio::try_join!(
            self.workers.list_where(|w| scope.includes(&w.ferme_id)),
            self.rooms.list_where(|r| scope.includes(&r.ferme_id)),
            self.supervisors.list(),
            self.transfers.list_where(|t| scope.includes(&t.to_ferme_id) && t.statut == TransferStatus::EnAttente),
            self.stock.list_where(|a| scope.includes(&a.ferme_id)),
        )?;

        let today = Utc::now().date_naive();
        let active: Vec<&Worker> = workers.iter().filter(|w| w.is_active_on(today)).collect();

        let total_capacity: u32 = rooms.iter().map(|r| r.capacite).sum();
        let occupied_places: u32 = rooms.iter().map(|r| r.occupants_actuels).sum();

        Ok(DashboardSummary {
            active_workers: active.len(),
            hommes: active.iter().filter(|w| w.sexe == Gender::Homme).count(),
            femmes: active.iter().filter(|w| w.sexe == Gender::Femme).count(),
            rooms: rooms.len(),
            total_capacity,
            occupied_places,
            occupancy_rate: if total_capacity == 0 {
                0.0
            } else {
                f64::from(occupied_places) / f64::from(total_capacity)
            },
            active_supervisors: supervisors.iter().filter(|s| s.statut == Statut::Actif).count(),
            pending_transfers: transfers.len(),
            low_stock_articles: stock.iter().filter(|a| a.is_low()).count(),
        })
    }
}
