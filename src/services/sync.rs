// src/services/sync.rs
// Periodic background reconciliation of room occupancy.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::{db::ResilientStore, services::occupancy_service::OccupancyService};

pub struct OccupancySync {
    store: Arc<ResilientStore>,
    occupancy: OccupancyService,
    interval: Duration,
}

impl OccupancySync {
    pub fn new(store: Arc<ResilientStore>, occupancy: OccupancyService, interval: Duration) -> Self {
        Self { store, occupancy, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Occupancy sync starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Occupancy sync received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn tick(&self) {
        if !self.store.is_available().await {
            let state = self.store.state().await;
            tracing::debug!(?state, "Store unavailable, skipping occupancy sync");
            return;
        }

        match self.occupancy.reconcile_all().await {
            Ok(report) if report.rooms_updated > 0 => {
                tracing::info!(rooms_updated = report.rooms_updated, "Periodic sync corrected room occupancy");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Periodic occupancy sync failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{DocumentStore, MemoryDocumentStore},
        models::{room::{Room, RoomGender}, worker::Gender},
        resilience::{CircuitBreaker, CircuitBreakerConfig},
        test_utils::{room, seed, worker},
    };

    async fn setup() -> (Arc<MemoryDocumentStore>, Arc<ResilientStore>, OccupancySync) {
        let memory = Arc::new(MemoryDocumentStore::new());
        seed(memory.as_ref(), &[room("r1", "F", "1", RoomGender::Hommes)]).await;
        seed(memory.as_ref(), &[worker("w1", "F", Some("1"), Gender::Homme)]).await;

        let breaker = Arc::new(CircuitBreaker::new("store", CircuitBreakerConfig::default()));
        let store = Arc::new(ResilientStore::new(memory.clone(), breaker));
        let occupancy = OccupancyService::new(store.strict());
        let sync = OccupancySync::new(store.clone(), occupancy, Duration::from_secs(60));
        (memory, store, sync)
    }

    async fn occupants(memory: &MemoryDocumentStore) -> u32 {
        let value = memory.get("rooms", "r1").await.unwrap().unwrap();
        serde_json::from_value::<Room>(value).unwrap().occupants_actuels
    }

    #[tokio::test(start_paused = true)]
    async fn reconciles_on_tick_and_stops_on_shutdown() {
        let (memory, _store, sync) = setup().await;
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(sync.run(rx));

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(occupants(&memory).await, 1);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn skips_while_circuit_is_open() {
        let (memory, store, sync) = setup().await;
        store.breaker().force_open().await;

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(sync.run(rx));

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(occupants(&memory).await, 0);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
