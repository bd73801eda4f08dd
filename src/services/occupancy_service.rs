// src/services/occupancy_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::{
    common::error::AppError,
    db::{Document, DocumentStore, StoreError, WriteBatch},
    models::{
        room::{GenderMismatch, ReconciliationReport, Room},
        worker::{Occupant, Worker},
    },
};

/// (fermeId, room number) identifying the room a worker sleeps in.
pub type RoomKey = (String, String);

pub fn room_key(ferme_id: &str, numero: &str) -> RoomKey {
    (ferme_id.to_string(), numero.trim().to_string())
}

/// Groups the workers still active on `today` by the room they are assigned to.
pub fn group_active_workers(workers: &[Occupant], today: NaiveDate) -> HashMap<RoomKey, Vec<&Occupant>> {
    let mut groups: HashMap<RoomKey, Vec<&Occupant>> = HashMap::new();
    for worker in workers.iter().filter(|w| w.is_active_on(today)) {
        let Some(chambre) = worker.chambre.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };
        groups.entry(room_key(&worker.ferme_id, chambre)).or_default().push(worker);
    }
    groups
}

/// What reconciliation decided for one room.
#[derive(Debug, Default, PartialEq)]
pub struct RoomPlan {
    /// New sorted occupant list and count, when the stored ones are stale.
    pub update: Option<(Vec<String>, u32)>,
    pub mismatches: Vec<GenderMismatch>,
}

pub fn plan_room(room: &Room, group: &[&Occupant]) -> RoomPlan {
    let mut mismatches = Vec::new();
    let mut occupants = Vec::with_capacity(group.len());

    for worker in group {
        if room.genre.accepts(worker.sexe) {
            occupants.push(worker.id.clone());
        } else {
            mismatches.push(GenderMismatch {
                room_id: room.id.clone(),
                worker_id: worker.id.clone(),
            });
        }
    }
    occupants.sort();
    occupants.dedup();

    let mut stored = room.liste_occupants.clone();
    stored.sort();

    let count = occupants.len() as u32;
    let update = (stored != occupants || room.occupants_actuels != count).then_some((occupants, count));

    RoomPlan { update, mismatches }
}

/// Decodes raw documents, counting the ones that do not fit `T`.
fn decode_all<T: DeserializeOwned>(collection: &str, docs: Vec<Value>, skipped: &mut usize) -> Vec<T> {
    let mut decoded = Vec::with_capacity(docs.len());
    for doc in docs {
        let id = doc.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
        match serde_json::from_value(doc) {
            Ok(value) => decoded.push(value),
            Err(e) => {
                tracing::warn!(collection, id = %id, error = %e, "Document unusable for occupancy, left out");
                *skipped += 1;
            }
        }
    }
    decoded
}

/// Recomputes the denormalized occupancy of rooms from worker records.
///
/// Reads must come from the live store: a failed read aborts the run
/// rather than reconciling against a cached copy.
#[derive(Clone)]
pub struct OccupancyService {
    store: Arc<dyn DocumentStore>,
}

impl OccupancyService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn read_all(&self) -> Result<(Vec<Value>, Vec<Value>), AppError> {
        tokio::try_join!(self.store.list(Room::COLLECTION), self.store.list(Worker::COLLECTION))
            .map_err(AppError::ReconciliationFailed)
    }

    pub async fn reconcile_all(&self) -> Result<ReconciliationReport, AppError> {
        let (rooms, workers) = self.read_all().await?;
        self.apply(rooms, workers, |_| true).await
    }

    pub async fn reconcile_room(&self, room_id: &str) -> Result<ReconciliationReport, AppError> {
        let (room, workers) = tokio::try_join!(self.store.get(Room::COLLECTION, room_id), self.store.list(Worker::COLLECTION))
            .map_err(AppError::ReconciliationFailed)?;

        let room = room.ok_or_else(|| {
            AppError::from(StoreError::NotFound {
                collection: Room::COLLECTION.to_string(),
                id: room_id.to_string(),
            })
        })?;

        self.apply(vec![room], workers, |_| true).await
    }

    /// Reconciles every room matching one of `keys` (used after worker mutations).
    pub async fn reconcile_keys(&self, keys: &[RoomKey]) -> Result<ReconciliationReport, AppError> {
        if keys.is_empty() {
            return Ok(ReconciliationReport::default());
        }

        let (rooms, workers) = self.read_all().await?;
        self.apply(rooms, workers, |room| keys.contains(&room_key(&room.ferme_id, &room.numero)))
            .await
    }

    async fn apply<F>(&self, rooms: Vec<Value>, workers: Vec<Value>, wanted: F) -> Result<ReconciliationReport, AppError>
    where
        F: Fn(&Room) -> bool,
    {
        let mut report = ReconciliationReport::default();
        let rooms: Vec<Room> = decode_all(Room::COLLECTION, rooms, &mut report.skipped_documents);
        let workers: Vec<Occupant> = decode_all(Worker::COLLECTION, workers, &mut report.skipped_documents);

        let groups = group_active_workers(&workers, Utc::now().date_naive());
        let now = Utc::now();
        let mut batch = WriteBatch::new();

        for room in rooms.iter().filter(|&room| wanted(room)) {
            report.rooms_checked += 1;
            let group = groups
                .get(&room_key(&room.ferme_id, &room.numero))
                .map(Vec::as_slice)
                .unwrap_or_default();

            let plan = plan_room(room, group);
            for mismatch in &plan.mismatches {
                tracing::warn!(
                    room_id = %mismatch.room_id,
                    worker_id = %mismatch.worker_id,
                    genre = ?room.genre,
                    "⚠️ Worker gender does not match room, left out of occupants"
                );
            }
            report.gender_mismatches.extend(plan.mismatches);

            if let Some((occupants, count)) = plan.update {
                let mut fields = Map::new();
                fields.insert("listeOccupants".into(), json!(occupants));
                fields.insert("occupantsActuels".into(), json!(count));
                fields.insert("updatedAt".into(), json!(now));
                batch.update(Room::COLLECTION, &room.id, fields);
                report.rooms_updated += 1;
            }
        }

        if batch.is_empty() {
            tracing::debug!(rooms_checked = report.rooms_checked, "Room occupancy already consistent");
            return Ok(report);
        }

        self.store
            .commit(batch)
            .await
            .map_err(AppError::ReconciliationFailed)?;

        tracing::info!(
            rooms_checked = report.rooms_checked,
            rooms_updated = report.rooms_updated,
            mismatches = report.gender_mismatches.len(),
            skipped = report.skipped_documents,
            "🛏️ Room occupancy reconciled"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryDocumentStore,
        models::{room::RoomGender, worker::Gender},
        test_utils::{date, room, seed, test_state, worker},
    };
    use async_trait::async_trait;

    fn setup() -> (Arc<MemoryDocumentStore>, OccupancyService) {
        let memory = Arc::new(MemoryDocumentStore::new());
        (memory.clone(), OccupancyService::new(memory))
    }

    async fn stored_room(store: &MemoryDocumentStore, id: &str) -> Room {
        let value = store.get("rooms", id).await.unwrap().unwrap();
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn matching_worker_is_added_to_empty_room() {
        let (memory, service) = setup();
        seed(memory.as_ref(), &[room("r1", "F", "1", RoomGender::Hommes)]).await;
        seed(memory.as_ref(), &[worker("w1", "F", Some("1"), Gender::Homme)]).await;
        let commits = memory.commit_count();

        let report = service.reconcile_all().await.unwrap();

        assert_eq!(report.rooms_updated, 1);
        assert_eq!(memory.commit_count(), commits + 1);
        let r1 = stored_room(&memory, "r1").await;
        assert_eq!(r1.liste_occupants, vec!["w1"]);
        assert_eq!(r1.occupants_actuels, 1);
        assert!(r1.updated_at.is_some());
    }

    #[tokio::test]
    async fn gender_mismatch_is_excluded_and_nothing_is_written() {
        let (memory, service) = setup();
        seed(memory.as_ref(), &[room("r1", "F", "1", RoomGender::Hommes)]).await;
        seed(memory.as_ref(), &[worker("w1", "F", Some("1"), Gender::Femme)]).await;
        let commits = memory.commit_count();

        let report = service.reconcile_all().await.unwrap();

        assert_eq!(report.rooms_updated, 0);
        assert_eq!(
            report.gender_mismatches,
            vec![GenderMismatch { room_id: "r1".into(), worker_id: "w1".into() }]
        );
        assert_eq!(memory.commit_count(), commits);
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let (memory, service) = setup();
        seed(memory.as_ref(), &[room("r1", "F", "1", RoomGender::Hommes), room("r2", "F", "2", RoomGender::Femmes)]).await;
        seed(
            memory.as_ref(),
            &[
                worker("w2", "F", Some("1"), Gender::Homme),
                worker("w1", "F", Some("1"), Gender::Homme),
                worker("w3", "F", Some("2"), Gender::Femme),
            ],
        )
        .await;

        let first = service.reconcile_all().await.unwrap();
        assert_eq!(first.rooms_updated, 2);
        assert_eq!(stored_room(&memory, "r1").await.liste_occupants, vec!["w1", "w2"]);
        let commits = memory.commit_count();

        let second = service.reconcile_all().await.unwrap();
        assert_eq!(second.rooms_checked, 2);
        assert_eq!(second.rooms_updated, 0);
        assert_eq!(memory.commit_count(), commits);
    }

    #[tokio::test]
    async fn rooms_are_keyed_by_farm_and_number() {
        let (memory, service) = setup();
        seed(memory.as_ref(), &[room("a1", "A", "1", RoomGender::Hommes), room("b1", "B", "1", RoomGender::Hommes)]).await;
        seed(memory.as_ref(), &[worker("w1", "A", Some(" 1 "), Gender::Homme)]).await;

        service.reconcile_all().await.unwrap();

        assert_eq!(stored_room(&memory, "a1").await.occupants_actuels, 1);
        assert_eq!(stored_room(&memory, "b1").await.occupants_actuels, 0);
    }

    #[tokio::test]
    async fn exited_workers_leave_their_room() {
        let (memory, service) = setup();
        let mut r1 = room("r1", "F", "1", RoomGender::Hommes);
        r1.liste_occupants = vec!["w1".into(), "w2".into()];
        r1.occupants_actuels = 2;
        seed(memory.as_ref(), &[r1]).await;

        let mut gone = worker("w1", "F", Some("1"), Gender::Homme);
        gone.date_sortie = Some(date(2020, 1, 1));
        let mut leaving_later = worker("w2", "F", Some("1"), Gender::Homme);
        leaving_later.date_sortie = Some(date(2999, 1, 1));
        seed(memory.as_ref(), &[gone, leaving_later]).await;

        service.reconcile_all().await.unwrap();

        let r1 = stored_room(&memory, "r1").await;
        assert_eq!(r1.liste_occupants, vec!["w2"]);
        assert_eq!(r1.occupants_actuels, 1);
    }

    #[test]
    fn stale_count_alone_triggers_update() {
        let mut r1 = room("r1", "F", "1", RoomGender::Hommes);
        r1.liste_occupants = vec!["w1".into()];
        r1.occupants_actuels = 3;
        let w1 = Occupant::from(&worker("w1", "F", Some("1"), Gender::Homme));

        let plan = plan_room(&r1, &[&w1]);
        assert_eq!(plan.update, Some((vec!["w1".to_string()], 1)));
    }

    #[test]
    fn stored_order_does_not_matter() {
        let mut r1 = room("r1", "F", "1", RoomGender::Femmes);
        r1.liste_occupants = vec!["w2".into(), "w1".into()];
        r1.occupants_actuels = 2;
        let w1 = Occupant::from(&worker("w1", "F", Some("1"), Gender::Femme));
        let w2 = Occupant::from(&worker("w2", "F", Some("1"), Gender::Femme));

        assert_eq!(plan_room(&r1, &[&w2, &w1]).update, None);
    }

    #[test]
    fn active_is_strictly_after_today() {
        let today = date(2025, 3, 10);
        let mut w1 = worker("w1", "F", Some("1"), Gender::Homme);
        w1.date_sortie = Some(today);
        let mut w2 = worker("w2", "F", Some("1"), Gender::Homme);
        w2.date_sortie = Some(date(2025, 3, 11));
        let w3 = worker("w3", "F", None, Gender::Homme);

        let workers: Vec<Occupant> = [w1, w2, w3].iter().map(Occupant::from).collect();
        let groups = group_active_workers(&workers, today);

        assert_eq!(groups.len(), 1);
        let ids: Vec<&str> = groups[&room_key("F", "1")].iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["w2"]);
    }

    #[tokio::test]
    async fn read_failure_aborts_without_writing() {
        let (memory, service) = setup();
        seed(memory.as_ref(), &[room("r1", "F", "1", RoomGender::Hommes)]).await;
        seed(memory.as_ref(), &[worker("w1", "F", Some("1"), Gender::Homme)]).await;
        let commits = memory.commit_count();

        memory.fail_next(StoreError::Network("connection reset".into())).await;
        let err = service.reconcile_all().await.unwrap_err();

        assert!(matches!(err, AppError::ReconciliationFailed(StoreError::Network(_))));
        assert_eq!(memory.commit_count(), commits);
        assert_eq!(stored_room(&memory, "r1").await.occupants_actuels, 0);
    }

    // Reads pass through, every commit fails.
    struct ReadOnlyStore(Arc<MemoryDocumentStore>);

    #[async_trait]
    impl DocumentStore for ReadOnlyStore {
        async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
            self.0.list(collection).await
        }

        async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
            self.0.get(collection, id).await
        }

        async fn commit(&self, _batch: WriteBatch) -> Result<(), StoreError> {
            Err(StoreError::PermissionDenied("read only".into()))
        }
    }

    #[tokio::test]
    async fn commit_failure_is_reported() {
        let memory = Arc::new(MemoryDocumentStore::new());
        seed(memory.as_ref(), &[room("r1", "F", "1", RoomGender::Hommes)]).await;
        seed(memory.as_ref(), &[worker("w1", "F", Some("1"), Gender::Homme)]).await;
        let service = OccupancyService::new(Arc::new(ReadOnlyStore(memory.clone())));

        let err = service.reconcile_all().await.unwrap_err();
        assert!(matches!(err, AppError::ReconciliationFailed(StoreError::PermissionDenied(_))));

        // Nothing committed: a second run still finds the same work to do
        let service = OccupancyService::new(memory.clone());
        assert_eq!(service.reconcile_all().await.unwrap().rooms_updated, 1);
    }

    #[tokio::test]
    async fn single_room_touches_only_that_room() {
        let (memory, service) = setup();
        seed(memory.as_ref(), &[room("r1", "F", "1", RoomGender::Hommes), room("r2", "F", "2", RoomGender::Hommes)]).await;
        seed(
            memory.as_ref(),
            &[worker("w1", "F", Some("1"), Gender::Homme), worker("w2", "F", Some("2"), Gender::Homme)],
        )
        .await;

        let report = service.reconcile_room("r2").await.unwrap();

        assert_eq!(report.rooms_checked, 1);
        assert_eq!(stored_room(&memory, "r1").await.occupants_actuels, 0);
        assert_eq!(stored_room(&memory, "r2").await.liste_occupants, vec!["w2"]);
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let (_memory, service) = setup();
        let err = service.reconcile_room("nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn empty_key_list_reads_nothing() {
        let (memory, service) = setup();
        memory.set_offline(StoreError::Network("down".into())).await;
        let report = service.reconcile_keys(&[]).await.unwrap();
        assert_eq!(report.rooms_checked, 0);
    }

    #[tokio::test]
    async fn sparse_stored_documents_are_reconciled() {
        let (memory, service) = setup();
        memory
            .set(
                "rooms",
                "r1",
                json!({"id": "r1", "fermeId": "f1", "numero": "10", "genre": "hommes", "occupantsActuels": 0, "listeOccupants": []}),
            )
            .await
            .unwrap();
        memory
            .set(
                "workers",
                "w1",
                json!({"id": "w1", "fermeId": "f1", "chambre": "10", "sexe": "homme", "statut": "actif"}),
            )
            .await
            .unwrap();

        let report = service.reconcile_all().await.unwrap();

        assert_eq!(report.rooms_checked, 1);
        assert_eq!(report.rooms_updated, 1);
        assert_eq!(report.skipped_documents, 0);
        let r1 = memory.get("rooms", "r1").await.unwrap().unwrap();
        assert_eq!(r1["listeOccupants"], json!(["w1"]));
        assert_eq!(r1["occupantsActuels"], 1);
    }

    #[tokio::test]
    async fn undecodable_documents_are_counted() {
        let (memory, service) = setup();
        seed(memory.as_ref(), &[room("r1", "F", "1", RoomGender::Hommes)]).await;
        seed(memory.as_ref(), &[worker("w1", "F", Some("1"), Gender::Homme)]).await;
        memory
            .set("workers", "w2", json!({"id": "w2", "fermeId": "F", "chambre": "1"}))
            .await
            .unwrap();

        let report = service.reconcile_all().await.unwrap();

        assert_eq!(report.skipped_documents, 1);
        assert_eq!(stored_room(&memory, "r1").await.liste_occupants, vec!["w1"]);
    }

    #[tokio::test]
    async fn app_state_reconciliation_does_not_read_from_cache() {
        let (memory, state) = test_state();
        seed(memory.as_ref(), &[room("r1", "F", "1", RoomGender::Hommes)]).await;
        state.store.list("rooms").await.unwrap();
        state.store.list("workers").await.unwrap();
        seed(memory.as_ref(), &[worker("w1", "F", Some("1"), Gender::Homme)]).await;
        let commits = memory.commit_count();

        memory.fail_next(StoreError::Network("connection reset".into())).await;
        let err = state.occupancy_service.reconcile_all().await.unwrap_err();

        assert!(matches!(err, AppError::ReconciliationFailed(StoreError::Network(_))));
        assert_eq!(memory.commit_count(), commits);
        assert_eq!(stored_room(&memory, "r1").await.occupants_actuels, 0);

        // Regular reads still fall back to the cached copy
        memory.set_offline(StoreError::Network("down".into())).await;
        assert_eq!(state.store.list("rooms").await.unwrap().len(), 1);
        assert!(state.occupancy_service.reconcile_all().await.is_err());
    }
}
