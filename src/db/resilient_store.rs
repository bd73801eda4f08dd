// src/db/resilient_store.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::document_store::{merge_fields, DocumentStore, StoreError, WriteBatch, WriteOp};
use crate::resilience::{CircuitBreaker, CircuitBreakerError, CircuitState};

/// Sentinel document read by the connectivity probe.
pub const HEALTH_COLLECTION: &str = "_health";
pub const HEALTH_DOCUMENT: &str = "ping";

fn flatten(err: CircuitBreakerError<StoreError>) -> StoreError {
    match err {
        CircuitBreakerError::CircuitOpen { .. } => StoreError::CircuitOpen,
        CircuitBreakerError::OperationFailed(err) => err,
    }
}

/// Wraps a backend with the circuit breaker and an offline read cache.
///
/// Every successful `list` is remembered; while the store is unreachable
/// (network failure or open circuit) reads are served from that copy.
/// Writes are never queued: they fail and the caller decides.
pub struct ResilientStore {
    inner: Arc<dyn DocumentStore>,
    breaker: Arc<CircuitBreaker>,
    cache: RwLock<HashMap<String, Vec<Value>>>,
}

impl ResilientStore {
    pub fn new(inner: Arc<dyn DocumentStore>, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            inner,
            breaker,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn is_available(&self) -> bool {
        self.breaker.is_available().await
    }

    pub async fn state(&self) -> CircuitState {
        self.breaker.state().await
    }

    /// Lightweight read of the sentinel document, routed through the breaker.
    pub async fn probe(&self) -> Result<(), StoreError> {
        self.breaker
            .execute(|| self.inner.get(HEALTH_COLLECTION, HEALTH_DOCUMENT))
            .await
            .map(|_| ())
            .map_err(flatten)
    }

    /// View of this store whose reads fail instead of falling back to the cache.
    ///
    /// Writes still go through `commit` here so the cache stays current.
    pub fn strict(self: &Arc<Self>) -> Arc<dyn DocumentStore> {
        Arc::new(StrictReads(self.clone()))
    }

    async fn live_list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let docs = self
            .breaker
            .execute(|| self.inner.list(collection))
            .await
            .map_err(flatten)?;
        self.cache.write().await.insert(collection.to_string(), docs.clone());
        Ok(docs)
    }

    async fn live_get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.breaker
            .execute(|| self.inner.get(collection, id))
            .await
            .map_err(flatten)
    }

    async fn cached_list(&self, collection: &str) -> Option<Vec<Value>> {
        self.cache.read().await.get(collection).cloned()
    }

    async fn apply_to_cache(&self, ops: &[WriteOp]) {
        let mut cache = self.cache.write().await;
        for op in ops {
            match op {
                WriteOp::Set { collection, id, data } => {
                    if let Some(docs) = cache.get_mut(collection) {
                        docs.retain(|doc| doc.get("id").and_then(Value::as_str) != Some(id.as_str()));
                        docs.push(data.clone());
                    }
                }
                WriteOp::Update { collection, id, fields } => {
                    if let Some(doc) = cache
                        .get_mut(collection)
                        .and_then(|docs| docs.iter_mut().find(|doc| doc.get("id").and_then(Value::as_str) == Some(id.as_str())))
                    {
                        merge_fields(doc, fields);
                    }
                }
                WriteOp::Delete { collection, id } => {
                    if let Some(docs) = cache.get_mut(collection) {
                        docs.retain(|doc| doc.get("id").and_then(Value::as_str) != Some(id.as_str()));
                    }
                }
            }
        }
    }
}

#[async_trait]
impl DocumentStore for ResilientStore {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        match self.live_list(collection).await {
            Ok(docs) => Ok(docs),
            Err(err) if err.is_unavailable() => match self.cached_list(collection).await {
                Some(docs) => {
                    tracing::warn!(collection, error = %err, "📦 Store unreachable, serving cached documents");
                    Ok(docs)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        match self.live_get(collection, id).await {
            Ok(doc) => Ok(doc),
            Err(err) if err.is_unavailable() => match self.cached_list(collection).await {
                Some(docs) => {
                    tracing::warn!(collection, id, error = %err, "📦 Store unreachable, serving cached document");
                    Ok(docs
                        .into_iter()
                        .find(|doc| doc.get("id").and_then(Value::as_str) == Some(id)))
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let ops = batch.ops().to_vec();
        self.breaker
            .execute(|| self.inner.commit(batch))
            .await
            .map_err(flatten)?;

        self.apply_to_cache(&ops).await;
        Ok(())
    }
}

struct StrictReads(Arc<ResilientStore>);

#[async_trait]
impl DocumentStore for StrictReads {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.0.live_list(collection).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.0.live_get(collection, id).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.0.commit(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_store::MemoryDocumentStore;
    use crate::resilience::CircuitBreakerConfig;
    use serde_json::json;

    fn setup() -> (Arc<MemoryDocumentStore>, ResilientStore) {
        let memory = Arc::new(MemoryDocumentStore::new());
        let breaker = Arc::new(CircuitBreaker::new("store", CircuitBreakerConfig::default()));
        let store = ResilientStore::new(memory.clone(), breaker);
        (memory, store)
    }

    #[tokio::test]
    async fn serves_cached_list_when_offline() {
        let (memory, store) = setup();
        store.set("fermes", "f1", json!({"id": "f1", "nom": "Ferme A"})).await.unwrap();
        assert_eq!(store.list("fermes").await.unwrap().len(), 1);

        memory.set_offline(StoreError::Network("unreachable".into())).await;

        let cached = store.list("fermes").await.unwrap();
        assert_eq!(cached[0]["nom"], "Ferme A");
        let one = store.get("fermes", "f1").await.unwrap();
        assert!(one.is_some());
        assert!(store.list("workers").await.is_err());
    }

    #[tokio::test]
    async fn open_circuit_rejects_writes() {
        let (memory, store) = setup();
        memory.set_offline(StoreError::PermissionDenied("rules".into())).await;

        for _ in 0..5 {
            assert!(store.list("workers").await.is_err());
        }
        assert!(!store.is_available().await);

        memory.set_online().await;
        let err = store.set("workers", "w1", json!({"id": "w1"})).await.unwrap_err();
        assert!(matches!(err, StoreError::CircuitOpen));
        assert_eq!(memory.commit_count(), 0);
    }

    #[tokio::test]
    async fn cache_follows_committed_writes() {
        let (memory, store) = setup();
        store.set("rooms", "r1", json!({"id": "r1", "occupantsActuels": 0})).await.unwrap();
        store.list("rooms").await.unwrap();

        let mut fields = serde_json::Map::new();
        fields.insert("occupantsActuels".into(), json!(2));
        store.update("rooms", "r1", fields).await.unwrap();

        memory.set_offline(StoreError::Network("down".into())).await;
        let rooms = store.list("rooms").await.unwrap();
        assert_eq!(rooms[0]["occupantsActuels"], 2);
    }

    #[tokio::test]
    async fn strict_view_never_serves_the_cache() {
        let (memory, store) = setup();
        let store = Arc::new(store);
        store.set("rooms", "r1", json!({"id": "r1"})).await.unwrap();
        let strict = store.strict();
        assert_eq!(strict.list("rooms").await.unwrap().len(), 1);

        memory.set_offline(StoreError::Network("down".into())).await;
        assert!(matches!(strict.list("rooms").await, Err(StoreError::Network(_))));
        assert!(matches!(strict.get("rooms", "r1").await, Err(StoreError::Network(_))));
        assert_eq!(store.list("rooms").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn probe_reports_reachability() {
        let (memory, store) = setup();
        assert!(store.probe().await.is_ok());

        memory.set_offline(StoreError::Network("down".into())).await;
        assert!(store.probe().await.is_err());
    }
}
