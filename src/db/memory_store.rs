// src/db/memory_store.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use super::document_store::{merge_fields, DocumentStore, StoreError, WriteBatch, WriteOp};

type Collections = HashMap<String, BTreeMap<String, Value>>;

/// Process-local store used for development (`STORE_BACKEND=memory`) and tests.
///
/// Failures can be injected to exercise the breaker and the offline cache.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<Collections>,
    offline: Mutex<Option<StoreError>>,
    pending_failures: Mutex<Vec<StoreError>>,
    commits: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `err` until `set_online` is called.
    pub async fn set_offline(&self, err: StoreError) {
        *self.offline.lock().await = Some(err);
    }

    pub async fn set_online(&self) {
        *self.offline.lock().await = None;
    }

    /// The next call fails once with `err`.
    pub async fn fail_next(&self, err: StoreError) {
        self.pending_failures.lock().await.push(err);
    }

    /// Number of batches successfully committed so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    async fn check_failure(&self) -> Result<(), StoreError> {
        if let Some(err) = self.offline.lock().await.clone() {
            return Err(err);
        }
        let mut pending = self.pending_failures.lock().await;
        if pending.is_empty() {
            Ok(())
        } else {
            Err(pending.remove(0))
        }
    }
}

fn apply(collections: &mut Collections, op: WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::Set { collection, id, data } => {
            collections.entry(collection).or_default().insert(id, data);
        }
        WriteOp::Update { collection, id, fields } => {
            let doc = collections
                .get_mut(&collection)
                .and_then(|docs| docs.get_mut(&id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.clone(),
                    id: id.clone(),
                })?;
            merge_fields(doc, &fields);
        }
        WriteOp::Delete { collection, id } => {
            if let Some(docs) = collections.get_mut(&collection) {
                docs.remove(&id);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.check_failure().await?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.check_failure().await?;
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.check_failure().await?;
        let mut collections = self.collections.write().await;

        // Applied to a copy so a failing op leaves the store untouched.
        let mut staged = collections.clone();
        for op in batch.into_ops() {
            apply(&mut staged, op)?;
        }
        *collections = staged;

        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[tokio::test]
    async fn failed_batch_leaves_store_untouched() {
        let store = MemoryDocumentStore::new();
        store.set("rooms", "r1", json!({"id": "r1", "numero": "1"})).await.unwrap();

        let mut fields = Map::new();
        fields.insert("numero".into(), json!("2"));
        let mut batch = WriteBatch::new();
        batch.update("rooms", "r1", fields.clone());
        batch.update("rooms", "missing", fields);

        let err = store.commit(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let room = store.get("rooms", "r1").await.unwrap().unwrap();
        assert_eq!(room["numero"], "1");
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = MemoryDocumentStore::new();
        store.fail_next(StoreError::Network("reset".into())).await;

        assert!(store.list("workers").await.is_err());
        assert!(store.list("workers").await.is_ok());

        store.set_offline(StoreError::Network("down".into())).await;
        assert!(store.get("workers", "w1").await.is_err());
        store.set_online().await;
        assert!(store.get("workers", "w1").await.unwrap().is_none());
    }
}
