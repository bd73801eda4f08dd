// src/db/document_store.rs

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Failures reported by a document store backend.
///
/// The `Network` message is phrased so the circuit breaker classifies it as
/// a transient network failure.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("invalid document data: {0}")]
    Serialization(String),

    #[error("store failure: {0}")]
    Backend(String),

    #[error("document store unavailable (circuit open)")]
    CircuitOpen,
}

impl StoreError {
    /// True for failures that mean "the store cannot be reached right now".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Network(_) | StoreError::CircuitOpen)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// A typed record stored in a named collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

/// One staged write of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or fully replace a document.
    Set { collection: String, id: String, data: Value },
    /// Merge top-level fields into an existing document; fails if it is missing.
    Update { collection: String, id: String, fields: Map<String, Value> },
    Delete { collection: String, id: String },
}

/// Writes applied all together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<D: Document>(&mut self, doc: &D) -> Result<&mut Self, StoreError> {
        let data = serde_json::to_value(doc)?;
        self.ops.push(WriteOp::Set {
            collection: D::COLLECTION.to_string(),
            id: doc.id().to_string(),
            data,
        });
        Ok(self)
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Map<String, Value>) -> &mut Self {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// The seam between business logic and the managed document database.
///
/// Only reads and batch commits are required; single writes are one-op batches.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.ops.push(WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
        });
        self.commit(batch).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, fields);
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);
        self.commit(batch).await
    }
}

/// Merges `fields` into `target` (top-level keys only, like a document update).
pub(crate) fn merge_fields(target: &mut Value, fields: &Map<String, Value>) {
    if let Value::Object(map) = target {
        for (key, value) in fields {
            map.insert(key.clone(), value.clone());
        }
    }
}
