// src/db/repository.rs

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::document_store::{Document, DocumentStore, StoreError};

/// Typed access to one collection.
#[derive(Clone)]
pub struct Repository<D> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> D>,
}

impl<D: Document> Repository<D> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    fn decode(value: Value) -> Option<D> {
        match serde_json::from_value::<D>(value) {
            Ok(doc) => Some(doc),
            Err(e) => {
                // Managed-database data is not schema-checked; a bad record
                // must not hide the rest of the collection.
                tracing::warn!(collection = D::COLLECTION, error = %e, "Skipping malformed document");
                None
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<D>, StoreError> {
        let docs = self.store.list(D::COLLECTION).await?;
        Ok(docs.into_iter().filter_map(Self::decode).collect())
    }

    pub async fn list_where<P>(&self, predicate: P) -> Result<Vec<D>, StoreError>
    where
        P: Fn(&D) -> bool,
    {
        Ok(self.list().await?.into_iter().filter(|doc| predicate(doc)).collect())
    }

    pub async fn find(&self, id: &str) -> Result<Option<D>, StoreError> {
        match self.store.get(D::COLLECTION, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: &str) -> Result<D, StoreError> {
        self.find(id).await?.ok_or_else(|| StoreError::NotFound {
            collection: D::COLLECTION.to_string(),
            id: id.to_string(),
        })
    }

    pub async fn save(&self, doc: &D) -> Result<(), StoreError> {
        let data = serde_json::to_value(doc)?;
        self.store.set(D::COLLECTION, doc.id(), data).await
    }

    pub async fn update_fields(&self, id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.store.update(D::COLLECTION, id, fields).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(D::COLLECTION, id).await
    }
}
