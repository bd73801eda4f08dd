// src/db.rs

pub mod document_store;
pub use document_store::{Document, DocumentStore, StoreError, WriteBatch};
pub mod memory_store;
pub use memory_store::MemoryDocumentStore;
pub mod pg_store;
pub use pg_store::PgDocumentStore;
pub mod resilient_store;
pub use resilient_store::ResilientStore;
pub mod repository;
pub use repository::Repository;
