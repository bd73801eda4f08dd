// src/db/pg_store.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool};

use super::document_store::{DocumentStore, StoreError, WriteBatch, WriteOp};

/// Postgres SQLSTATE for "insufficient_privilege".
const INSUFFICIENT_PRIVILEGE: &str = "42501";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Network(err.to_string()),
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some(INSUFFICIENT_PRIVILEGE) => {
                StoreError::PermissionDenied(db_err.message().to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => StoreError::Serialization(err.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Document store on a single JSONB table (see `migrations/`).
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT data FROM documents WHERE collection = $1 ORDER BY id",
        )
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|Json(data)| data).collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT data FROM documents WHERE collection = $1 AND id = $2",
        )
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|Json(data)| data))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        // --- START OF TRANSACTION ---
        // Dropping `tx` on an early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        for op in batch.into_ops() {
            match op {
                WriteOp::Set { collection, id, data } => {
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, data)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (collection, id)
                        DO UPDATE SET data = EXCLUDED.data, updated_at = now()
                        "#,
                    )
                        .bind(&collection)
                        .bind(&id)
                        .bind(Json(data))
                        .execute(&mut *tx)
                        .await?;
                }
                WriteOp::Update { collection, id, fields } => {
                    let result = sqlx::query(
                        r#"
                        UPDATE documents
                        SET data = data || $3, updated_at = now()
                        WHERE collection = $1 AND id = $2
                        "#,
                    )
                        .bind(&collection)
                        .bind(&id)
                        .bind(Json(Value::Object(fields)))
                        .execute(&mut *tx)
                        .await?;

                    if result.rows_affected() == 0 {
                        return Err(StoreError::NotFound { collection, id });
                    }
                }
                WriteOp::Delete { collection, id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(&collection)
                        .bind(&id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        // --- END OF TRANSACTION ---
        Ok(())
    }
}
