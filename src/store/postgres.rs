//! PostgreSQL-backed collections.
//!
//! Table layout per collection:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS "<collection>" (
//!     id UUID PRIMARY KEY,
//!     body JSONB NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! )
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::DocumentStore;
use crate::document::{validate_collection_name, Document, InsertOneResult, StoredDocument};
use crate::error::StoreError;
use crate::executor::{Executor, MayPostgresExecutor};

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

pub struct PostgresDocumentStore<E: Executor = MayPostgresExecutor> {
    executor: E,
}

impl<E: Executor> PostgresDocumentStore<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }
}

impl PostgresDocumentStore<MayPostgresExecutor> {
    /// Open a client with [`crate::connect`] and wrap it.
    pub fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let client = crate::connection::connect(connection_string)?;
        Ok(Self::new(MayPostgresExecutor::new(client)))
    }
}

/// Double-quoted identifier. Keeps reserved words (`user`, `order`) usable and
/// case significant, matching the memory store.
fn table(collection: &str) -> String {
    format!("\"{collection}\"")
}

fn create_collection_sql(collection: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         id UUID PRIMARY KEY, \
         body JSONB NOT NULL, \
         created_at TIMESTAMPTZ NOT NULL DEFAULT now())",
        table(collection)
    )
}

fn insert_sql(collection: &str) -> String {
    format!(
        "INSERT INTO {} (id, body) VALUES ($1, $2) RETURNING id",
        table(collection)
    )
}

fn find_all_sql(collection: &str) -> String {
    format!(
        "SELECT id, body, created_at FROM {} ORDER BY created_at, id",
        table(collection)
    )
}

fn count_sql(collection: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", table(collection))
}

impl<E: Executor> DocumentStore for PostgresDocumentStore<E> {
    fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        validate_collection_name(collection)?;
        self.executor.execute(&create_collection_sql(collection), &[])?;
        log::info!("collection {} ready", collection);
        Ok(())
    }

    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, StoreError> {
        validate_collection_name(collection)?;

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::insert_document_span(collection).entered();

        let id = Uuid::new_v4();
        let body = Value::Object(document);
        let row = self
            .executor
            .query_one(&insert_sql(collection), &[&id, &body])?;
        let inserted_id: Uuid = row.try_get(0)?;

        #[cfg(feature = "metrics")]
        METRICS.record_document_inserted(collection);
        log::debug!("inserted {} into {}", inserted_id, collection);

        Ok(InsertOneResult { inserted_id })
    }

    fn find_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        validate_collection_name(collection)?;
        let rows = self.executor.query_all(&find_all_sql(collection), &[])?;

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get(0)?;
                let body: Value = row.try_get(1)?;
                let created_at: DateTime<Utc> = row.try_get(2)?;
                match body {
                    Value::Object(body) => Ok(StoredDocument {
                        id,
                        body,
                        created_at,
                    }),
                    other => Err(StoreError::Other(format!(
                        "document {id} in {collection} is not an object: {other}"
                    ))),
                }
            })
            .collect()
    }

    fn count(&self, collection: &str) -> Result<u64, StoreError> {
        validate_collection_name(collection)?;
        let row = self.executor.query_one(&count_sql(collection), &[])?;
        let count: i64 = row.try_get(0)?;
        u64::try_from(count).map_err(|_| StoreError::Other(format!("negative count {count}")))
    }
}
