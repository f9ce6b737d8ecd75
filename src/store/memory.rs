use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use super::DocumentStore;
use crate::document::{validate_collection_name, Document, InsertOneResult, StoredDocument};
use crate::error::StoreError;

/// In-process document store.
///
/// Collections are created implicitly on first insert, the way a document
/// database creates them. Reads of an unknown collection return nothing.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<StoredDocument>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<StoredDocument>>>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".to_string()))
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        validate_collection_name(collection)?;
        self.lock()?.entry(collection.to_string()).or_default();
        Ok(())
    }

    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, StoreError> {
        validate_collection_name(collection)?;
        let id = Uuid::new_v4();
        self.lock()?
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id,
                body: document,
                created_at: Utc::now(),
            });
        Ok(InsertOneResult { inserted_id: id })
    }

    fn find_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        validate_collection_name(collection)?;
        Ok(self.lock()?.get(collection).cloned().unwrap_or_default())
    }

    fn count(&self, collection: &str) -> Result<u64, StoreError> {
        validate_collection_name(collection)?;
        Ok(self.lock()?.get(collection).map_or(0, |docs| docs.len() as u64))
    }
}
