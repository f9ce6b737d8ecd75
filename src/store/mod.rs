//! Document collections.
//!
//! A [`DocumentStore`] holds named collections of JSON documents. Each insert
//! gets a fresh identifier, so inserting the same body twice yields two
//! records. Two backends ship with the crate:
//!
//! - [`PostgresDocumentStore`]: one table per collection, bodies in a JSONB column
//! - [`MemoryDocumentStore`]: in-process, for tests and dry runs

mod memory;
mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

use crate::document::{Document, InsertOneResult, StoredDocument};
use crate::error::StoreError;

pub trait DocumentStore {
    /// Create the collection if it does not exist yet. Idempotent.
    fn ensure_collection(&self, collection: &str) -> Result<(), StoreError>;

    /// Insert a single document and return its assigned identifier.
    fn insert_one(&self, collection: &str, document: Document)
        -> Result<InsertOneResult, StoreError>;

    /// All documents of a collection, oldest first.
    fn find_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError>;

    fn count(&self, collection: &str) -> Result<u64, StoreError>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        (**self).ensure_collection(collection)
    }

    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, StoreError> {
        (**self).insert_one(collection, document)
    }

    fn find_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        (**self).find_all(collection)
    }

    fn count(&self, collection: &str) -> Result<u64, StoreError> {
        (**self).count(collection)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for Box<S> {
    fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        (**self).ensure_collection(collection)
    }

    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, StoreError> {
        (**self).insert_one(collection, document)
    }

    fn find_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        (**self).find_all(collection)
    }

    fn count(&self, collection: &str) -> Result<u64, StoreError> {
        (**self).count(collection)
    }
}
