//! Document and acknowledgment types shared by every [`DocumentStore`](crate::store::DocumentStore).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// A schema-flexible JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Acknowledgment returned by `insert_one`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InsertOneResult {
    pub inserted_id: Uuid,
}

/// A document as read back from a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: Uuid,
    pub body: Document,
    pub created_at: DateTime<Utc>,
}

/// PostgreSQL truncates identifiers beyond this length.
pub const MAX_COLLECTION_NAME_LEN: usize = 63;

/// Checks that `name` can be interpolated as a SQL identifier.
///
/// Accepted: ASCII letter or `_` first, then ASCII alphanumerics or `_`,
/// at most [`MAX_COLLECTION_NAME_LEN`] bytes.
pub fn validate_collection_name(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid_head = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_head && valid_tail && name.len() <= MAX_COLLECTION_NAME_LEN {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}
