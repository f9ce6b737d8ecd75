//! User records and the `add_user` operation.
//!
//! A user is stored as a single document in the `users` collection:
//!
//! ```json
//! { "first_name": "Ada", "sure_name": "Lovelace", "age": 36,
//!   "email": "ada@example.com", "isActive": true }
//! ```
//!
//! No validation, duplicate detection, or retry happens here. Whatever the
//! store returns, success or error, is handed straight back to the caller.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Document, InsertOneResult};
use crate::error::StoreError;
use crate::store::DocumentStore;

pub const USERS_COLLECTION: &str = "users";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub first_name: String,
    /// The persisted key is `sure_name`; it holds the last name.
    pub sure_name: String,
    pub age: u32,
    pub email: String,
    #[serde(rename = "isActive", default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl UserRecord {
    /// A new, active user.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        age: u32,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            sure_name: last_name.into(),
            age,
            email: email.into(),
            is_active: true,
        }
    }

    pub fn to_document(&self) -> Result<Document, StoreError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(StoreError::Other(format!(
                "user record serialized to a non-object: {other}"
            ))),
        }
    }

    pub fn from_document(document: Document) -> Result<Self, StoreError> {
        Ok(serde_json::from_value(serde_json::Value::Object(document))?)
    }
}

/// Insert one active user into the `users` collection.
///
/// # Examples
///
/// ```
/// use tidepool::{add_user, list_users, MemoryDocumentStore};
///
/// let store = MemoryDocumentStore::new();
/// let ack = add_user(&store, "Ada", "Lovelace", 36, "ada@example.com")?;
///
/// let users = list_users(&store)?;
/// assert_eq!(users[0].0, ack.inserted_id);
/// assert!(users[0].1.is_active);
/// # Ok::<(), tidepool::StoreError>(())
/// ```
pub fn add_user<S: DocumentStore + ?Sized>(
    store: &S,
    first_name: &str,
    last_name: &str,
    age: u32,
    email: &str,
) -> Result<InsertOneResult, StoreError> {
    add_user_to(store, USERS_COLLECTION, first_name, last_name, age, email)
}

/// Like [`add_user`], writing to a caller-chosen collection.
pub fn add_user_to<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    first_name: &str,
    last_name: &str,
    age: u32,
    email: &str,
) -> Result<InsertOneResult, StoreError> {
    let record = UserRecord::new(first_name, last_name, age, email);
    store.insert_one(collection, record.to_document()?)
}

/// Every user in the `users` collection, oldest first, with its id.
pub fn list_users<S: DocumentStore + ?Sized>(
    store: &S,
) -> Result<Vec<(Uuid, UserRecord)>, StoreError> {
    list_users_in(store, USERS_COLLECTION)
}

pub fn list_users_in<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
) -> Result<Vec<(Uuid, UserRecord)>, StoreError> {
    store
        .find_all(collection)?
        .into_iter()
        .map(|doc| Ok((doc.id, UserRecord::from_document(doc.body)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::{FirstName, LastName};
    use fake::Fake;
    use serde_json::json;

    #[test]
    fn test_add_user_inserts_expected_document() {
        let store = MemoryDocumentStore::new();
        let ack = add_user(&store, "Ada", "Lovelace", 36, "ada@example.com").unwrap();

        let docs = store.find_all(USERS_COLLECTION).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, ack.inserted_id);
        assert_eq!(
            serde_json::Value::Object(docs[0].body.clone()),
            json!({
                "first_name": "Ada",
                "sure_name": "Lovelace",
                "age": 36,
                "email": "ada@example.com",
                "isActive": true
            })
        );
    }

    #[test]
    fn test_document_has_exactly_five_keys() {
        let doc = UserRecord::new("Grace", "Hopper", 85, "grace@example.com")
            .to_document()
            .unwrap();
        let mut keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["age", "email", "first_name", "isActive", "sure_name"]);
    }

    #[test]
    fn test_add_user_is_not_idempotent() {
        let store = MemoryDocumentStore::new();
        let first = add_user(&store, "Ada", "Lovelace", 36, "ada@example.com").unwrap();
        let second = add_user(&store, "Ada", "Lovelace", 36, "ada@example.com").unwrap();

        assert_ne!(first.inserted_id, second.inserted_id);
        let users = list_users(&store).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].1, users[1].1);
    }

    #[test]
    fn test_add_user_round_trips_random_inputs() {
        let store = MemoryDocumentStore::new();

        for _ in 0..25 {
            let first: String = FirstName().fake();
            let last: String = LastName().fake();
            let email: String = SafeEmail().fake();
            let age: u32 = (0u32..120).fake();

            let before = store.count(USERS_COLLECTION).unwrap();
            let ack = add_user(&store, &first, &last, age, &email).unwrap();
            assert_eq!(store.count(USERS_COLLECTION).unwrap(), before + 1);

            let (id, user) = list_users(&store).unwrap().pop().unwrap();
            assert_eq!(id, ack.inserted_id);
            assert_eq!(user, UserRecord::new(first, last, age, email));
            assert!(user.is_active);
        }
    }

    #[test]
    fn test_no_validation_on_inputs() {
        let store = MemoryDocumentStore::new();
        add_user(&store, "", "", 0, "not-an-email").unwrap();

        let (_, user) = list_users(&store).unwrap().remove(0);
        assert_eq!(user.first_name, "");
        assert_eq!(user.email, "not-an-email");
    }

    #[test]
    fn test_store_error_propagates_unchanged() {
        let store = MemoryDocumentStore::new();
        let err = add_user_to(&store, "no such table", "Ada", "Lovelace", 36, "a@b.c").unwrap_err();
        assert!(matches!(err, StoreError::InvalidCollection(name) if name == "no such table"));
    }

    #[test]
    fn test_from_document_defaults_missing_active_flag() {
        let doc = match json!({
            "first_name": "Alan",
            "sure_name": "Turing",
            "age": 41,
            "email": "alan@example.com"
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let user = UserRecord::from_document(doc).unwrap();
        assert!(user.is_active);
        assert_eq!(user.sure_name, "Turing");
    }

    #[test]
    fn test_from_document_rejects_wrong_shape() {
        let doc = match json!({ "first_name": "Alan", "age": "old" }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert!(matches!(
            UserRecord::from_document(doc),
            Err(StoreError::Serialization(_))
        ));
    }
}
