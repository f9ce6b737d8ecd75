//! # Tidepool
//!
//! Document collections on PostgreSQL for the `may` coroutine runtime, with a
//! typed user registry ([`add_user`]) and Redis publish/subscribe helpers
//! ([`broadcast`]).
//!
//! ```no_run
//! use tidepool::{add_user, DocumentStore, PostgresDocumentStore, TidepoolConfig, USERS_COLLECTION};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TidepoolConfig::load()?;
//! let store = PostgresDocumentStore::connect(&config.database.url)?;
//! store.ensure_collection(USERS_COLLECTION)?;
//!
//! let ack = add_user(&store, "Ada", "Lovelace", 36, "ada@example.com")?;
//! println!("inserted {}", ack.inserted_id);
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod document;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod store;
pub mod users;

pub use config::{BroadcastConfig, DatabaseConfig, TidepoolConfig};
pub use connection::connect;
pub use document::{Document, InsertOneResult, StoredDocument};
pub use error::StoreError;
pub use executor::{Executor, MayPostgresExecutor};
pub use store::{DocumentStore, MemoryDocumentStore, PostgresDocumentStore};
pub use users::{add_user, list_users, UserRecord, USERS_COLLECTION};
