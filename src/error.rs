//! Error type shared by executors and document stores.

use std::fmt;

/// Errors surfaced by document store operations.
///
/// Database failures are wrapped as-is; callers that need the driver's error
/// can match on [`StoreError::Postgres`] or walk [`std::error::Error::source`].
#[derive(Debug)]
pub enum StoreError {
    /// Error returned by `may_postgres`
    Postgres(may_postgres::Error),
    /// Collection name is not usable as a SQL identifier
    InvalidCollection(String),
    /// Document body could not be converted to or from JSON
    Serialization(serde_json::Error),
    /// Connection string rejected before dialing
    InvalidConnectionString(String),
    /// Other store errors
    Other(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Postgres(e) => write!(f, "PostgreSQL error: {e}"),
            StoreError::InvalidCollection(name) => {
                write!(f, "Invalid collection name: {name:?}")
            }
            StoreError::Serialization(e) => write!(f, "Serialization error: {e}"),
            StoreError::InvalidConnectionString(why) => {
                write!(f, "Invalid PostgreSQL connection string: {why}")
            }
            StoreError::Other(s) => write!(f, "Store error: {s}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Postgres(e) => Some(e),
            StoreError::Serialization(e) => Some(e),
            StoreError::InvalidCollection(_)
            | StoreError::InvalidConnectionString(_)
            | StoreError::Other(_) => None,
        }
    }
}

impl From<may_postgres::Error> for StoreError {
    fn from(err: may_postgres::Error) -> Self {
        StoreError::Postgres(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::InvalidCollection("drop table".to_string());
        assert_eq!(err.to_string(), "Invalid collection name: \"drop table\"");

        let err = StoreError::Other("closed".to_string());
        assert_eq!(err.to_string(), "Store error: closed");
    }

    #[test]
    fn test_serialization_error_keeps_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StoreError::from(json_err);
        assert!(err.to_string().starts_with("Serialization error:"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_invalid_connection_string_display() {
        let err = StoreError::InvalidConnectionString("empty".to_string());
        assert_eq!(err.to_string(), "Invalid PostgreSQL connection string: empty");
        assert!(err.source().is_none());
    }
}
