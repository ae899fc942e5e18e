//! Error types for the FLAT store

use crate::database::Collection;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, FlatError>;

/// Main error type for store operations
#[derive(Error, Debug)]
pub enum FlatError {
    #[error("{collection} record not found: {id}")]
    NotFound { collection: Collection, id: String },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    #[error("Duplicate id in {collection}: {id}")]
    DuplicateId { collection: Collection, id: String },

    #[error("Referential integrity violation on {collection} {id}: {message}")]
    Integrity {
        collection: Collection,
        id: String,
        message: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Unsupported schema version {found} (current is {current})")]
    SchemaVersion { found: String, current: u32 },

    #[error("Transaction {id} failed at operation {index}: {message}")]
    Transaction {
        id: String,
        index: usize,
        message: String,
    },

    #[error("Transaction not found: {id}")]
    TransactionNotFound { id: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlatError {
    /// Create a not-found error for a collection record
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            id: id.into(),
        }
    }

    /// Create a referential integrity error
    pub fn integrity(
        collection: Collection,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Integrity {
            collection,
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error means the addressed record does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::ProjectNotFound { .. })
    }
}

impl From<rusqlite::Error> for FlatError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_serialization_error_from_serde() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: FlatError = json_error.into();
        assert!(matches!(error, FlatError::Serialization(_)));
    }

    #[test]
    fn test_io_error_from_std() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: FlatError = io_error.into();
        assert!(matches!(error, FlatError::Io(_)));
    }

    #[test]
    fn test_database_error_from_rusqlite() {
        let error: FlatError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(error.to_string().starts_with("Database error"));
    }

    #[test]
    fn test_not_found_message() {
        let error = FlatError::not_found(Collection::Factories, "factory-9");
        assert_eq!(error.to_string(), "factories record not found: factory-9");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_project_not_found_is_not_found() {
        let error = FlatError::ProjectNotFound {
            id: "master-1".to_string(),
        };
        assert!(error.is_not_found());
        assert!(error.to_string().contains("master-1"));
    }

    #[test]
    fn test_integrity_message() {
        let error = FlatError::integrity(
            Collection::Factories,
            "factory-1",
            "referenced by projects/project-1",
        );
        let message = error.to_string();
        assert!(message.contains("Referential integrity"));
        assert!(message.contains("projects/project-1"));
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_validation_helper() {
        match FlatError::validation("progress out of range") {
            FlatError::Validation { message } => assert_eq!(message, "progress out of range"),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_transaction_message() {
        let error = FlatError::Transaction {
            id: "tx-1".to_string(),
            index: 2,
            message: "duplicate".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transaction tx-1 failed at operation 2: duplicate"
        );
    }

    #[test]
    fn test_schema_version_message() {
        let error = FlatError::SchemaVersion {
            found: "9".to_string(),
            current: 3,
        };
        assert!(error.to_string().contains("9"));
        assert!(error.to_string().contains("current is 3"));
    }
}
