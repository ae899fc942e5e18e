//! Persistence of the whole database as one versioned JSON blob
//!
//! The blob lives under a single key of a [`KeyValueStorage`]:
//! `{"version": "<n>", "data": {<collection>: [[id, record], ...]}}`.

mod backend;
pub mod migrations;

pub use backend::{KeyValueStorage, MemoryStorage, SqliteStorage};

use crate::database::Database;
use crate::error::{FlatError, Result};
use flat_common::{SCHEMA_VERSION, STORAGE_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Persisted blob before its `data` is decoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDatabase {
    pub version: String,
    pub data: Value,
}

/// Encode every collection as `[id, record]` pairs
///
/// # Errors
///
/// Returns an error if a record cannot be serialized
pub fn serialize_database(db: &Database) -> Result<Value> {
    Ok(serde_json::to_value(db)?)
}

/// Rebuild a database from a `data` object
///
/// Missing collections come back empty and unknown keys are ignored.
///
/// # Errors
///
/// Returns an error if a known collection holds malformed records
pub fn deserialize_database(data: Value) -> Result<Database> {
    Ok(serde_json::from_value(data)?)
}

/// Decode a stored blob, migrating it to the current schema first
///
/// # Errors
///
/// Returns [`FlatError::SchemaVersion`] when the blob cannot be migrated, or
/// a serialization error when the migrated data does not decode
pub fn decode_stored(stored: StoredDatabase) -> Result<Database> {
    let data = migrations::migrate(&stored.version, stored.data)?;
    deserialize_database(data)
}

/// Reads and writes the database blob under one key
pub struct StorageManager {
    backend: Box<dyn KeyValueStorage>,
    key: String,
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("backend", &self.backend.describe())
            .field("key", &self.key)
            .finish()
    }
}

impl StorageManager {
    #[must_use]
    pub fn new(backend: Box<dyn KeyValueStorage>) -> Self {
        Self::with_key(backend, STORAGE_KEY)
    }

    #[must_use]
    pub fn with_key(backend: Box<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Manager over a fresh [`MemoryStorage`]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    /// Read the stored blob
    ///
    /// Returns `None` when nothing is stored, the backend cannot be read or
    /// the blob is not valid JSON; failures are logged, never raised.
    #[instrument(skip(self), fields(key = %self.key))]
    pub fn load_from_storage(&self) -> Option<StoredDatabase> {
        let raw = match self.backend.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Nothing stored yet");
                return None;
            }
            Err(error) => {
                warn!(error = %error, "Storage unavailable");
                return None;
            }
        };
        match serde_json::from_str::<StoredDatabase>(&raw) {
            Ok(stored) => Some(stored),
            Err(error) => {
                warn!(error = %error, "Stored blob is corrupt, ignoring it");
                None
            }
        }
    }

    /// Write `db` under the key with the current schema version
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be serialized or the backend
    /// rejects the write
    #[instrument(skip(self, db), fields(key = %self.key))]
    pub fn save_to_storage(&mut self, db: &Database) -> Result<()> {
        let stored = StoredDatabase {
            version: SCHEMA_VERSION.to_string(),
            data: serialize_database(db)?,
        };
        let raw = serde_json::to_string(&stored)?;
        self.backend
            .set_item(&self.key, &raw)
            .map_err(|error| FlatError::storage(format!("failed to save database: {error}")))?;
        debug!(bytes = raw.len(), records = db.total_records(), "Database saved");
        Ok(())
    }

    /// Remove the stored blob
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the removal
    pub fn clear(&mut self) -> Result<()> {
        self.backend.remove_item(&self.key)?;
        info!(key = %self.key, "Stored database removed");
        Ok(())
    }
}
