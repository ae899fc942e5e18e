//! Export, import, reset and statistics

use super::FlatStore;
use crate::database::Collection;
use crate::error::Result;
use crate::seed;
use crate::storage::{decode_stored, serialize_database, StoredDatabase};
use flat_common::SCHEMA_VERSION;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Snapshot of store size and health
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub counts: BTreeMap<Collection, usize>,
    pub total_records: usize,
    pub storage: String,
    pub storage_key: String,
    pub persistence_warning: Option<String>,
    pub listeners: usize,
    pub open_transactions: usize,
}

impl FlatStore {
    /// The whole database as a pretty-printed persisted blob
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a record cannot be encoded
    pub fn export(&self) -> Result<String> {
        let stored = StoredDatabase {
            version: SCHEMA_VERSION.to_string(),
            data: serialize_database(&self.db)?,
        };
        Ok(serde_json::to_string_pretty(&stored)?)
    }

    /// Replace the whole database with an exported blob
    ///
    /// Older schema versions are migrated first. On error the current
    /// database stays as it was.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON or
    /// [`crate::FlatError::SchemaVersion`] for an unsupported version
    #[instrument(skip(self, json), fields(bytes = json.len()))]
    pub fn import(&mut self, json: &str) -> Result<()> {
        let stored: StoredDatabase = serde_json::from_str(json)?;
        let version = stored.version.clone();
        self.db = decode_stored(stored)?;
        info!(version = %version, records = self.db.total_records(), "Database imported");
        self.persist();
        Ok(())
    }

    /// Throw everything away and start again from the seed data
    ///
    /// Listeners and open transactions are dropped too.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.db = seed::seed_database();
        self.events.clear_listeners();
        self.transactions.clear();
        info!(records = self.db.total_records(), "Store reset to seed data");
        self.persist();
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            counts: self.db.counts(),
            total_records: self.db.total_records(),
            storage: self.storage.describe(),
            storage_key: self.storage.key().to_string(),
            persistence_warning: self.persistence_warning.clone(),
            listeners: self.events.listener_count(),
            open_transactions: self.transactions.open_count(),
        }
    }
}
