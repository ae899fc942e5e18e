//! Snapshot transactions over the database
//!
//! `begin` copies the database. Operations staged under the transaction id
//! are replayed through CRUD on commit; if any of them fails the snapshot is
//! put back and no event is delivered.

use crate::database::{crud, Collection, Database};
use crate::error::{FlatError, Result};
use crate::events::{EventBuffer, EventSink};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One staged write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum TxOperation {
    Create {
        collection: Collection,
        data: Value,
    },
    Update {
        collection: Collection,
        id: String,
        patch: Value,
    },
    Delete {
        collection: Collection,
        id: String,
    },
}

impl TxOperation {
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Create { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => *collection,
        }
    }

    fn apply(&self, db: &mut Database, sink: &dyn EventSink) -> Result<()> {
        match self {
            Self::Create { collection, data } => {
                crud::create_value(db, *collection, data.clone(), sink)?;
            }
            Self::Update {
                collection,
                id,
                patch,
            } => {
                crud::update_value(db, *collection, id, patch.clone(), sink)?;
            }
            Self::Delete { collection, id } => {
                crud::delete_value(db, *collection, id, sink)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Transaction {
    snapshot: Database,
    operations: Vec<TxOperation>,
}

/// Tracks open transactions
#[derive(Debug, Default)]
pub struct TransactionManager {
    open: HashMap<String, Transaction>,
}

impl TransactionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction over the current state of `db`
    pub fn begin(&mut self, db: &Database) -> String {
        let id = format!("tx-{}", Uuid::new_v4().simple());
        self.open.insert(
            id.clone(),
            Transaction {
                snapshot: db.clone(),
                operations: Vec::new(),
            },
        );
        debug!(transaction = %id, "Transaction started");
        id
    }

    /// Stage an operation; returns its index within the transaction
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::TransactionNotFound`] for an unknown id
    pub fn record(&mut self, id: &str, operation: TxOperation) -> Result<usize> {
        let transaction = self.transaction_mut(id)?;
        transaction.operations.push(operation);
        Ok(transaction.operations.len() - 1)
    }

    /// Operations staged so far
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::TransactionNotFound`] for an unknown id
    pub fn operations(&self, id: &str) -> Result<&[TxOperation]> {
        self.open
            .get(id)
            .map(|transaction| transaction.operations.as_slice())
            .ok_or_else(|| FlatError::TransactionNotFound { id: id.to_string() })
    }

    /// Replay the staged operations in order
    ///
    /// Events reach `sink` only once every operation succeeded. On failure
    /// `db` is restored to the snapshot taken at [`begin`](Self::begin) and
    /// the transaction is closed.
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::Transaction`] with the index of the failing
    /// operation, or [`FlatError::TransactionNotFound`]
    pub fn commit(&mut self, id: &str, db: &mut Database, sink: &dyn EventSink) -> Result<usize> {
        let transaction = self
            .open
            .remove(id)
            .ok_or_else(|| FlatError::TransactionNotFound { id: id.to_string() })?;

        let buffer = EventBuffer::new();
        for (index, operation) in transaction.operations.iter().enumerate() {
            if let Err(error) = operation.apply(db, &buffer) {
                warn!(transaction = %id, index, error = %error, "Commit failed, restoring snapshot");
                *db = transaction.snapshot;
                return Err(FlatError::Transaction {
                    id: id.to_string(),
                    index,
                    message: error.to_string(),
                });
            }
        }

        let applied = transaction.operations.len();
        buffer.flush_into(sink);
        info!(transaction = %id, operations = applied, "Transaction committed");
        Ok(applied)
    }

    /// Restore `db` to the snapshot and close the transaction
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::TransactionNotFound`] for an unknown id
    pub fn rollback(&mut self, id: &str, db: &mut Database) -> Result<()> {
        let transaction = self
            .open
            .remove(id)
            .ok_or_else(|| FlatError::TransactionNotFound { id: id.to_string() })?;
        *db = transaction.snapshot;
        info!(transaction = %id, discarded = transaction.operations.len(), "Transaction rolled back");
        Ok(())
    }

    #[must_use]
    pub fn is_open(&self, id: &str) -> bool {
        self.open.contains_key(id)
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Drop every open transaction without touching the database
    pub fn clear(&mut self) {
        self.open.clear();
    }

    fn transaction_mut(&mut self, id: &str) -> Result<&mut Transaction> {
        self.open
            .get_mut(id)
            .ok_or_else(|| FlatError::TransactionNotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Factory, FactoryType};

    fn factory_json(id: &str) -> Value {
        serde_json::to_value(Factory::new(id, "Plant", FactoryType::Packaging)).unwrap()
    }

    #[test]
    fn test_commit_applies_in_order_and_flushes_events() {
        let mut db = Database::new();
        let mut manager = TransactionManager::new();
        let tx = manager.begin(&db);
        manager
            .record(
                &tx,
                TxOperation::Create {
                    collection: Collection::Factories,
                    data: factory_json("factory-1"),
                },
            )
            .unwrap();
        manager
            .record(
                &tx,
                TxOperation::Update {
                    collection: Collection::Factories,
                    id: "factory-1".to_string(),
                    patch: serde_json::json!({"name": "Updated"}),
                },
            )
            .unwrap();

        let events = EventBuffer::new();
        assert_eq!(manager.commit(&tx, &mut db, &events).unwrap(), 2);
        assert_eq!(db.factories["factory-1"].name, "Updated");
        assert_eq!(events.len(), 2);
        assert!(!manager.is_open(&tx));
    }

    #[test]
    fn test_failed_commit_restores_snapshot() {
        let mut db = Database::new();
        let mut manager = TransactionManager::new();
        let tx = manager.begin(&db);
        for id in ["factory-1", "factory-1"] {
            manager
                .record(
                    &tx,
                    TxOperation::Create {
                        collection: Collection::Factories,
                        data: factory_json(id),
                    },
                )
                .unwrap();
        }

        let events = EventBuffer::new();
        match manager.commit(&tx, &mut db, &events) {
            Err(FlatError::Transaction { index, .. }) => assert_eq!(index, 1),
            other => panic!("Expected transaction failure, got {other:?}"),
        }
        assert!(db.factories.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_rollback_discards_outside_writes() {
        let mut db = Database::new();
        let mut manager = TransactionManager::new();
        let tx = manager.begin(&db);
        db.factories.insert(
            "factory-9".to_string(),
            Factory::new("factory-9", "Late", FactoryType::Container),
        );
        manager.rollback(&tx, &mut db).unwrap();
        assert!(db.factories.is_empty());
    }

    #[test]
    fn test_unknown_transaction() {
        let mut db = Database::new();
        let mut manager = TransactionManager::new();
        let sink = EventBuffer::new();
        assert!(matches!(
            manager.commit("tx-missing", &mut db, &sink),
            Err(FlatError::TransactionNotFound { .. })
        ));
        assert!(manager.rollback("tx-missing", &mut db).is_err());
        assert!(manager
            .record(
                "tx-missing",
                TxOperation::Delete {
                    collection: Collection::Users,
                    id: "user-1".to_string()
                }
            )
            .is_err());
    }
}
