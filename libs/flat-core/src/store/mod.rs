//! The store facade
//!
//! [`FlatStore`] owns the database and composes CRUD, aggregation, events,
//! transactions and persistence. Construct one at startup and hand it (or a
//! [`SharedStore`]) to whatever needs it.

mod comments;
mod projects;
mod transfer;

pub use projects::CascadeSummary;
pub use transfer::StoreStats;

use crate::aggregation;
use crate::config::{FlatConfig, StorageBackend};
use crate::custom_fields::CustomFieldManager;
use crate::database::{crud, validators, Database, Entity};
use crate::error::{FlatError, Result};
use crate::events::{DbEvent, EventBuffer, EventManager, EventSink, Subscription, Topic};
use crate::models::{Patch, Project, Schedule, Task};
use crate::seed;
use crate::storage::{
    decode_stored, KeyValueStorage, MemoryStorage, SqliteStorage, StorageManager,
};
use crate::transactions::{TransactionManager, TxOperation};
use flat_common::STORAGE_KEY;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Store handle shared between owners
pub type SharedStore = Arc<Mutex<FlatStore>>;

/// The record as a [`Project`], when `T` is the project type
fn as_project<T: Entity>(record: &T) -> Option<&Project> {
    (record as &dyn Any).downcast_ref::<Project>()
}

/// Options for building a [`FlatStore`]
pub struct FlatStoreBuilder {
    backend: Option<Box<dyn KeyValueStorage>>,
    key: String,
    seed_when_empty: bool,
    persist: bool,
}

impl Default for FlatStoreBuilder {
    fn default() -> Self {
        Self {
            backend: None,
            key: STORAGE_KEY.to_string(),
            seed_when_empty: true,
            persist: true,
        }
    }
}

impl FlatStoreBuilder {
    /// Backend to load from and persist into; defaults to [`MemoryStorage`]
    #[must_use]
    pub fn storage(mut self, backend: impl KeyValueStorage + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Storage key of the persisted blob
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Seed a fresh database when nothing usable is stored
    #[must_use]
    pub const fn seed_when_empty(mut self, seed: bool) -> Self {
        self.seed_when_empty = seed;
        self
    }

    /// Write the database back after every successful mutation
    #[must_use]
    pub const fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Load the stored database, migrating or reseeding as needed
    #[must_use]
    pub fn build(self) -> FlatStore {
        let backend = self
            .backend
            .unwrap_or_else(|| Box::new(MemoryStorage::new()));
        let storage = StorageManager::with_key(backend, self.key);

        let mut needs_save = false;
        let db = match storage.load_from_storage() {
            Some(stored) => {
                let stored_version = stored.version.clone();
                match decode_stored(stored) {
                    Ok(db) => {
                        needs_save = stored_version != flat_common::SCHEMA_VERSION.to_string();
                        db
                    }
                    Err(error) => {
                        warn!(
                            version = %stored_version,
                            error = %error,
                            "Stored database unusable, reseeding"
                        );
                        needs_save = true;
                        seed::seed_database()
                    }
                }
            }
            None if self.seed_when_empty => {
                info!("No stored database, seeding");
                needs_save = true;
                seed::seed_database()
            }
            None => Database::new(),
        };

        let mut store = FlatStore {
            db,
            storage,
            events: EventManager::new(),
            transactions: TransactionManager::new(),
            persist: self.persist,
            persistence_warning: None,
        };
        info!(
            backend = %store.storage.describe(),
            records = store.db.total_records(),
            "Store ready"
        );
        if needs_save {
            store.persist();
        }
        store
    }
}

/// In-process store of every FLAT collection
pub struct FlatStore {
    db: Database,
    storage: StorageManager,
    events: EventManager,
    transactions: TransactionManager,
    persist: bool,
    persistence_warning: Option<String>,
}

impl std::fmt::Debug for FlatStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatStore")
            .field("storage", &self.storage)
            .field("records", &self.db.total_records())
            .field("events", &self.events)
            .field("persist", &self.persist)
            .field("persistence_warning", &self.persistence_warning)
            .finish_non_exhaustive()
    }
}

impl FlatStore {
    #[must_use]
    pub fn builder() -> FlatStoreBuilder {
        FlatStoreBuilder::default()
    }

    /// Seeded store over [`MemoryStorage`]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::builder().build()
    }

    /// Empty store over [`MemoryStorage`]
    #[must_use]
    pub fn empty() -> Self {
        Self::builder().seed_when_empty(false).build()
    }

    /// Store over the backend named by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the SQLite file
    /// cannot be opened
    pub fn from_config(config: &FlatConfig) -> Result<Self> {
        config.validate()?;
        let builder = Self::builder()
            .key(config.storage_key.clone())
            .seed_when_empty(config.seed_when_empty)
            .persist(config.persist);
        let builder = match config.backend {
            StorageBackend::Memory => builder.storage(MemoryStorage::new()),
            StorageBackend::Sqlite => {
                builder.storage(SqliteStorage::open(config.sqlite_path()?)?)
            }
        };
        Ok(builder.build())
    }

    /// Wrap the store for shared ownership
    #[must_use]
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Read-only view of every collection
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Why the last save failed, while the store runs memory-only
    #[must_use]
    pub fn persistence_warning(&self) -> Option<&str> {
        self.persistence_warning.as_deref()
    }

    /// Save the database; on failure keep running and remember the warning
    pub(crate) fn persist(&mut self) {
        if !self.persist {
            return;
        }
        match self.storage.save_to_storage(&self.db) {
            Ok(()) => {
                if self.persistence_warning.take().is_some() {
                    info!("Persistence restored");
                }
            }
            Err(error) => {
                warn!(error = %error, "Persistence failed, continuing in memory only");
                self.persistence_warning = Some(error.to_string());
            }
        }
    }

    /// Fetch one record
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown id
    pub fn get<T: Entity>(&self, id: &str) -> Result<T> {
        crud::get(&self.db, id)
    }

    #[must_use]
    pub fn get_all<T: Entity>(&self) -> Vec<T> {
        crud::get_all(&self.db)
    }

    /// Insert a record and persist
    ///
    /// A new SUB project triggers re-aggregation of its MASTER.
    ///
    /// # Errors
    ///
    /// Returns an integrity or validation error; nothing is written then
    #[instrument(skip(self, record), fields(collection = %T::COLLECTION))]
    pub fn create<T: Entity>(&mut self, record: T) -> Result<T> {
        let created = self.atomically(|store, sink| {
            if let Some(project) = as_project(&record) {
                projects::check_parent(&store.db, project)?;
            }
            let created = crud::create(&mut store.db, record, sink)?;
            if let Some(parent) = as_project(&created).and_then(|p| p.parent_id.clone()) {
                store.refresh_master(&parent, sink)?;
            }
            Ok(created)
        })?;
        self.persist();
        Ok(created)
    }

    /// Merge a patch into a record and persist
    ///
    /// Project updates keep MASTER and SUB projects in sync.
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown id, or an integrity or
    /// validation error; nothing is written then
    #[instrument(skip(self, patch), fields(collection = %T::COLLECTION))]
    pub fn update<T: Entity>(&mut self, id: &str, patch: T::Patch) -> Result<T> {
        let before: T = crud::get(&self.db, id)?;
        let mut preview = before.clone();
        patch.clone().apply(&mut preview);
        if let Some(project) = as_project(&preview) {
            projects::check_parent(&self.db, project)?;
        }

        let after = self.atomically(|store, sink| {
            let after = crud::update::<T>(&mut store.db, id, patch, sink)?;
            if let (Some(before), Some(after)) = (as_project(&before), as_project(&after)) {
                store.synchronize_project(before, after, sink)?;
            }
            Ok(after)
        })?;
        self.persist();
        Ok(after)
    }

    /// Delete an unreferenced record and persist
    ///
    /// Projects with dependents need [`FlatStore::delete_project`].
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] or [`FlatError::Integrity`]
    #[instrument(skip(self), fields(collection = %T::COLLECTION))]
    pub fn delete<T: Entity>(&mut self, id: &str) -> Result<T> {
        let removed = self.atomically(|store, sink| {
            let removed = crud::delete::<T>(&mut store.db, id, sink)?;
            if let Some(parent) = as_project(&removed).and_then(|p| p.parent_id.clone()) {
                store.refresh_master(&parent, sink)?;
            }
            Ok(removed)
        })?;
        self.persist();
        Ok(removed)
    }

    /// Listen for changes on a collection or on every collection
    pub fn subscribe<F>(&self, topic: impl Into<Topic>, callback: F) -> Subscription
    where
        F: Fn(&DbEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(topic, callback)
    }

    #[must_use]
    pub const fn events(&self) -> &EventManager {
        &self.events
    }

    /// Run custom field operations, persisting when they succeed
    ///
    /// # Errors
    ///
    /// Returns whatever `operation` returns
    pub fn custom_fields<R>(
        &mut self,
        operation: impl FnOnce(&mut CustomFieldManager<'_>) -> Result<R>,
    ) -> Result<R> {
        let result = {
            let mut manager = CustomFieldManager::new(&mut self.db, &self.events);
            operation(&mut manager)
        };
        if result.is_ok() {
            self.persist();
        }
        result
    }

    /// Open a transaction over the current state
    pub fn begin_transaction(&mut self) -> String {
        self.transactions.begin(&self.db)
    }

    /// Stage a raw operation
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::TransactionNotFound`] for an unknown id
    pub fn stage(&mut self, transaction_id: &str, operation: TxOperation) -> Result<usize> {
        self.transactions.record(transaction_id, operation)
    }

    /// Stage the creation of `record`
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown transaction or an unserializable record
    pub fn stage_create<T: Entity>(&mut self, transaction_id: &str, record: &T) -> Result<usize> {
        let operation = TxOperation::Create {
            collection: T::COLLECTION,
            data: serde_json::to_value(record)?,
        };
        self.stage(transaction_id, operation)
    }

    /// Stage a patch of record `id`
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown transaction or an unserializable patch
    pub fn stage_update<T: Entity>(
        &mut self,
        transaction_id: &str,
        id: &str,
        patch: &T::Patch,
    ) -> Result<usize> {
        let operation = TxOperation::Update {
            collection: T::COLLECTION,
            id: id.to_string(),
            patch: serde_json::to_value(patch)?,
        };
        self.stage(transaction_id, operation)
    }

    /// Stage the deletion of record `id`
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::TransactionNotFound`] for an unknown id
    pub fn stage_delete<T: Entity>(&mut self, transaction_id: &str, id: &str) -> Result<usize> {
        let operation = TxOperation::Delete {
            collection: T::COLLECTION,
            id: id.to_string(),
        };
        self.stage(transaction_id, operation)
    }

    /// Apply every staged operation, or none of them
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::Transaction`] naming the failing operation; the
    /// database is back at its state from when the transaction began
    #[instrument(skip(self))]
    pub fn commit_transaction(&mut self, transaction_id: &str) -> Result<usize> {
        let result = self
            .transactions
            .commit(transaction_id, &mut self.db, &self.events);
        if !matches!(result, Err(FlatError::TransactionNotFound { .. })) {
            self.persist();
        }
        result
    }

    /// Restore the state from when the transaction began
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::TransactionNotFound`] for an unknown id
    #[instrument(skip(self))]
    pub fn rollback_transaction(&mut self, transaction_id: &str) -> Result<()> {
        self.transactions.rollback(transaction_id, &mut self.db)?;
        self.persist();
        Ok(())
    }

    #[must_use]
    pub fn open_transactions(&self) -> usize {
        self.transactions.open_count()
    }

    /// Schedule of a project, if it has one
    #[must_use]
    pub fn get_schedule_by_project(&self, project_id: &str) -> Option<Schedule> {
        self.db
            .schedules
            .values()
            .find(|schedule| schedule.project_id == project_id)
            .cloned()
    }

    /// Tasks of a schedule, by start date
    #[must_use]
    pub fn get_tasks_by_schedule(&self, schedule_id: &str) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .db
            .tasks
            .values()
            .filter(|task| task.schedule_id == schedule_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        tasks
    }

    /// Tasks of a project, through its schedule
    #[must_use]
    pub fn get_tasks_by_project(&self, project_id: &str) -> Vec<Task> {
        self.get_schedule_by_project(project_id)
            .map(|schedule| self.get_tasks_by_schedule(&schedule.id))
            .unwrap_or_default()
    }

    /// Run every task rule over a project's tasks
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::ProjectNotFound`] for an unknown project or the
    /// first [`FlatError::Validation`] found
    #[instrument(skip(self))]
    pub fn validate_project_tasks(&self, project_id: &str) -> Result<()> {
        if !self.db.projects.contains_key(project_id) {
            return Err(FlatError::ProjectNotFound {
                id: project_id.to_string(),
            });
        }
        let tasks = self.get_tasks_by_project(project_id);
        debug!(tasks = tasks.len(), "Validating project tasks");
        validators::validate_tasks(&self.db, &tasks)
    }

    /// Re-aggregate `master_id` if it is an existing MASTER
    fn refresh_master(&mut self, master_id: &str, sink: &dyn EventSink) -> Result<()> {
        let is_master = self
            .db
            .projects
            .get(master_id)
            .is_some_and(Project::is_master);
        if is_master {
            aggregation::update_master_project_aggregates(&mut self.db, master_id, sink)?;
        }
        Ok(())
    }

    /// Run a multi-step write as one unit
    ///
    /// Events wait in a buffer until `op` succeeds. On failure the database
    /// is restored to its state before `op` and nothing is emitted.
    fn atomically<R>(
        &mut self,
        op: impl FnOnce(&mut Self, &dyn EventSink) -> Result<R>,
    ) -> Result<R> {
        let snapshot = self.db.clone();
        let buffer = EventBuffer::new();
        match op(self, &buffer) {
            Ok(value) => {
                buffer.flush_into(&self.events);
                Ok(value)
            }
            Err(error) => {
                warn!(%error, discarded_events = buffer.len(), "Write rolled back");
                self.db = snapshot;
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Factory, FactoryPatch, FactoryType};
    use crate::storage::MemoryStorage;

    #[test]
    fn test_empty_store_has_no_records() {
        let store = FlatStore::empty();
        assert!(store.database().is_empty());
        assert!(store.persistence_warning().is_none());
    }

    #[test]
    fn test_in_memory_store_is_seeded() {
        let store = FlatStore::in_memory();
        assert!(!store.database().projects.is_empty());
        assert!(!store.database().factories.is_empty());
    }

    #[test]
    fn test_generic_crud_persists() {
        let mut store = FlatStore::empty();
        store
            .create(Factory::new("factory-1", "Plant", FactoryType::Container))
            .unwrap();
        let patch = FactoryPatch {
            name: Some("Renamed".into()),
            ..FactoryPatch::default()
        };
        let updated: Factory = store.update("factory-1", patch).unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(store.get_all::<Factory>().len(), 1);

        let removed: Factory = store.delete("factory-1").unwrap();
        assert_eq!(removed.id, "factory-1");
        assert!(store.get::<Factory>("factory-1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_save_failure_degrades_to_memory_only() {
        let mut store = FlatStore::builder()
            .storage(MemoryStorage::with_quota(64))
            .seed_when_empty(false)
            .build();
        let created = store.create(Factory::new("factory-1", "Plant", FactoryType::Packaging));
        assert!(created.is_ok());
        assert!(store.persistence_warning().is_some());
        assert!(store.get::<Factory>("factory-1").is_ok());
    }

    #[test]
    fn test_failed_write_is_rolled_back_silently() {
        let mut store = FlatStore::empty();
        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let _subscription = store.subscribe(Topic::All, move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        let failed: Result<()> = store.atomically(|store, sink| {
            let plant = Factory::new("factory-1", "Plant", FactoryType::Packaging);
            crud::create(&mut store.db, plant, sink)?;
            Err(FlatError::validation("aggregate rejected"))
        });
        assert!(failed.is_err());
        assert!(store.database().factories.is_empty());
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 0);

        store
            .atomically(|store, sink| {
                let plant = Factory::new("factory-1", "Plant", FactoryType::Packaging);
                crud::create(&mut store.db, plant, sink)
            })
            .unwrap();
        assert_eq!(store.database().factories.len(), 1);
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shared_store() {
        let shared = FlatStore::empty().into_shared();
        let clone = Arc::clone(&shared);
        clone
            .lock()
            .create(Factory::new("factory-1", "Plant", FactoryType::Packaging))
            .unwrap();
        assert_eq!(shared.lock().get_all::<Factory>().len(), 1);
    }
}
