//! FLAT Core - In-process project store for the FLAT manufacturing dashboard
//!
//! The store keeps every FLAT collection (users, customers, factories,
//! projects, schedules, tasks, comments, catalog, relationship rows, code
//! mappings, custom fields and UI settings) in memory and persists the whole
//! database as one versioned JSON blob.
//!
//! # Features
//!
//! - **Typed CRUD**: one [`Entity`] impl per collection, typed patches,
//!   referential integrity on every write
//! - **MASTER/SUB projects**: MASTER projects aggregate factories, dates and
//!   status from their SUBs; MASTER-owned fields flow down to SUBs
//! - **Change events**: per-collection and wildcard listeners
//! - **Snapshot transactions**: all-or-nothing commits with buffered events
//! - **Pluggable storage**: in-memory or SQLite key-value backends, with
//!   schema migrations on load
//! - **Custom fields**: typed definitions, values, groups and templates
//!
//! # Quick Start
//!
//! ```
//! use flat_core::{FlatStore, Project, ProjectPatch, Priority};
//!
//! let mut store = FlatStore::in_memory();
//! let master = store
//!     .create(Project::new_master("", "Night cream line"))
//!     .unwrap();
//! let sub = Project::new_sub("", &master.id, "Night cream 50ml");
//! store.create_sub_project(&master.id, sub).unwrap();
//!
//! let patch = ProjectPatch {
//!     priority: Some(Priority::High),
//!     ..ProjectPatch::default()
//! };
//! store.update_project(&master.id, patch).unwrap();
//! assert!(store
//!     .get_sub_projects(&master.id)
//!     .iter()
//!     .all(|sub| sub.priority == Priority::High));
//! ```
//!
//! # Crate Features
//!
//! - `test-utils`: Enable test fixtures (for testing only)

pub mod aggregation;
pub mod config;
pub mod config_loader;
pub mod custom_fields;
pub mod database;
pub mod error;
pub mod events;
pub mod models;
pub mod observability;
pub mod seed;
pub mod storage;
pub mod store;
pub mod transactions;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ConfigOverlay, FlatConfig, StorageBackend};
pub use config_loader::{load_config, ConfigLoader};
pub use custom_fields::CustomFieldManager;
pub use database::{validators, Collection, Database, Entity};
pub use error::{FlatError, Result};
pub use events::{DbEvent, EventKind, EventManager, Subscription, Topic};
pub use models::*;
pub use observability::{init_tracing, LogSettings};
pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage, StorageManager, StoredDatabase};
pub use store::{CascadeSummary, FlatStore, FlatStoreBuilder, SharedStore, StoreStats};
pub use transactions::TxOperation;

/// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use serde::{Deserialize, Serialize};
