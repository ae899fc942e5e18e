//! Fixtures for tests of the store and of crates built on it

use crate::database::Database;
use crate::models::{Factory, FactoryType, Project, Schedule, Task, User, UserRole};
use crate::seed;
use crate::storage::{KeyValueStorage, SqliteStorage};
use crate::store::FlatStore;
use chrono::NaiveDate;
use std::path::Path;

/// Date in 2025
///
/// # Panics
///
/// Panics for an invalid month or day
#[must_use]
pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).expect("valid 2025 date")
}

/// Empty store that never persists
#[must_use]
pub fn empty_store() -> FlatStore {
    FlatStore::builder()
        .seed_when_empty(false)
        .persist(false)
        .build()
}

/// Seeded store over memory storage
#[must_use]
pub fn seeded_store() -> FlatStore {
    FlatStore::in_memory()
}

/// Seeded store persisting into an SQLite file at `path`
///
/// # Errors
///
/// Returns an error if the file cannot be opened
pub fn sqlite_store<P: AsRef<Path>>(path: P) -> crate::Result<FlatStore> {
    Ok(FlatStore::builder()
        .storage(SqliteStorage::open(path)?)
        .build())
}

/// Store over `backend`, without seeding
#[must_use]
pub fn store_over(backend: impl KeyValueStorage + 'static) -> FlatStore {
    FlatStore::builder()
        .storage(backend)
        .seed_when_empty(false)
        .build()
}

/// The seed dataset
#[must_use]
pub fn seeded_database() -> Database {
    seed::seed_database()
}

/// One factory of each type: `factory-mfg`, `factory-ctn`, `factory-pkg`
#[must_use]
pub fn factories() -> Vec<Factory> {
    vec![
        Factory::new("factory-mfg", "Mixing Plant", FactoryType::Manufacturing),
        Factory::new("factory-ctn", "Bottle Works", FactoryType::Container),
        Factory::new("factory-pkg", "Box Studio", FactoryType::Packaging),
    ]
}

/// Store holding [`factories`], an active user `user-1` and a MASTER
/// `project-master` spanning all of 2025
///
/// # Panics
///
/// Panics if the fixture records are rejected
#[must_use]
pub fn store_with_master() -> FlatStore {
    let mut store = empty_store();
    for factory in factories() {
        store.create(factory).expect("fixture factory");
    }
    store
        .create(User::new("user-1", "Kim", "kim@flat.dev", UserRole::Manager))
        .expect("fixture user");
    store
        .create(Project::new_master("project-master", "Fixture line").with_dates(date(1, 1), date(12, 31)))
        .expect("fixture master");
    store
}

/// Add a SUB with a schedule and sequential tasks, one per `(start, end)`
///
/// # Panics
///
/// Panics if the records are rejected
pub fn add_sub_with_tasks(
    store: &mut FlatStore,
    master_id: &str,
    sub_id: &str,
    tasks: &[(NaiveDate, NaiveDate)],
) -> Project {
    let sub = store
        .create_sub_project(master_id, Project::new_sub(sub_id, master_id, sub_id))
        .expect("fixture sub");
    let schedule_id = format!("schedule-{sub_id}");
    store
        .create(Schedule::new(schedule_id.as_str(), sub_id))
        .expect("fixture schedule");
    for (index, (start, end)) in tasks.iter().enumerate() {
        let task = Task::new(
            format!("task-{sub_id}-{index}"),
            schedule_id.as_str(),
            format!("Step {index}"),
            *start,
            *end,
        );
        store.create(task).expect("fixture task");
    }
    sub
}
