//! Shared helpers for the integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use flat_core::{Factory, FactoryType, FlatStore, Project, Schedule, Task, User, UserRole};

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

/// Empty store that does not persist
pub fn store() -> FlatStore {
    FlatStore::builder()
        .seed_when_empty(false)
        .persist(false)
        .build()
}

/// Empty store with factories F1..F3 of every type and an active user
pub fn store_with_factories() -> FlatStore {
    let mut store = store();
    for (id, factory_type) in [
        ("F1", FactoryType::Manufacturing),
        ("F2", FactoryType::Manufacturing),
        ("F3", FactoryType::Manufacturing),
        ("C1", FactoryType::Container),
        ("P1", FactoryType::Packaging),
    ] {
        store
            .create(Factory::new(id, format!("Factory {id}"), factory_type))
            .unwrap();
    }
    store
        .create(User::new("user-1", "Kim", "kim@flat.dev", UserRole::Manager))
        .unwrap();
    store
}

/// MASTER `M` (no dates) with S1(01-01..01-10, F1) and S2(01-05..01-20, F2)
///
/// The SUBs go through the plain `create`, so S2 is not clamped to the range
/// M aggregated from S1.
pub fn scenario_a() -> FlatStore {
    let mut store = store_with_factories();
    store.create(Project::new_master("M", "Master")).unwrap();
    store
        .create(
            Project::new_sub("S1", "M", "Sub one")
                .with_dates(date(1, 1), date(1, 10))
                .with_factory(FactoryType::Manufacturing, "F1"),
        )
        .unwrap();
    store
        .create(
            Project::new_sub("S2", "M", "Sub two")
                .with_dates(date(1, 5), date(1, 20))
                .with_factory(FactoryType::Manufacturing, "F2"),
        )
        .unwrap();
    store
}

/// Give `project_id` a schedule with `count` back-to-back one-day tasks
pub fn add_schedule(store: &mut FlatStore, project_id: &str, count: u32) -> Schedule {
    let schedule = store
        .create(Schedule::new(format!("schedule-{project_id}"), project_id))
        .unwrap();
    for index in 0..count {
        let day = date(2, 1 + index * 2);
        store
            .create(Task::new(
                format!("task-{project_id}-{index}"),
                schedule.id.as_str(),
                format!("Step {index}"),
                day,
                day,
            ))
            .unwrap();
    }
    schedule
}
