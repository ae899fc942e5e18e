//! Versioned upgrades of the persisted `data` object
//!
//! Each [`Migration`] lifts the blob exactly one schema version. A blob is
//! upgraded by chaining migrations from its version to [`SCHEMA_VERSION`].

use crate::error::{FlatError, Result};
use crate::models::FactoryType;
use flat_common::SCHEMA_VERSION;
use serde_json::Value;
use tracing::info;

/// One step in the upgrade chain
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub from: u32,
    pub to: u32,
    pub description: &'static str,
    pub apply: fn(&mut Value) -> Result<()>,
}

/// Every known upgrade, ordered by `from`
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 1,
        to: 2,
        description: "map legacy factory type labels to type codes",
        apply: map_legacy_factory_labels,
    },
    Migration {
        from: 2,
        to: 3,
        description: "move project factoryId into manufacturerId",
        apply: move_factory_id_to_manufacturer_id,
    },
];

/// Upgrade `data` stored under `version` to the current schema
///
/// # Errors
///
/// Returns [`FlatError::SchemaVersion`] when no chain of migrations leads
/// from `version` to the current version, or the error of a failing step
pub fn migrate(version: &str, mut data: Value) -> Result<Value> {
    let unsupported = || FlatError::SchemaVersion {
        found: version.to_string(),
        current: SCHEMA_VERSION,
    };
    let mut current: u32 = version.trim().parse().map_err(|_| unsupported())?;
    if current > SCHEMA_VERSION {
        return Err(unsupported());
    }
    while current < SCHEMA_VERSION {
        let step = MIGRATIONS
            .iter()
            .find(|migration| migration.from == current)
            .ok_or_else(unsupported)?;
        (step.apply)(&mut data)?;
        info!(from = step.from, to = step.to, "Applied migration: {}", step.description);
        current = step.to;
    }
    Ok(data)
}

/// Records of one collection inside a `data` object
fn records_mut<'a>(data: &'a mut Value, collection: &str) -> impl Iterator<Item = &'a mut Value> {
    data.get_mut(collection)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flat_map(|pairs| pairs.iter_mut())
        .filter_map(|pair| pair.get_mut(1))
        .filter(|record| record.is_object())
}

fn relabel(field: Option<&mut Value>) {
    if let Some(value) = field {
        let mapped = value.as_str().and_then(FactoryType::from_legacy_label);
        if let Some(factory_type) = mapped {
            *value = Value::String(factory_type.code().to_string());
        }
    }
}

fn map_legacy_factory_labels(data: &mut Value) -> Result<()> {
    for factory in records_mut(data, "factories") {
        relabel(factory.get_mut("type"));
    }
    for user in records_mut(data, "users") {
        relabel(user.get_mut("internalManagerType"));
    }
    for link in records_mut(data, "factoryProjects") {
        relabel(link.get_mut("role"));
    }
    for task in records_mut(data, "tasks") {
        if let Some(assignments) = task
            .get_mut("factoryAssignments")
            .and_then(Value::as_array_mut)
        {
            for assignment in assignments {
                relabel(assignment.get_mut("role"));
            }
        }
    }
    Ok(())
}

fn move_factory_id_to_manufacturer_id(data: &mut Value) -> Result<()> {
    for project in records_mut(data, "projects") {
        let Some(record) = project.as_object_mut() else {
            continue;
        };
        let Some(legacy) = record.remove("factoryId") else {
            continue;
        };
        let has_manufacturer = record
            .get("manufacturerId")
            .is_some_and(|value| !value.is_null());
        if !has_manufacturer && !legacy.is_null() {
            record.insert("manufacturerId".to_string(), legacy);
        }
    }
    Ok(())
}
