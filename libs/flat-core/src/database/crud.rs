//! Generic CRUD over the collections of a [`Database`]
//!
//! Every mutation runs the integrity checks first and then publishes one
//! event to the given [`EventSink`].

use super::integrity::{check_referential_integrity, check_references, Operation};
use super::{Collection, Database, Entity};
use crate::error::{FlatError, Result};
use crate::events::{EventKind, EventManager, EventSink};
use crate::models::Patch;
use chrono::Utc;
use flat_common::{generate_id, is_valid_id};
use serde_json::Value;
use tracing::debug;

/// Fetch one record
///
/// # Errors
///
/// Returns [`FlatError::NotFound`] if no record has `id`
pub fn get<T: Entity>(db: &Database, id: &str) -> Result<T> {
    T::table(db)
        .get(id)
        .cloned()
        .ok_or_else(|| FlatError::not_found(T::COLLECTION, id))
}

/// Every record of a collection, in id order
#[must_use]
pub fn get_all<T: Entity>(db: &Database) -> Vec<T> {
    T::table(db).values().cloned().collect()
}

/// Insert a new record, generating an id when it has none
///
/// # Errors
///
/// Returns an error if the id is taken, a reference does not resolve or
/// the record is invalid
pub fn create<T: Entity>(db: &mut Database, mut record: T, sink: &dyn EventSink) -> Result<T> {
    if record.id().is_empty() {
        record.set_id(generate_id(T::COLLECTION.id_prefix()));
    }
    let id = record.id().to_string();
    if !is_valid_id(&id) {
        return Err(FlatError::validation(format!(
            "Invalid {} id {id:?}",
            T::COLLECTION
        )));
    }
    check_referential_integrity(db, T::COLLECTION, &id, Operation::Create)?;
    record.validate()?;
    check_references(db, &record)?;

    let data = serde_json::to_value(&record)?;
    T::table_mut(db).insert(id.clone(), record.clone());
    debug!(collection = %T::COLLECTION, id = %id, "Created record");

    sink.publish(EventManager::create_event(
        EventKind::Created,
        T::COLLECTION,
        id,
        Some(data),
        None,
    ));
    Ok(record)
}

/// Merge `patch` into an existing record
///
/// # Errors
///
/// Returns [`FlatError::NotFound`] for a missing record, or a validation or
/// integrity error if the merged record is not acceptable; the stored record
/// is left untouched in that case
pub fn update<T: Entity>(
    db: &mut Database,
    id: &str,
    patch: T::Patch,
    sink: &dyn EventSink,
) -> Result<T> {
    check_referential_integrity(db, T::COLLECTION, id, Operation::Update)?;
    let previous = get::<T>(db, id)?;
    let mut next = previous.clone();
    patch.apply(&mut next);
    next.touch(Utc::now());
    next.validate()?;
    check_references(db, &next)?;

    let previous_data = serde_json::to_value(&previous)?;
    let data = serde_json::to_value(&next)?;
    T::table_mut(db).insert(id.to_string(), next.clone());
    debug!(collection = %T::COLLECTION, id, "Updated record");

    sink.publish(EventManager::create_event(
        EventKind::Updated,
        T::COLLECTION,
        id,
        Some(data),
        Some(previous_data),
    ));
    Ok(next)
}

/// Remove a record nothing else references
///
/// # Errors
///
/// Returns [`FlatError::NotFound`] for a missing record or
/// [`FlatError::Integrity`] when another record still points at it
pub fn delete<T: Entity>(db: &mut Database, id: &str, sink: &dyn EventSink) -> Result<T> {
    check_referential_integrity(db, T::COLLECTION, id, Operation::Delete)?;
    let removed = T::table_mut(db)
        .remove(id)
        .ok_or_else(|| FlatError::not_found(T::COLLECTION, id))?;
    debug!(collection = %T::COLLECTION, id, "Deleted record");

    sink.publish(EventManager::create_event(
        EventKind::Deleted,
        T::COLLECTION,
        id,
        None,
        Some(serde_json::to_value(&removed)?),
    ));
    Ok(removed)
}

/// [`create`] on a collection chosen at runtime, from JSON
///
/// # Errors
///
/// Returns a serialization error if `data` is not a record of `collection`,
/// or any error of [`create`]
pub fn create_value(
    db: &mut Database,
    collection: Collection,
    data: Value,
    sink: &dyn EventSink,
) -> Result<Value> {
    with_entity_type!(collection, T => {
        let record: T = serde_json::from_value(data)?;
        let created = create(db, record, sink)?;
        Ok(serde_json::to_value(created)?)
    })
}

/// [`update`] on a collection chosen at runtime, from a JSON patch
///
/// # Errors
///
/// Returns a serialization error if `patch` does not fit the collection's
/// patch type, or any error of [`update`]
pub fn update_value(
    db: &mut Database,
    collection: Collection,
    id: &str,
    patch: Value,
    sink: &dyn EventSink,
) -> Result<Value> {
    with_entity_type!(collection, T => {
        let patch: <T as Entity>::Patch = serde_json::from_value(patch)?;
        let updated = update::<T>(db, id, patch, sink)?;
        Ok(serde_json::to_value(updated)?)
    })
}

/// [`delete`] on a collection chosen at runtime
///
/// # Errors
///
/// Returns any error of [`delete`]
pub fn delete_value(
    db: &mut Database,
    collection: Collection,
    id: &str,
    sink: &dyn EventSink,
) -> Result<Value> {
    with_entity_type!(collection, T => {
        let removed = delete::<T>(db, id, sink)?;
        Ok(serde_json::to_value(removed)?)
    })
}
