//! Referential integrity checks run before every mutation

use super::{Collection, Database, Entity};
use crate::error::{FlatError, Result};
use tracing::debug;

/// Mutation being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Check that `op` on `collection/id` keeps the database consistent
///
/// - create: the id must be free
/// - update: the record must exist
/// - delete: the record must exist and nothing may reference it
///
/// # Errors
///
/// Returns [`FlatError::DuplicateId`], [`FlatError::NotFound`] or
/// [`FlatError::Integrity`] naming the first referrer found
pub fn check_referential_integrity(
    db: &Database,
    collection: Collection,
    id: &str,
    op: Operation,
) -> Result<()> {
    match op {
        Operation::Create => {
            if db.contains(collection, id) {
                return Err(FlatError::DuplicateId {
                    collection,
                    id: id.to_string(),
                });
            }
        }
        Operation::Update => {
            if !db.contains(collection, id) {
                return Err(FlatError::not_found(collection, id));
            }
        }
        Operation::Delete => {
            if !db.contains(collection, id) {
                return Err(FlatError::not_found(collection, id));
            }
            if let Some((referrer_collection, referrer_id)) = find_referrer(db, collection, id) {
                debug!(%collection, id, %referrer_collection, %referrer_id, "Delete blocked");
                return Err(FlatError::integrity(
                    collection,
                    id,
                    format!("referenced by {referrer_collection}/{referrer_id}"),
                ));
            }
        }
    }
    Ok(())
}

/// First record (other than the target itself) that references `collection/id`
#[must_use]
pub fn find_referrer(db: &Database, collection: Collection, id: &str) -> Option<(Collection, String)> {
    Collection::ALL.into_iter().find_map(|source| {
        with_entity_type!(source, T => {
            T::table(db)
                .values()
                .filter(|record| !(source == collection && record.id() == id))
                .find(|record| {
                    record
                        .references()
                        .iter()
                        .any(|(target, target_id)| *target == collection && *target_id == id)
                })
                .map(|record| (source, record.id().to_string()))
        })
    })
}

/// Check that every reference held by `record` resolves
///
/// Also enforces one schedule per project.
///
/// # Errors
///
/// Returns [`FlatError::Integrity`] for a dangling reference or a second
/// schedule on the same project
pub fn check_references<T: Entity>(db: &Database, record: &T) -> Result<()> {
    for (target, target_id) in record.references() {
        let self_reference = target == T::COLLECTION && target_id == record.id();
        if !self_reference && !db.contains(target, target_id) {
            return Err(FlatError::integrity(
                T::COLLECTION,
                record.id(),
                format!("references missing {target}/{target_id}"),
            ));
        }
    }

    if T::COLLECTION == Collection::Schedules {
        let project_id = record
            .references()
            .into_iter()
            .find(|(target, _)| *target == Collection::Projects)
            .map(|(_, project_id)| project_id);
        if let Some(project_id) = project_id {
            let existing = db
                .schedules
                .values()
                .find(|schedule| schedule.project_id == project_id && schedule.id != record.id());
            if let Some(existing) = existing {
                return Err(FlatError::integrity(
                    T::COLLECTION,
                    record.id(),
                    format!("project {project_id} already has schedule {}", existing.id),
                ));
            }
        }
    }
    Ok(())
}
