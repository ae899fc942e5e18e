//! Project operations of the store
//!
//! MASTER projects aggregate their SUBs; SUBs mirror the MASTER-owned
//! fields. Every project write here keeps both directions in step.

use super::FlatStore;
use crate::aggregation;
use crate::database::{crud, Database};
use crate::error::{FlatError, Result};
use crate::events::EventSink;
use crate::models::{DeleteChildHandling, Project, ProjectPatch, ProjectType};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Records removed by [`FlatStore::delete_project`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub projects: Vec<String>,
    pub schedules: usize,
    pub tasks: usize,
    pub comments: usize,
    pub assignments: usize,
    pub factory_links: usize,
    pub custom_field_values: usize,
}

impl CascadeSummary {
    /// Rows removed besides the projects themselves
    #[must_use]
    pub const fn dependent_records(&self) -> usize {
        self.schedules
            + self.tasks
            + self.comments
            + self.assignments
            + self.factory_links
            + self.custom_field_values
    }
}

/// A SUB's parent must be an existing MASTER; a MASTER has no parent
pub(super) fn check_parent(db: &Database, project: &Project) -> Result<()> {
    match (project.project_type, project.parent_id.as_deref()) {
        (ProjectType::Sub, Some(parent_id)) => match db.projects.get(parent_id) {
            Some(parent) if parent.is_master() => Ok(()),
            Some(parent) => Err(FlatError::validation(format!(
                "Parent {parent_id} of project {} is {:?}, not a MASTER project",
                project.id, parent.project_type
            ))),
            None => Err(FlatError::ProjectNotFound {
                id: parent_id.to_string(),
            }),
        },
        _ => Ok(()),
    }
}

impl FlatStore {
    /// Fetch a project after bringing every MASTER up to date
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::ProjectNotFound`] for an unknown id
    #[instrument(skip(self))]
    pub fn get_project(&mut self, id: &str) -> Result<Project> {
        self.refresh_all_masters()?;
        self.db
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| FlatError::ProjectNotFound { id: id.to_string() })
    }

    /// Every project, with MASTER aggregates recomputed first
    ///
    /// # Errors
    ///
    /// Returns an error if writing a MASTER aggregate fails
    #[instrument(skip(self))]
    pub fn get_all_projects(&mut self) -> Result<Vec<Project>> {
        self.refresh_all_masters()?;
        Ok(self.db.projects.values().cloned().collect())
    }

    /// SUBs of `master_id`, oldest first
    #[must_use]
    pub fn get_sub_projects(&self, master_id: &str) -> Vec<Project> {
        aggregation::sub_projects_of(&self.db, master_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Recompute every MASTER now; returns how many changed
    ///
    /// # Errors
    ///
    /// Returns the first error raised while writing a MASTER
    #[instrument(skip(self))]
    pub fn update_all_master_projects(&mut self) -> Result<usize> {
        let changed = self.refresh_all_masters()?;
        info!(changed, "MASTER aggregates recomputed");
        Ok(changed)
    }

    /// Create a SUB under `master_id`
    ///
    /// The SUB takes the MASTER's customer, priority and service type, and
    /// its dates are pulled inside the MASTER's range.
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::ProjectNotFound`] for an unknown MASTER,
    /// [`FlatError::Validation`] when it is not a MASTER, or any create error
    #[instrument(skip(self, sub))]
    pub fn create_sub_project(&mut self, master_id: &str, mut sub: Project) -> Result<Project> {
        let master = self
            .db
            .projects
            .get(master_id)
            .cloned()
            .ok_or_else(|| FlatError::ProjectNotFound {
                id: master_id.to_string(),
            })?;
        if !master.is_master() {
            return Err(FlatError::validation(format!(
                "Project {master_id} is {:?}, not a MASTER project",
                master.project_type
            )));
        }

        sub.project_type = ProjectType::Sub;
        sub.parent_id = Some(master_id.to_string());
        aggregation::inherit_from_master(&mut sub, &master);
        self.create(sub)
    }

    /// Patch a project, keeping MASTER and SUBs in sync
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::ProjectNotFound`] for an unknown id, or any
    /// validation or integrity error
    pub fn update_project(&mut self, id: &str, patch: ProjectPatch) -> Result<Project> {
        if !self.db.projects.contains_key(id) {
            return Err(FlatError::ProjectNotFound { id: id.to_string() });
        }
        self.update(id, patch)
    }

    /// Delete a project with everything hanging off it
    ///
    /// Schedules, tasks, comments, assignments, factory links and custom
    /// field values of the project and its tasks go with it. Surviving tasks
    /// drop dependencies on removed ones. A MASTER with SUBs is refused
    /// under [`DeleteChildHandling::Error`] and takes its SUBs along under
    /// [`DeleteChildHandling::Cascade`]. Only removed projects produce
    /// events.
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::ProjectNotFound`] for an unknown id or
    /// [`FlatError::Validation`] when SUBs block the delete
    #[instrument(skip(self))]
    pub fn delete_project(
        &mut self,
        id: &str,
        child_handling: DeleteChildHandling,
    ) -> Result<CascadeSummary> {
        let project = self
            .db
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| FlatError::ProjectNotFound { id: id.to_string() })?;

        let sub_ids: Vec<String> = aggregation::sub_projects_of(&self.db, id)
            .into_iter()
            .map(|sub| sub.id.clone())
            .collect();
        if !sub_ids.is_empty() && child_handling == DeleteChildHandling::Error {
            return Err(FlatError::validation(format!(
                "Project {id} has {} sub-projects; delete them first or cascade",
                sub_ids.len()
            )));
        }

        let summary = self.atomically(|store, sink| {
            let mut summary = CascadeSummary::default();
            for sub_id in &sub_ids {
                store.remove_project_tree(sub_id, &mut summary, sink)?;
            }
            store.remove_project_tree(id, &mut summary, sink)?;

            if let Some(parent_id) = project.parent_id.as_deref() {
                store.refresh_master(parent_id, sink)?;
            }
            Ok(summary)
        })?;
        info!(
            project = id,
            projects = summary.projects.len(),
            dependents = summary.dependent_records(),
            "Project deleted"
        );
        self.persist();
        Ok(summary)
    }

    /// Remove one project and its dependents; no persistence
    fn remove_project_tree(
        &mut self,
        id: &str,
        summary: &mut CascadeSummary,
        sink: &dyn EventSink,
    ) -> Result<()> {
        let db = &mut self.db;

        let schedule_ids: Vec<String> = db
            .schedules
            .values()
            .filter(|schedule| schedule.project_id == id)
            .map(|schedule| schedule.id.clone())
            .collect();
        let task_ids: HashSet<String> = db
            .tasks
            .values()
            .filter(|task| schedule_ids.contains(&task.schedule_id))
            .map(|task| task.id.clone())
            .collect();
        db.tasks.retain(|task_id, _| !task_ids.contains(task_id));
        summary.tasks += task_ids.len();
        for task in db.tasks.values_mut() {
            task.depends_on.retain(|dependency| !task_ids.contains(dependency));
        }
        for schedule_id in &schedule_ids {
            db.schedules.remove(schedule_id);
        }
        summary.schedules += schedule_ids.len();

        summary.comments += remove_where(&mut db.comments, |c| c.project_id == id);
        summary.assignments += remove_where(&mut db.project_assignments, |a| a.project_id == id);
        summary.factory_links += remove_where(&mut db.factory_projects, |l| l.project_id == id);
        summary.custom_field_values += remove_where(&mut db.custom_field_values, |v| {
            v.entity_id == id || task_ids.contains(&v.entity_id)
        });

        crud::delete::<Project>(db, id, sink)?;
        debug!(project = id, "Removed project tree");
        summary.projects.push(id.to_string());
        Ok(())
    }

    /// Re-aggregate affected MASTERs and fan MASTER fields out to SUBs
    pub(super) fn synchronize_project(
        &mut self,
        before: &Project,
        after: &Project,
        sink: &dyn EventSink,
    ) -> Result<()> {
        if aggregation::affects_master_aggregate(before, after) {
            let mut parents: Vec<&str> = after.parent_id.as_deref().into_iter().collect();
            if let Some(former) = before.parent_id.as_deref() {
                if !parents.contains(&former) {
                    parents.push(former);
                }
            }
            for parent_id in parents {
                self.refresh_master(parent_id, sink)?;
            }
        }

        if after.is_master() && aggregation::shared_fields_changed(before, after) {
            let patch = aggregation::shared_fields_patch(after);
            let sub_ids: Vec<String> = aggregation::sub_projects_of(&self.db, &after.id)
                .into_iter()
                .map(|sub| sub.id.clone())
                .collect();
            debug!(master = %after.id, subs = sub_ids.len(), "Propagating MASTER fields");
            for sub_id in sub_ids {
                crud::update::<Project>(&mut self.db, &sub_id, patch.clone(), sink)?;
            }
        }
        Ok(())
    }

    fn refresh_all_masters(&mut self) -> Result<usize> {
        aggregation::update_all_master_projects(&mut self.db, &self.events)
    }
}

fn remove_where<T>(
    table: &mut crate::database::Table<T>,
    mut predicate: impl FnMut(&T) -> bool,
) -> usize {
    let before = table.len();
    table.retain(|_, record| !predicate(record));
    before - table.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Factory, FactoryType, Priority, ProjectStatus};
    use chrono::NaiveDate;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    fn store_with_master() -> FlatStore {
        let mut store = FlatStore::empty();
        store
            .create(Factory::new("factory-m1", "Mix", FactoryType::Manufacturing))
            .unwrap();
        store
            .create(
                Project::new_master("project-m", "Line")
                    .with_dates(date(1, 1), date(12, 31))
                    .with_priority(Priority::High),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_create_sub_project_inherits_and_aggregates() {
        let mut store = store_with_master();
        let sub = Project::new_sub("project-s1", "project-m", "Bottle")
            .with_dates(date(2, 1), date(3, 1))
            .with_priority(Priority::Low)
            .with_factory(FactoryType::Manufacturing, "factory-m1");
        let created = store.create_sub_project("project-m", sub).unwrap();
        assert_eq!(created.priority, Priority::High);

        let master = store.get_project("project-m").unwrap();
        assert_eq!(master.start_date, Some(date(2, 1)));
        assert!(master
            .factory_ids(FactoryType::Manufacturing)
            .is_some_and(|ids| ids.contains("factory-m1")));
    }

    #[test]
    fn test_sub_under_sub_is_rejected() {
        let mut store = store_with_master();
        store
            .create_sub_project("project-m", Project::new_sub("project-s1", "project-m", "A"))
            .unwrap();
        let nested = Project::new_sub("project-s2", "project-s1", "B");
        assert!(matches!(
            store.create(nested),
            Err(FlatError::Validation { .. })
        ));
        assert!(store
            .create_sub_project("project-s1", Project::new_sub("project-s3", "x", "C"))
            .is_err());
    }

    #[test]
    fn test_master_field_change_reaches_subs() {
        let mut store = store_with_master();
        store
            .create_sub_project("project-m", Project::new_sub("project-s1", "project-m", "A"))
            .unwrap();
        let patch = ProjectPatch {
            priority: Some(Priority::Medium),
            ..ProjectPatch::default()
        };
        store.update_project("project-m", patch).unwrap();
        let sub: Project = store.get("project-s1").unwrap();
        assert_eq!(sub.priority, Priority::Medium);
    }

    #[test]
    fn test_sub_status_change_rolls_up() {
        let mut store = store_with_master();
        store
            .create_sub_project("project-m", Project::new_sub("project-s1", "project-m", "A"))
            .unwrap();
        let patch = ProjectPatch {
            status: Some(ProjectStatus::Completed),
            ..ProjectPatch::default()
        };
        store.update_project("project-s1", patch).unwrap();
        let master: Project = store.get("project-m").unwrap();
        assert_eq!(master.status, ProjectStatus::Completed);
    }

    #[test]
    fn test_delete_master_with_subs_needs_cascade() {
        let mut store = store_with_master();
        store
            .create_sub_project("project-m", Project::new_sub("project-s1", "project-m", "A"))
            .unwrap();
        assert!(store
            .delete_project("project-m", DeleteChildHandling::Error)
            .is_err());

        let summary = store
            .delete_project("project-m", DeleteChildHandling::Cascade)
            .unwrap();
        assert_eq!(summary.projects, vec!["project-s1", "project-m"]);
        assert!(store.database().projects.is_empty());
    }

    #[test]
    fn test_update_unknown_project() {
        let mut store = FlatStore::empty();
        assert!(matches!(
            store.update_project("project-404", ProjectPatch::default()),
            Err(FlatError::ProjectNotFound { .. })
        ));
        assert!(matches!(
            store.delete_project("project-404", DeleteChildHandling::Cascade),
            Err(FlatError::ProjectNotFound { .. })
        ));
    }
}
