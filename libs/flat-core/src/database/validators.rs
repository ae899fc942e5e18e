//! Task validation rules
//!
//! These checks are not enforced on every write; callers run them on the task
//! set they are about to save. Each returns [`FlatError::Validation`] on the
//! first problem found.

use crate::database::Database;
use crate::error::{FlatError, Result};
use crate::models::{Task, TaskStatus};
use flat_common::MAX_PROGRESS;
use std::collections::{HashMap, HashSet};
use tracing::instrument;

/// Progress must be 0-100, 100 when completed, 0 when pending or cancelled
///
/// # Errors
///
/// Returns a validation error when progress and status disagree
pub fn validate_task_progress(task: &Task) -> Result<()> {
    if task.progress > MAX_PROGRESS {
        return Err(FlatError::validation(format!(
            "Task {} progress {} is outside 0-{MAX_PROGRESS}",
            task.id, task.progress
        )));
    }
    match task.status {
        TaskStatus::Completed if task.progress != MAX_PROGRESS => Err(FlatError::validation(
            format!(
                "Completed task {} must have progress {MAX_PROGRESS}, found {}",
                task.id, task.progress
            ),
        )),
        TaskStatus::Pending | TaskStatus::Cancelled if task.progress != 0 => {
            Err(FlatError::validation(format!(
                "Task {} with status {:?} must have progress 0, found {}",
                task.id, task.status, task.progress
            )))
        }
        _ => Ok(()),
    }
}

/// A task must not end before it starts
///
/// # Errors
///
/// Returns a validation error when `end_date < start_date`
pub fn validate_task_dates(task: &Task) -> Result<()> {
    if task.end_date < task.start_date {
        return Err(FlatError::validation(format!(
            "Task {} ends ({}) before it starts ({})",
            task.id, task.end_date, task.start_date
        )));
    }
    Ok(())
}

/// No two tasks may share a day; both ends of a date range are inclusive
///
/// # Errors
///
/// Returns a validation error naming the first overlapping pair
pub fn validate_no_overlap(tasks: &[Task]) -> Result<()> {
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    ordered.sort_by_key(|task| (task.start_date, task.end_date));
    for pair in ordered.windows(2) {
        let (earlier, later) = (pair[0], pair[1]);
        if later.start_date <= earlier.end_date {
            return Err(FlatError::validation(format!(
                "Task {} ({}..{}) overlaps task {} ({}..{})",
                later.id,
                later.start_date,
                later.end_date,
                earlier.id,
                earlier.start_date,
                earlier.end_date
            )));
        }
    }
    Ok(())
}

/// Dependencies must be acyclic and finish by the time the dependent starts
///
/// Dependency ids that are not in `tasks` are ignored.
///
/// # Errors
///
/// Returns a validation error on a dependency cycle or a dependency ending
/// after its dependent starts
pub fn validate_task_dependencies(tasks: &[Task]) -> Result<()> {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|task| (task.id.as_str(), task)).collect();

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        id: &'a str,
        by_id: &HashMap<&'a str, &'a Task>,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Result<()> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                path.push(id);
                return Err(FlatError::validation(format!(
                    "Circular task dependency: {}",
                    path.join(" -> ")
                )));
            }
            None => {}
        }
        marks.insert(id, Mark::Visiting);
        path.push(id);
        if let Some(&task) = by_id.get(id) {
            for dependency_id in &task.depends_on {
                if by_id.contains_key(dependency_id.as_str()) {
                    visit(dependency_id.as_str(), by_id, marks, path)?;
                }
            }
        }
        path.pop();
        marks.insert(id, Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    for task in tasks {
        let mut path = Vec::new();
        visit(task.id.as_str(), &by_id, &mut marks, &mut path)?;
    }

    for task in tasks {
        for dependency_id in &task.depends_on {
            if let Some(dependency) = by_id.get(dependency_id.as_str()) {
                if dependency.end_date > task.start_date {
                    return Err(FlatError::validation(format!(
                        "Task {} starts ({}) before its dependency {} ends ({})",
                        task.id, task.start_date, dependency.id, dependency.end_date
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Every participant must be an existing, active user
///
/// # Errors
///
/// Returns a validation error naming the first unknown or inactive user
#[instrument(skip(db, task), fields(task = %task.id))]
pub fn validate_participants(db: &Database, task: &Task) -> Result<()> {
    let mut seen = HashSet::new();
    for user_id in &task.participants {
        if !seen.insert(user_id.as_str()) {
            return Err(FlatError::validation(format!(
                "Task {} lists participant {user_id} twice",
                task.id
            )));
        }
        match db.users.get(user_id) {
            Some(user) if user.is_active => {}
            Some(_) => {
                return Err(FlatError::validation(format!(
                    "Participant {user_id} of task {} is inactive",
                    task.id
                )));
            }
            None => {
                return Err(FlatError::validation(format!(
                    "Participant {user_id} of task {} does not exist",
                    task.id
                )));
            }
        }
    }
    Ok(())
}

/// Assigned factories must exist and report progress within 0-100
///
/// # Errors
///
/// Returns a validation error naming the offending assignment
#[instrument(skip(db, task), fields(task = %task.id))]
pub fn validate_factory_assignments(db: &Database, task: &Task) -> Result<()> {
    for assignment in &task.factory_assignments {
        let Some(factory) = db.factories.get(&assignment.factory_id) else {
            return Err(FlatError::validation(format!(
                "Task {} is assigned to unknown factory {}",
                task.id, assignment.factory_id
            )));
        };
        if factory.factory_type != assignment.role {
            return Err(FlatError::validation(format!(
                "Factory {} is {} but assigned to task {} as {}",
                factory.id, factory.factory_type, task.id, assignment.role
            )));
        }
        if assignment.progress > MAX_PROGRESS {
            return Err(FlatError::validation(format!(
                "Factory {} progress {} on task {} is outside 0-{MAX_PROGRESS}",
                assignment.factory_id, assignment.progress, task.id
            )));
        }
        if let (Some(start), Some(end)) = (assignment.start_date, assignment.end_date) {
            if end < start {
                return Err(FlatError::validation(format!(
                    "Factory {} on task {} ends before it starts",
                    assignment.factory_id, task.id
                )));
            }
        }
    }
    Ok(())
}

/// Run every rule over one project's task set
///
/// # Errors
///
/// Returns the first validation error found
pub fn validate_tasks(db: &Database, tasks: &[Task]) -> Result<()> {
    for task in tasks {
        validate_task_progress(task)?;
        validate_task_dates(task)?;
        validate_participants(db, task)?;
        validate_factory_assignments(db, task)?;
    }
    validate_no_overlap(tasks)?;
    validate_task_dependencies(tasks)
}
