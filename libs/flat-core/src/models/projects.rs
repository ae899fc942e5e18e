//! Projects, schedules and tasks

use super::entities::FactoryType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Project type enumeration
///
/// `Task` exists in stored data but is reserved: aggregation ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectType {
    Master,
    Sub,
    Task,
}

/// Project priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Service type of a manufacturing project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Oem,
    Odm,
    Obm,
    Other,
}

/// Project status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

/// One or many factory ids
///
/// SUB projects usually hold a single id; MASTER aggregates are always
/// stored as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactoryIds {
    Single(String),
    Multiple(Vec<String>),
}

impl FactoryIds {
    /// Iterate over the contained ids
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let ids: &[String] = match self {
            Self::Single(id) => std::slice::from_ref(id),
            Self::Multiple(ids) => ids,
        };
        ids.iter().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.iter().any(|candidate| candidate == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Normalize into a list
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(id) => vec![id],
            Self::Multiple(ids) => ids,
        }
    }
}

impl From<&str> for FactoryIds {
    fn from(id: &str) -> Self {
        Self::Single(id.to_string())
    }
}

impl From<Vec<String>> for FactoryIds {
    fn from(ids: Vec<String>) -> Self {
        Self::Multiple(ids)
    }
}

impl fmt::Display for FactoryIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iter().collect::<Vec<_>>().join(", "))
    }
}

/// Product details carried on a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub name: String,
    pub volume: Option<String>,
    pub formulation: Option<String>,
    pub quantity: Option<u32>,
}

/// Checklist entry on a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    pub title: String,
    pub done: bool,
}

/// Project entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    /// MASTER id for SUB projects
    pub parent_id: Option<String>,
    pub name: String,
    pub customer_id: Option<String>,
    /// Customer display name snapshot
    pub customer: Option<String>,
    pub manufacturer_id: Option<FactoryIds>,
    pub container_id: Option<FactoryIds>,
    pub packaging_id: Option<FactoryIds>,
    pub service_type: ServiceType,
    pub priority: Priority,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub product_type: Option<String>,
    pub product: Option<ProductInfo>,
    #[serde(default)]
    pub task_checklist: Vec<ChecklistItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    fn with_type(id: String, name: String, project_type: ProjectType) -> Self {
        let now = Utc::now();
        Self {
            id,
            project_type,
            parent_id: None,
            name,
            customer_id: None,
            customer: None,
            manufacturer_id: None,
            container_id: None,
            packaging_id: None,
            service_type: ServiceType::Oem,
            priority: Priority::Medium,
            status: ProjectStatus::Planning,
            start_date: None,
            end_date: None,
            product_type: None,
            product: None,
            task_checklist: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a MASTER project
    #[must_use]
    pub fn new_master(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_type(id.into(), name.into(), ProjectType::Master)
    }

    /// Create a SUB project belonging to `parent_id`
    #[must_use]
    pub fn new_sub(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let mut project = Self::with_type(id.into(), name.into(), ProjectType::Sub);
        project.parent_id = Some(parent_id.into());
        project
    }

    #[must_use]
    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    #[must_use]
    pub fn with_customer(mut self, customer_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self.customer = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_factory(mut self, role: FactoryType, factory_id: &str) -> Self {
        *self.factory_ids_mut(role) = Some(FactoryIds::from(factory_id));
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_service_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = service_type;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn is_master(&self) -> bool {
        self.project_type == ProjectType::Master
    }

    #[must_use]
    pub fn is_sub(&self) -> bool {
        self.project_type == ProjectType::Sub
    }

    /// Factory ids assigned for a role
    #[must_use]
    pub const fn factory_ids(&self, role: FactoryType) -> Option<&FactoryIds> {
        match role {
            FactoryType::Manufacturing => self.manufacturer_id.as_ref(),
            FactoryType::Container => self.container_id.as_ref(),
            FactoryType::Packaging => self.packaging_id.as_ref(),
        }
    }

    pub fn factory_ids_mut(&mut self, role: FactoryType) -> &mut Option<FactoryIds> {
        match role {
            FactoryType::Manufacturing => &mut self.manufacturer_id,
            FactoryType::Container => &mut self.container_id,
            FactoryType::Packaging => &mut self.packaging_id,
        }
    }

    /// Every factory id referenced by this project, across all roles
    pub fn all_factory_ids(&self) -> impl Iterator<Item = &str> + '_ {
        FactoryType::ALL
            .into_iter()
            .filter_map(move |role| self.factory_ids(role))
            .flat_map(FactoryIds::iter)
    }
}

define_patch! {
    /// Partial update for [`Project`]
    pub struct ProjectPatch for Project {
        #[serde(rename = "type")]
        project_type: ProjectType,
        parent_id: Option<String>,
        name: String,
        customer_id: Option<String>,
        customer: Option<String>,
        manufacturer_id: Option<FactoryIds>,
        container_id: Option<FactoryIds>,
        packaging_id: Option<FactoryIds>,
        service_type: ServiceType,
        priority: Priority,
        status: ProjectStatus,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        product_type: Option<String>,
        product: Option<ProductInfo>,
        task_checklist: Vec<ChecklistItem>,
    }
}

/// One schedule per project, owning that project's tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub project_id: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    #[must_use]
    pub fn new(id: impl Into<String>, project_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            project_id: project_id.into(),
            name: None,
            created_at: now,
            updated_at: now,
        }
    }
}

define_patch! {
    /// Partial update for [`Schedule`]
    pub struct SchedulePatch for Schedule {
        project_id: String,
        name: Option<String>,
    }
}

/// Task status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Delayed,
    Cancelled,
}

/// A factory's share of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryAssignment {
    pub factory_id: String,
    pub role: FactoryType,
    pub status: TaskStatus,
    pub progress: u8,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl FactoryAssignment {
    #[must_use]
    pub fn new(factory_id: impl Into<String>, role: FactoryType) -> Self {
        Self {
            factory_id: factory_id.into(),
            role,
            status: TaskStatus::Pending,
            progress: 0,
            start_date: None,
            end_date: None,
        }
    }
}

/// Task entity, always owned by a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub schedule_id: String,
    pub title: String,
    pub task_type: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: TaskStatus,
    /// Percent complete, 0 to 100
    pub progress: u8,
    #[serde(default)]
    pub factory_assignments: Vec<FactoryAssignment>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// User ids
    #[serde(default)]
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        schedule_id: impl Into<String>,
        title: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            schedule_id: schedule_id.into(),
            title: title.into(),
            task_type: None,
            start_date,
            end_date,
            status: TaskStatus::Pending,
            progress: 0,
            factory_assignments: Vec::new(),
            depends_on: Vec::new(),
            participants: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: TaskStatus, progress: u8) -> Self {
        self.status = status;
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn depending_on(mut self, task_id: impl Into<String>) -> Self {
        self.depends_on.push(task_id.into());
        self
    }
}

define_patch! {
    /// Partial update for [`Task`]
    pub struct TaskPatch for Task {
        schedule_id: String,
        title: String,
        task_type: Option<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        status: TaskStatus,
        progress: u8,
        factory_assignments: Vec<FactoryAssignment>,
        depends_on: Vec<String>,
        participants: Vec<String>,
    }
}

/// How to handle SUB projects when deleting a MASTER
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteChildHandling {
    /// Refuse to delete a MASTER that still has SUBs
    #[default]
    Error,
    /// Delete every SUB, with its own dependents, before the MASTER
    Cascade,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_type_serialization() {
        assert_eq!(serde_json::to_string(&ProjectType::Master).unwrap(), "\"MASTER\"");
        assert_eq!(serde_json::to_string(&ProjectType::Sub).unwrap(), "\"SUB\"");
    }

    #[test]
    fn test_factory_ids_accepts_scalar_and_list() {
        let single: FactoryIds = serde_json::from_str("\"factory-1\"").unwrap();
        assert_eq!(single, FactoryIds::Single("factory-1".to_string()));

        let many: FactoryIds = serde_json::from_str(r#"["factory-1","factory-2"]"#).unwrap();
        assert!(many.contains("factory-2"));
        assert_eq!(many.iter().count(), 2);
    }

    #[test]
    fn test_factory_ids_into_vec() {
        assert_eq!(FactoryIds::from("f1").into_vec(), vec!["f1".to_string()]);
        assert!(FactoryIds::Multiple(Vec::new()).is_empty());
    }

    #[test]
    fn test_project_json_shape() {
        let project = Project::new_sub("sub-1", "master-1", "Cream")
            .with_factory(FactoryType::Manufacturing, "factory-1");
        let value = serde_json::to_value(&project).unwrap();
        assert_eq!(value["type"], "SUB");
        assert_eq!(value["parentId"], "master-1");
        assert_eq!(value["manufacturerId"], "factory-1");
        assert!(value["containerId"].is_null());
    }

    #[test]
    fn test_all_factory_ids() {
        let mut project = Project::new_master("m", "Master")
            .with_factory(FactoryType::Container, "c1");
        project.manufacturer_id = Some(FactoryIds::Multiple(vec!["f1".into(), "f2".into()]));
        let ids: Vec<&str> = project.all_factory_ids().collect();
        assert_eq!(ids, vec!["f1", "f2", "c1"]);
    }

    #[test]
    fn test_task_deserializes_without_optional_lists() {
        let json = r#"{
            "id": "task-1",
            "scheduleId": "schedule-1",
            "title": "Fill",
            "taskType": null,
            "startDate": "2025-01-01",
            "endDate": "2025-01-03",
            "status": "IN_PROGRESS",
            "progress": 40,
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.depends_on.is_empty());
        assert!(task.factory_assignments.is_empty());
    }
}
