//! Join rows between users, customers, factories and projects

use super::entities::FactoryType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a member in a relationship row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Owner,
    Manager,
    Member,
    Viewer,
}

/// User ↔ factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFactory {
    pub id: String,
    pub user_id: String,
    pub factory_id: String,
    pub role: MemberRole,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<String>,
}

impl UserFactory {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        factory_id: impl Into<String>,
        role: MemberRole,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            factory_id: factory_id.into(),
            role,
            assigned_at: Utc::now(),
            assigned_by: None,
        }
    }
}

define_patch! {
    /// Partial update for [`UserFactory`]
    pub struct UserFactoryPatch for UserFactory {
        role: MemberRole,
        assigned_by: Option<String>,
    }
}

/// User ↔ project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAssignment {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<String>,
}

impl ProjectAssignment {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
        role: MemberRole,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            user_id: user_id.into(),
            role,
            assigned_at: Utc::now(),
            assigned_by: None,
        }
    }
}

define_patch! {
    /// Partial update for [`ProjectAssignment`]
    pub struct ProjectAssignmentPatch for ProjectAssignment {
        role: MemberRole,
        assigned_by: Option<String>,
    }
}

/// Factory ↔ project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryProject {
    pub id: String,
    pub factory_id: String,
    pub project_id: String,
    pub role: FactoryType,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<String>,
}

impl FactoryProject {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        factory_id: impl Into<String>,
        project_id: impl Into<String>,
        role: FactoryType,
    ) -> Self {
        Self {
            id: id.into(),
            factory_id: factory_id.into(),
            project_id: project_id.into(),
            role,
            assigned_at: Utc::now(),
            assigned_by: None,
        }
    }
}

define_patch! {
    /// Partial update for [`FactoryProject`]
    pub struct FactoryProjectPatch for FactoryProject {
        role: FactoryType,
        assigned_by: Option<String>,
    }
}

/// User ↔ customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCustomer {
    pub id: String,
    pub user_id: String,
    pub customer_id: String,
    pub role: MemberRole,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<String>,
}

impl UserCustomer {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        customer_id: impl Into<String>,
        role: MemberRole,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            customer_id: customer_id.into(),
            role,
            assigned_at: Utc::now(),
            assigned_by: None,
        }
    }
}

define_patch! {
    /// Partial update for [`UserCustomer`]
    pub struct UserCustomerPatch for UserCustomer {
        role: MemberRole,
        assigned_by: Option<String>,
    }
}
