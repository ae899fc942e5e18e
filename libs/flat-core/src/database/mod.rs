//! In-memory relational database: named collections of records keyed by id
//!
//! Every collection is a [`Table`] inside [`Database`]. Record types implement
//! [`Entity`], which ties them to their collection, their patch type and the
//! references they hold to other records.

use crate::error::{FlatError, Result};
use crate::models::Patch;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::str::FromStr;

/// Run `$body` with `$t` bound to the record type stored in `$collection`
macro_rules! with_entity_type {
    ($collection:expr, $t:ident => $body:expr) => {{
        use $crate::database::Collection as __Collection;
        #[allow(unused_imports)]
        use $crate::models::*;
        match $collection {
            __Collection::Users => { type $t = User; $body }
            __Collection::Customers => { type $t = Customer; $body }
            __Collection::Factories => { type $t = Factory; $body }
            __Collection::Projects => { type $t = Project; $body }
            __Collection::Schedules => { type $t = Schedule; $body }
            __Collection::Tasks => { type $t = Task; $body }
            __Collection::Comments => { type $t = Comment; $body }
            __Collection::ProductCategories => { type $t = ProductCategory; $body }
            __Collection::Products => { type $t = Product; $body }
            __Collection::UserFactories => { type $t = UserFactory; $body }
            __Collection::ProjectAssignments => { type $t = ProjectAssignment; $body }
            __Collection::FactoryProjects => { type $t = FactoryProject; $body }
            __Collection::UserCustomers => { type $t = UserCustomer; $body }
            __Collection::StatusMappings => { type $t = StatusMapping; $body }
            __Collection::PriorityMappings => { type $t = PriorityMapping; $body }
            __Collection::ServiceTypeMappings => { type $t = ServiceTypeMapping; $body }
            __Collection::ProjectTypeMappings => { type $t = ProjectTypeMapping; $body }
            __Collection::CustomFieldDefinitions => { type $t = CustomFieldDefinition; $body }
            __Collection::CustomFieldValues => { type $t = CustomFieldValue; $body }
            __Collection::CustomFieldGroups => { type $t = CustomFieldGroup; $body }
            __Collection::CustomFieldTemplates => { type $t = CustomFieldTemplate; $body }
            __Collection::UiSettings => { type $t = UiSetting; $body }
        }
    }};
}

pub mod crud;
pub mod integrity;
mod records;
pub mod validators;

/// One collection: records keyed by id, iterated in id order
pub type Table<T> = BTreeMap<String, T>;

/// Name of a collection in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Users,
    Customers,
    Factories,
    Projects,
    Schedules,
    Tasks,
    Comments,
    ProductCategories,
    Products,
    UserFactories,
    ProjectAssignments,
    FactoryProjects,
    UserCustomers,
    StatusMappings,
    PriorityMappings,
    ServiceTypeMappings,
    ProjectTypeMappings,
    CustomFieldDefinitions,
    CustomFieldValues,
    CustomFieldGroups,
    CustomFieldTemplates,
    UiSettings,
}

impl Collection {
    /// Every collection, in persisted order
    pub const ALL: [Collection; 22] = [
        Self::Users,
        Self::Customers,
        Self::Factories,
        Self::Projects,
        Self::Schedules,
        Self::Tasks,
        Self::Comments,
        Self::ProductCategories,
        Self::Products,
        Self::UserFactories,
        Self::ProjectAssignments,
        Self::FactoryProjects,
        Self::UserCustomers,
        Self::StatusMappings,
        Self::PriorityMappings,
        Self::ServiceTypeMappings,
        Self::ProjectTypeMappings,
        Self::CustomFieldDefinitions,
        Self::CustomFieldValues,
        Self::CustomFieldGroups,
        Self::CustomFieldTemplates,
        Self::UiSettings,
    ];

    /// Persisted name of the collection
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Customers => "customers",
            Self::Factories => "factories",
            Self::Projects => "projects",
            Self::Schedules => "schedules",
            Self::Tasks => "tasks",
            Self::Comments => "comments",
            Self::ProductCategories => "productCategories",
            Self::Products => "products",
            Self::UserFactories => "userFactories",
            Self::ProjectAssignments => "projectAssignments",
            Self::FactoryProjects => "factoryProjects",
            Self::UserCustomers => "userCustomers",
            Self::StatusMappings => "statusMappings",
            Self::PriorityMappings => "priorityMappings",
            Self::ServiceTypeMappings => "serviceTypeMappings",
            Self::ProjectTypeMappings => "projectTypeMappings",
            Self::CustomFieldDefinitions => "customFieldDefinitions",
            Self::CustomFieldValues => "customFieldValues",
            Self::CustomFieldGroups => "customFieldGroups",
            Self::CustomFieldTemplates => "customFieldTemplates",
            Self::UiSettings => "uiSettings",
        }
    }

    /// Prefix used for generated ids
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Users => "user",
            Self::Customers => "customer",
            Self::Factories => "factory",
            Self::Projects => "project",
            Self::Schedules => "schedule",
            Self::Tasks => "task",
            Self::Comments => "comment",
            Self::ProductCategories => "category",
            Self::Products => "product",
            Self::UserFactories => "uf",
            Self::ProjectAssignments => "pa",
            Self::FactoryProjects => "fp",
            Self::UserCustomers => "uc",
            Self::StatusMappings => "status",
            Self::PriorityMappings => "priority",
            Self::ServiceTypeMappings => "service",
            Self::ProjectTypeMappings => "ptype",
            Self::CustomFieldDefinitions => "cf",
            Self::CustomFieldValues => "cfv",
            Self::CustomFieldGroups => "cfg",
            Self::CustomFieldTemplates => "cft",
            Self::UiSettings => "setting",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = FlatError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == s)
            .ok_or_else(|| FlatError::validation(format!("Unknown collection: {s}")))
    }
}

/// A record type stored in one collection of the [`Database`]
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + 'static {
    /// Collection holding records of this type
    const COLLECTION: Collection;

    /// Partial update type
    type Patch: Patch<Self>;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn table(db: &Database) -> &Table<Self>;

    fn table_mut(db: &mut Database) -> &mut Table<Self>;

    /// Stamp the record as modified at `now`
    fn touch(&mut self, _now: DateTime<Utc>) {}

    /// Check the record's own invariants
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first broken invariant
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Records this one points at, as `(collection, id)` pairs
    fn references(&self) -> Vec<(Collection, &str)> {
        Vec::new()
    }
}

mod entries {
    //! Tables persist as arrays of `[id, record]` pairs

    use super::Table;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(table: &Table<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(table.iter())
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Table<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let pairs: Vec<(String, T)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

/// Every collection of the store
///
/// Serializes to the persisted `data` object. Missing collections default to
/// empty and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Database {
    #[serde(with = "entries")]
    pub users: Table<crate::models::User>,
    #[serde(with = "entries")]
    pub customers: Table<crate::models::Customer>,
    #[serde(with = "entries")]
    pub factories: Table<crate::models::Factory>,
    #[serde(with = "entries")]
    pub projects: Table<crate::models::Project>,
    #[serde(with = "entries")]
    pub schedules: Table<crate::models::Schedule>,
    #[serde(with = "entries")]
    pub tasks: Table<crate::models::Task>,
    #[serde(with = "entries")]
    pub comments: Table<crate::models::Comment>,
    #[serde(with = "entries")]
    pub product_categories: Table<crate::models::ProductCategory>,
    #[serde(with = "entries")]
    pub products: Table<crate::models::Product>,
    #[serde(with = "entries")]
    pub user_factories: Table<crate::models::UserFactory>,
    #[serde(with = "entries")]
    pub project_assignments: Table<crate::models::ProjectAssignment>,
    #[serde(with = "entries")]
    pub factory_projects: Table<crate::models::FactoryProject>,
    #[serde(with = "entries")]
    pub user_customers: Table<crate::models::UserCustomer>,
    #[serde(with = "entries")]
    pub status_mappings: Table<crate::models::StatusMapping>,
    #[serde(with = "entries")]
    pub priority_mappings: Table<crate::models::PriorityMapping>,
    #[serde(with = "entries")]
    pub service_type_mappings: Table<crate::models::ServiceTypeMapping>,
    #[serde(with = "entries")]
    pub project_type_mappings: Table<crate::models::ProjectTypeMapping>,
    #[serde(with = "entries")]
    pub custom_field_definitions: Table<crate::models::CustomFieldDefinition>,
    #[serde(with = "entries")]
    pub custom_field_values: Table<crate::models::CustomFieldValue>,
    #[serde(with = "entries")]
    pub custom_field_groups: Table<crate::models::CustomFieldGroup>,
    #[serde(with = "entries")]
    pub custom_field_templates: Table<crate::models::CustomFieldTemplate>,
    #[serde(with = "entries")]
    pub ui_settings: Table<crate::models::UiSetting>,
}

impl Database {
    /// Empty database
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a collection
    #[must_use]
    pub fn len_of(&self, collection: Collection) -> usize {
        with_entity_type!(collection, T => T::table(self).len())
    }

    /// Whether a record with `id` exists in `collection`
    #[must_use]
    pub fn contains(&self, collection: Collection, id: &str) -> bool {
        with_entity_type!(collection, T => T::table(self).contains_key(id))
    }

    /// Record counts for every collection
    #[must_use]
    pub fn counts(&self) -> BTreeMap<Collection, usize> {
        Collection::ALL
            .into_iter()
            .map(|collection| (collection, self.len_of(collection)))
            .collect()
    }

    /// Total number of records across collections
    #[must_use]
    pub fn total_records(&self) -> usize {
        Collection::ALL
            .into_iter()
            .map(|collection| self.len_of(collection))
            .sum()
    }

    /// Whether every collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }
}
