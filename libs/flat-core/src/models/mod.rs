//! Record types stored in the FLAT database

#[macro_use]
pub(crate) mod patch;

mod catalog;
mod comments;
mod custom_fields;
mod entities;
mod mappings;
mod projects;
mod relations;

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

pub use catalog::{Product, ProductCategory, ProductCategoryPatch, ProductPatch};
pub use comments::{
    Attachment, Comment, CommentAuthor, CommentPatch, CreateCommentRequest, ReactionUser,
};
pub use custom_fields::{
    CustomFieldDefinition, CustomFieldDefinitionPatch, CustomFieldGroup, CustomFieldGroupPatch,
    CustomFieldTemplate, CustomFieldTemplatePatch, CustomFieldType, CustomFieldValue,
    CustomFieldValuePatch, EntityKind, FieldValue, ValidationRules,
};
pub use entities::{
    Customer, CustomerPatch, Factory, FactoryPatch, FactoryType, User, UserPatch, UserRole,
};
pub use mappings::{
    label_for, PriorityMapping, PriorityMappingPatch, ProjectTypeMapping, ProjectTypeMappingPatch,
    ServiceTypeMapping, ServiceTypeMappingPatch, StatusMapping, StatusMappingPatch, UiSetting,
    UiSettingPatch,
};
pub use projects::{
    ChecklistItem, DeleteChildHandling, FactoryAssignment, FactoryIds, Priority, ProductInfo,
    Project, ProjectPatch, ProjectStatus, ProjectType, Schedule, SchedulePatch, ServiceType, Task,
    TaskPatch, TaskStatus,
};
pub use relations::{
    FactoryProject, FactoryProjectPatch, MemberRole, ProjectAssignment, ProjectAssignmentPatch,
    UserCustomer, UserCustomerPatch, UserFactory, UserFactoryPatch,
};

/// Typed partial update for a record of type `T`
pub trait Patch<T>: Default + Clone + Debug + Serialize + DeserializeOwned {
    /// Merge every set field into `target`
    fn apply(self, target: &mut T);

    /// Whether no field is set
    fn is_empty(&self) -> bool;
}
