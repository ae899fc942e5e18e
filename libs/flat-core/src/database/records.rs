//! [`Entity`] implementations for every record type

use super::{Collection, Database, Entity, Table};
use crate::custom_fields::collection_for;
use crate::error::{FlatError, Result};
use crate::models::*;
use chrono::{DateTime, Utc};

macro_rules! impl_entity {
    (
        $ty:ty, $patch:ty, $variant:ident, $field:ident
        $(, touch = $stamp:ident)?
        $(, touch_some = $opt_stamp:ident)?
        $(, validate = $validate:path)?
        $(, references = $refs:path)?
    ) => {
        impl Entity for $ty {
            const COLLECTION: Collection = Collection::$variant;
            type Patch = $patch;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn table(db: &Database) -> &Table<Self> {
                &db.$field
            }

            fn table_mut(db: &mut Database) -> &mut Table<Self> {
                &mut db.$field
            }

            $(
                fn touch(&mut self, now: DateTime<Utc>) {
                    self.$stamp = now;
                }
            )?

            $(
                fn touch(&mut self, now: DateTime<Utc>) {
                    self.$opt_stamp = Some(now);
                }
            )?

            $(
                fn validate(&self) -> Result<()> {
                    $validate(self)
                }
            )?

            $(
                fn references(&self) -> Vec<(Collection, &str)> {
                    $refs(self)
                }
            )?
        }
    };
}

fn require_text(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FlatError::validation(format!("{what} must not be empty")));
    }
    Ok(())
}

fn validate_user(user: &User) -> Result<()> {
    require_text(&user.name, "User name")?;
    if !user.email.contains('@') {
        return Err(FlatError::validation(format!(
            "Invalid email for user {}: {}",
            user.id, user.email
        )));
    }
    Ok(())
}

fn validate_customer(customer: &Customer) -> Result<()> {
    require_text(&customer.company_name, "Customer company name")
}

fn validate_factory(factory: &Factory) -> Result<()> {
    require_text(&factory.name, "Factory name")
}

fn validate_project(project: &Project) -> Result<()> {
    require_text(&project.name, "Project name")?;
    match (project.project_type, project.parent_id.as_deref()) {
        (ProjectType::Master, Some(parent)) => {
            return Err(FlatError::validation(format!(
                "MASTER project {} cannot have a parent ({parent})",
                project.id
            )));
        }
        (ProjectType::Sub, None) => {
            return Err(FlatError::validation(format!(
                "SUB project {} requires a parent",
                project.id
            )));
        }
        (ProjectType::Sub, Some(parent)) if parent == project.id => {
            return Err(FlatError::validation(format!(
                "Project {} cannot be its own parent",
                project.id
            )));
        }
        _ => {}
    }
    if let (Some(start), Some(end)) = (project.start_date, project.end_date) {
        if start > end {
            return Err(FlatError::validation(format!(
                "Project {} starts ({start}) after it ends ({end})",
                project.id
            )));
        }
    }
    Ok(())
}

fn project_references(project: &Project) -> Vec<(Collection, &str)> {
    let mut refs: Vec<(Collection, &str)> = project
        .all_factory_ids()
        .map(|id| (Collection::Factories, id))
        .collect();
    if let Some(parent) = project.parent_id.as_deref() {
        refs.push((Collection::Projects, parent));
    }
    if let Some(customer) = project.customer_id.as_deref() {
        refs.push((Collection::Customers, customer));
    }
    refs
}

fn schedule_references(schedule: &Schedule) -> Vec<(Collection, &str)> {
    vec![(Collection::Projects, schedule.project_id.as_str())]
}

fn validate_task(task: &Task) -> Result<()> {
    require_text(&task.title, "Task title")
}

fn task_references(task: &Task) -> Vec<(Collection, &str)> {
    let mut refs = vec![(Collection::Schedules, task.schedule_id.as_str())];
    refs.extend(
        task.factory_assignments
            .iter()
            .map(|assignment| (Collection::Factories, assignment.factory_id.as_str())),
    );
    refs
}

fn validate_comment(comment: &Comment) -> Result<()> {
    require_text(&comment.content, "Comment content")
}

fn comment_references(comment: &Comment) -> Vec<(Collection, &str)> {
    let mut refs = vec![
        (Collection::Projects, comment.project_id.as_str()),
        (Collection::Users, comment.user_id.as_str()),
    ];
    if let Some(parent) = comment.parent_id.as_deref() {
        refs.push((Collection::Comments, parent));
    }
    refs
}

fn validate_category(category: &ProductCategory) -> Result<()> {
    require_text(&category.name, "Category name")?;
    if category.parent_id.as_deref() == Some(category.id.as_str()) {
        return Err(FlatError::validation(format!(
            "Category {} cannot be its own parent",
            category.id
        )));
    }
    Ok(())
}

fn category_references(category: &ProductCategory) -> Vec<(Collection, &str)> {
    category
        .parent_id
        .as_deref()
        .map(|parent| (Collection::ProductCategories, parent))
        .into_iter()
        .collect()
}

fn validate_product(product: &Product) -> Result<()> {
    require_text(&product.name, "Product name")
}

fn product_references(product: &Product) -> Vec<(Collection, &str)> {
    vec![(Collection::ProductCategories, product.category_id.as_str())]
}

fn user_factory_references(row: &UserFactory) -> Vec<(Collection, &str)> {
    vec![
        (Collection::Users, row.user_id.as_str()),
        (Collection::Factories, row.factory_id.as_str()),
    ]
}

fn project_assignment_references(row: &ProjectAssignment) -> Vec<(Collection, &str)> {
    vec![
        (Collection::Projects, row.project_id.as_str()),
        (Collection::Users, row.user_id.as_str()),
    ]
}

fn factory_project_references(row: &FactoryProject) -> Vec<(Collection, &str)> {
    vec![
        (Collection::Factories, row.factory_id.as_str()),
        (Collection::Projects, row.project_id.as_str()),
    ]
}

fn user_customer_references(row: &UserCustomer) -> Vec<(Collection, &str)> {
    vec![
        (Collection::Users, row.user_id.as_str()),
        (Collection::Customers, row.customer_id.as_str()),
    ]
}

fn validate_definition(definition: &CustomFieldDefinition) -> Result<()> {
    require_text(&definition.name, "Custom field name")?;
    if definition.field_type.has_options() && definition.rules.options.is_empty() {
        return Err(FlatError::validation(format!(
            "Custom field {} of type {:?} needs at least one option",
            definition.name, definition.field_type
        )));
    }
    Ok(())
}

fn value_references(value: &CustomFieldValue) -> Vec<(Collection, &str)> {
    vec![
        (
            Collection::CustomFieldDefinitions,
            value.definition_id.as_str(),
        ),
        (collection_for(value.entity_kind), value.entity_id.as_str()),
    ]
}

fn group_references(group: &CustomFieldGroup) -> Vec<(Collection, &str)> {
    group
        .field_ids
        .iter()
        .map(|id| (Collection::CustomFieldDefinitions, id.as_str()))
        .collect()
}

fn template_references(template: &CustomFieldTemplate) -> Vec<(Collection, &str)> {
    template
        .field_ids
        .iter()
        .map(|id| (Collection::CustomFieldDefinitions, id.as_str()))
        .collect()
}

fn validate_ui_setting(setting: &UiSetting) -> Result<()> {
    require_text(&setting.key, "Setting key")
}

impl_entity!(User, UserPatch, Users, users, touch = updated_at, validate = validate_user);
impl_entity!(
    Customer,
    CustomerPatch,
    Customers,
    customers,
    touch = updated_at,
    validate = validate_customer
);
impl_entity!(
    Factory,
    FactoryPatch,
    Factories,
    factories,
    touch = updated_at,
    validate = validate_factory
);
impl_entity!(
    Project,
    ProjectPatch,
    Projects,
    projects,
    touch = updated_at,
    validate = validate_project,
    references = project_references
);
impl_entity!(
    Schedule,
    SchedulePatch,
    Schedules,
    schedules,
    touch = updated_at,
    references = schedule_references
);
impl_entity!(
    Task,
    TaskPatch,
    Tasks,
    tasks,
    touch = updated_at,
    validate = validate_task,
    references = task_references
);
impl_entity!(
    Comment,
    CommentPatch,
    Comments,
    comments,
    touch_some = updated_at,
    validate = validate_comment,
    references = comment_references
);
impl_entity!(
    ProductCategory,
    ProductCategoryPatch,
    ProductCategories,
    product_categories,
    touch = updated_at,
    validate = validate_category,
    references = category_references
);
impl_entity!(
    Product,
    ProductPatch,
    Products,
    products,
    touch = updated_at,
    validate = validate_product,
    references = product_references
);
impl_entity!(
    UserFactory,
    UserFactoryPatch,
    UserFactories,
    user_factories,
    references = user_factory_references
);
impl_entity!(
    ProjectAssignment,
    ProjectAssignmentPatch,
    ProjectAssignments,
    project_assignments,
    references = project_assignment_references
);
impl_entity!(
    FactoryProject,
    FactoryProjectPatch,
    FactoryProjects,
    factory_projects,
    references = factory_project_references
);
impl_entity!(
    UserCustomer,
    UserCustomerPatch,
    UserCustomers,
    user_customers,
    references = user_customer_references
);
impl_entity!(StatusMapping, StatusMappingPatch, StatusMappings, status_mappings);
impl_entity!(PriorityMapping, PriorityMappingPatch, PriorityMappings, priority_mappings);
impl_entity!(
    ServiceTypeMapping,
    ServiceTypeMappingPatch,
    ServiceTypeMappings,
    service_type_mappings
);
impl_entity!(
    ProjectTypeMapping,
    ProjectTypeMappingPatch,
    ProjectTypeMappings,
    project_type_mappings
);
impl_entity!(
    CustomFieldDefinition,
    CustomFieldDefinitionPatch,
    CustomFieldDefinitions,
    custom_field_definitions,
    touch = updated_at,
    validate = validate_definition
);
impl_entity!(
    CustomFieldValue,
    CustomFieldValuePatch,
    CustomFieldValues,
    custom_field_values,
    touch = updated_at,
    references = value_references
);
impl_entity!(
    CustomFieldGroup,
    CustomFieldGroupPatch,
    CustomFieldGroups,
    custom_field_groups,
    references = group_references
);
impl_entity!(
    CustomFieldTemplate,
    CustomFieldTemplatePatch,
    CustomFieldTemplates,
    custom_field_templates,
    references = template_references
);
impl_entity!(
    UiSetting,
    UiSettingPatch,
    UiSettings,
    ui_settings,
    touch = updated_at,
    validate = validate_ui_setting
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_requires_parent() {
        let mut sub = Project::new_sub("sub-1", "master-1", "Toner");
        assert!(sub.validate().is_ok());
        sub.parent_id = None;
        assert!(matches!(sub.validate(), Err(FlatError::Validation { .. })));
    }

    #[test]
    fn test_master_rejects_parent() {
        let mut master = Project::new_master("master-1", "Spring line");
        master.parent_id = Some("master-0".to_string());
        assert!(master.validate().is_err());
    }

    #[test]
    fn test_project_references_include_factories_and_parent() {
        let sub = Project::new_sub("sub-1", "master-1", "Serum")
            .with_customer("customer-1", "Amore")
            .with_factory(FactoryType::Manufacturing, "factory-1")
            .with_factory(FactoryType::Packaging, "factory-6");
        let refs = sub.references();
        assert!(refs.contains(&(Collection::Projects, "master-1")));
        assert!(refs.contains(&(Collection::Customers, "customer-1")));
        assert!(refs.contains(&(Collection::Factories, "factory-1")));
        assert!(refs.contains(&(Collection::Factories, "factory-6")));
    }

    #[test]
    fn test_select_definition_needs_options() {
        let definition = CustomFieldDefinition::new(
            "cf-1",
            "grade",
            CustomFieldType::Select,
            EntityKind::Product,
        );
        assert!(definition.validate().is_err());
    }

    #[test]
    fn test_comment_touch_sets_updated_at() {
        let mut comment = Comment {
            id: "comment-1".to_string(),
            project_id: "project-1".to_string(),
            user_id: "user-1".to_string(),
            author: CommentAuthor {
                name: "Kim".to_string(),
                email: None,
            },
            content: "hello".to_string(),
            parent_id: None,
            reactions: Default::default(),
            attachments: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
        };
        let now = Utc::now();
        comment.touch(now);
        assert_eq!(comment.updated_at, Some(now));
    }
}
