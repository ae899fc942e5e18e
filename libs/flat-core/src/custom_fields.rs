//! Custom fields: typed values attached to any entity
//!
//! Definitions describe a field for one [`EntityKind`]; values are keyed by
//! `(entity_id, definition_id)`. Groups order definitions for display and
//! templates bundle them for reuse.

use crate::database::{crud, Collection, Database, Entity};
use crate::error::{FlatError, Result};
use crate::events::EventSink;
use crate::models::{
    CustomFieldDefinition, CustomFieldDefinitionPatch, CustomFieldGroup, CustomFieldGroupPatch,
    CustomFieldTemplate, CustomFieldTemplatePatch, CustomFieldType, CustomFieldValue,
    CustomFieldValuePatch, EntityKind, FieldValue, Patch,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info};

static PATTERNS: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn pattern_matches(pattern: &str, text: &str) -> Result<bool> {
    let mut patterns = PATTERNS.lock();
    if let Some(regex) = patterns.get(pattern) {
        return Ok(regex.is_match(text));
    }
    let regex = Regex::new(pattern)
        .map_err(|e| FlatError::validation(format!("Invalid pattern {pattern:?}: {e}")))?;
    let matched = regex.is_match(text);
    patterns.insert(pattern.to_string(), regex);
    Ok(matched)
}

/// Collection holding entities of `kind`
#[must_use]
pub const fn collection_for(kind: EntityKind) -> Collection {
    match kind {
        EntityKind::Project => Collection::Projects,
        EntityKind::Task => Collection::Tasks,
        EntityKind::Factory => Collection::Factories,
        EntityKind::User => Collection::Users,
        EntityKind::Customer => Collection::Customers,
        EntityKind::Product => Collection::Products,
    }
}

/// Check `value` against the type and rules of `definition`
///
/// # Errors
///
/// Returns a validation error describing the first rule the value breaks
pub fn validate_value(definition: &CustomFieldDefinition, value: &FieldValue) -> Result<()> {
    let name = &definition.name;
    if !value.fits(definition.field_type) {
        return Err(FlatError::validation(format!(
            "Field {name} expects {:?}, got a {} value",
            definition.field_type,
            value.kind_name()
        )));
    }
    let rules = &definition.rules;
    match value {
        FieldValue::Number(number) => {
            if !number.is_finite() {
                return Err(FlatError::validation(format!("Field {name} must be a finite number")));
            }
            if let Some(min) = rules.min.filter(|min| number < min) {
                return Err(FlatError::validation(format!("Field {name} must be at least {min}")));
            }
            if let Some(max) = rules.max.filter(|max| number > max) {
                return Err(FlatError::validation(format!("Field {name} must be at most {max}")));
            }
        }
        FieldValue::Text(text) => {
            if let Some(max_length) = rules.max_length {
                if text.chars().count() > max_length {
                    return Err(FlatError::validation(format!(
                        "Field {name} is limited to {max_length} characters"
                    )));
                }
            }
            if let Some(pattern) = &rules.pattern {
                if !pattern_matches(pattern, text)? {
                    return Err(FlatError::validation(format!(
                        "Field {name} does not match {pattern}"
                    )));
                }
            }
            if definition.field_type == CustomFieldType::Select && !rules.options.contains(text) {
                return Err(FlatError::validation(format!(
                    "{text:?} is not an option of field {name}"
                )));
            }
        }
        FieldValue::List(items) => {
            if let Some(item) = items.iter().find(|item| !rules.options.contains(item)) {
                return Err(FlatError::validation(format!(
                    "{item:?} is not an option of field {name}"
                )));
            }
        }
        FieldValue::Boolean(_) | FieldValue::Date(_) => {}
    }
    Ok(())
}

/// Custom field operations over a borrowed database
pub struct CustomFieldManager<'a> {
    db: &'a mut Database,
    sink: &'a dyn EventSink,
}

impl<'a> CustomFieldManager<'a> {
    pub fn new(db: &'a mut Database, sink: &'a dyn EventSink) -> Self {
        Self { db, sink }
    }

    fn definition(&self, field_id: &str) -> Result<&CustomFieldDefinition> {
        self.db
            .custom_field_definitions
            .get(field_id)
            .ok_or_else(|| FlatError::not_found(Collection::CustomFieldDefinitions, field_id))
    }

    fn name_taken(&self, kind: EntityKind, name: &str, except: Option<&str>) -> bool {
        self.db.custom_field_definitions.values().any(|existing| {
            existing.entity_kind == kind
                && existing.name == name
                && Some(existing.id.as_str()) != except
        })
    }

    /// Add a field definition
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is already used for the same
    /// entity kind, a select type has no options, or the default value
    /// breaks the field's rules
    pub fn define_field(&mut self, definition: CustomFieldDefinition) -> Result<CustomFieldDefinition> {
        if self.name_taken(definition.entity_kind, &definition.name, None) {
            return Err(FlatError::validation(format!(
                "Custom field {} already exists for {:?}",
                definition.name, definition.entity_kind
            )));
        }
        definition.validate()?;
        if let Some(default) = &definition.default_value {
            validate_value(&definition, default)?;
        }
        let created = crud::create(self.db, definition, self.sink)?;
        info!(field = %created.id, name = %created.name, "Custom field defined");
        Ok(created)
    }

    /// Change a definition
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown id or a validation
    /// error when the new name collides or the default breaks the rules
    pub fn update_definition(
        &mut self,
        field_id: &str,
        patch: CustomFieldDefinitionPatch,
    ) -> Result<CustomFieldDefinition> {
        let current = self.definition(field_id)?;
        if let Some(name) = &patch.name {
            if self.name_taken(current.entity_kind, name, Some(field_id)) {
                return Err(FlatError::validation(format!(
                    "Custom field {name} already exists for {:?}",
                    current.entity_kind
                )));
            }
        }
        let mut preview = current.clone();
        patch.clone().apply(&mut preview);
        if let Some(default) = &preview.default_value {
            validate_value(&preview, default)?;
        }
        crud::update::<CustomFieldDefinition>(self.db, field_id, patch, self.sink)
    }

    /// Delete a definition with its values, detaching it from groups and
    /// templates; returns how many values were removed
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown id
    pub fn remove_definition(&mut self, field_id: &str) -> Result<usize> {
        self.definition(field_id)?;

        let value_ids: Vec<String> = self
            .db
            .custom_field_values
            .values()
            .filter(|value| value.definition_id == field_id)
            .map(|value| value.id.clone())
            .collect();
        for value_id in &value_ids {
            crud::delete::<CustomFieldValue>(self.db, value_id, self.sink)?;
        }

        let groups: Vec<(String, Vec<String>)> = self
            .db
            .custom_field_groups
            .values()
            .filter(|group| group.field_ids.iter().any(|id| id == field_id))
            .map(|group| (group.id.clone(), without(&group.field_ids, field_id)))
            .collect();
        for (group_id, field_ids) in groups {
            let patch = CustomFieldGroupPatch {
                field_ids: Some(field_ids),
                ..CustomFieldGroupPatch::default()
            };
            crud::update::<CustomFieldGroup>(self.db, &group_id, patch, self.sink)?;
        }

        let templates: Vec<(String, Vec<String>)> = self
            .db
            .custom_field_templates
            .values()
            .filter(|template| template.field_ids.iter().any(|id| id == field_id))
            .map(|template| (template.id.clone(), without(&template.field_ids, field_id)))
            .collect();
        for (template_id, field_ids) in templates {
            let patch = CustomFieldTemplatePatch {
                field_ids: Some(field_ids),
                ..CustomFieldTemplatePatch::default()
            };
            crud::update::<CustomFieldTemplate>(self.db, &template_id, patch, self.sink)?;
        }

        crud::delete::<CustomFieldDefinition>(self.db, field_id, self.sink)?;
        info!(field = field_id, values = value_ids.len(), "Custom field removed");
        Ok(value_ids.len())
    }

    /// Definitions for an entity kind, by display order
    #[must_use]
    pub fn definitions_for(&self, kind: EntityKind) -> Vec<CustomFieldDefinition> {
        let mut definitions: Vec<CustomFieldDefinition> = self
            .db
            .custom_field_definitions
            .values()
            .filter(|definition| definition.entity_kind == kind)
            .cloned()
            .collect();
        definitions.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        definitions
    }

    /// Store a value, replacing any previous value of the same field
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown field or entity, or a
    /// validation error if the value breaks the field's rules
    pub fn set_value(
        &mut self,
        entity_id: &str,
        field_id: &str,
        value: FieldValue,
    ) -> Result<CustomFieldValue> {
        let definition = self.definition(field_id)?;
        let collection = collection_for(definition.entity_kind);
        if !self.db.contains(collection, entity_id) {
            return Err(FlatError::not_found(collection, entity_id));
        }
        validate_value(definition, &value)?;
        let entity_kind = definition.entity_kind;

        let existing = self
            .db
            .custom_field_values
            .values()
            .find(|stored| stored.entity_id == entity_id && stored.definition_id == field_id)
            .map(|stored| stored.id.clone());
        match existing {
            Some(value_id) => {
                let patch = CustomFieldValuePatch { value: Some(value) };
                crud::update::<CustomFieldValue>(self.db, &value_id, patch, self.sink)
            }
            None => {
                let record = CustomFieldValue {
                    id: String::new(),
                    definition_id: field_id.to_string(),
                    entity_kind,
                    entity_id: entity_id.to_string(),
                    value,
                    updated_at: Utc::now(),
                };
                crud::create(self.db, record, self.sink)
            }
        }
    }

    /// Stored value of one field on one entity
    #[must_use]
    pub fn value(&self, entity_id: &str, field_id: &str) -> Option<CustomFieldValue> {
        self.db
            .custom_field_values
            .values()
            .find(|value| value.entity_id == entity_id && value.definition_id == field_id)
            .cloned()
    }

    /// Every value stored for an entity
    #[must_use]
    pub fn values_for_entity(&self, entity_id: &str) -> Vec<CustomFieldValue> {
        values_for_entity(self.db, entity_id)
    }

    /// Remove every value of an entity; returns how many were removed
    ///
    /// # Errors
    ///
    /// Returns the first error raised while deleting a value
    pub fn clear_values_for_entity(&mut self, entity_id: &str) -> Result<usize> {
        let ids: Vec<String> = values_for_entity(self.db, entity_id)
            .into_iter()
            .map(|value| value.id)
            .collect();
        for id in &ids {
            crud::delete::<CustomFieldValue>(self.db, id, self.sink)?;
        }
        debug!(entity = entity_id, removed = ids.len(), "Cleared custom field values");
        Ok(ids.len())
    }

    /// Check that every required active field of `kind` has a value
    ///
    /// # Errors
    ///
    /// Returns a validation error listing the missing fields
    pub fn validate_entity(&self, kind: EntityKind, entity_id: &str) -> Result<()> {
        let missing: Vec<String> = self
            .definitions_for(kind)
            .into_iter()
            .filter(|definition| definition.required && definition.is_active)
            .filter(|definition| self.value(entity_id, &definition.id).is_none())
            .map(|definition| definition.name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FlatError::validation(format!(
                "{entity_id} is missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    fn check_fields_of_kind(&self, kind: EntityKind, field_ids: &[String]) -> Result<()> {
        for field_id in field_ids {
            let definition = self.definition(field_id)?;
            if definition.entity_kind != kind {
                return Err(FlatError::validation(format!(
                    "Field {} belongs to {:?}, not {kind:?}",
                    definition.name, definition.entity_kind
                )));
            }
        }
        Ok(())
    }

    /// Add a group
    ///
    /// # Errors
    ///
    /// Returns an error if a listed field is unknown or of another kind
    pub fn create_group(&mut self, group: CustomFieldGroup) -> Result<CustomFieldGroup> {
        self.check_fields_of_kind(group.entity_kind, &group.field_ids)?;
        crud::create(self.db, group, self.sink)
    }

    /// Append a field to a group; adding a member again is a no-op
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown group or field, or a
    /// validation error if the field is of another kind
    pub fn add_field_to_group(&mut self, group_id: &str, field_id: &str) -> Result<CustomFieldGroup> {
        let group: CustomFieldGroup = crud::get(self.db, group_id)?;
        self.check_fields_of_kind(group.entity_kind, &[field_id.to_string()])?;
        if group.field_ids.iter().any(|id| id == field_id) {
            return Ok(group);
        }
        let mut field_ids = group.field_ids;
        field_ids.push(field_id.to_string());
        let patch = CustomFieldGroupPatch {
            field_ids: Some(field_ids),
            ..CustomFieldGroupPatch::default()
        };
        crud::update::<CustomFieldGroup>(self.db, group_id, patch, self.sink)
    }

    /// Remove a field from a group
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown group
    pub fn remove_field_from_group(
        &mut self,
        group_id: &str,
        field_id: &str,
    ) -> Result<CustomFieldGroup> {
        let group: CustomFieldGroup = crud::get(self.db, group_id)?;
        let patch = CustomFieldGroupPatch {
            field_ids: Some(without(&group.field_ids, field_id)),
            ..CustomFieldGroupPatch::default()
        };
        crud::update::<CustomFieldGroup>(self.db, group_id, patch, self.sink)
    }

    /// Add a template
    ///
    /// # Errors
    ///
    /// Returns an error if a listed field is unknown or of another kind
    pub fn create_template(&mut self, template: CustomFieldTemplate) -> Result<CustomFieldTemplate> {
        self.check_fields_of_kind(template.entity_kind, &template.field_ids)?;
        crud::create(self.db, template, self.sink)
    }

    /// Write the default of every template field the entity has no value
    /// for; returns how many values were written
    ///
    /// # Errors
    ///
    /// Returns [`FlatError::NotFound`] for an unknown template or entity
    pub fn apply_template(&mut self, template_id: &str, entity_id: &str) -> Result<usize> {
        let template: CustomFieldTemplate = crud::get(self.db, template_id)?;
        let collection = collection_for(template.entity_kind);
        if !self.db.contains(collection, entity_id) {
            return Err(FlatError::not_found(collection, entity_id));
        }

        let mut written = 0;
        for field_id in &template.field_ids {
            if self.value(entity_id, field_id).is_some() {
                continue;
            }
            let Some(default) = self.definition(field_id)?.default_value.clone() else {
                continue;
            };
            self.set_value(entity_id, field_id, default)?;
            written += 1;
        }
        info!(template = template_id, entity = entity_id, written, "Template applied");
        Ok(written)
    }
}

fn without(ids: &[String], removed: &str) -> Vec<String> {
    ids.iter().filter(|id| *id != removed).cloned().collect()
}

/// Every value stored for an entity
#[must_use]
pub fn values_for_entity(db: &Database, entity_id: &str) -> Vec<CustomFieldValue> {
    db.custom_field_values
        .values()
        .filter(|value| value.entity_id == entity_id)
        .cloned()
        .collect()
}
