//! Custom field definitions, values, groups and templates

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of entity a custom field attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Project,
    Task,
    Factory,
    User,
    Customer,
    Product,
}

/// Data type of a custom field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomFieldType {
    Text,
    Number,
    Boolean,
    Date,
    Select,
    MultiSelect,
}

impl CustomFieldType {
    /// Whether the type restricts values to a list of options
    #[must_use]
    pub const fn has_options(self) -> bool {
        matches!(self, Self::Select | Self::MultiSelect)
    }
}

/// Stored value of a custom field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    List(Vec<String>),
}

impl FieldValue {
    /// Whether this value can be stored in a field of `field_type`
    ///
    /// A single select holds its option as text; a multi select holds a list.
    #[must_use]
    pub const fn fits(&self, field_type: CustomFieldType) -> bool {
        matches!(
            (self, field_type),
            (Self::Text(_), CustomFieldType::Text | CustomFieldType::Select)
                | (Self::Number(_), CustomFieldType::Number)
                | (Self::Boolean(_), CustomFieldType::Boolean)
                | (Self::Date(_), CustomFieldType::Date)
                | (Self::List(_), CustomFieldType::MultiSelect)
        )
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::List(_) => "list",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
            Self::Boolean(flag) => write!(f, "{flag}"),
            Self::Date(date) => write!(f, "{date}"),
            Self::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// Optional constraints checked when a value is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationRules {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub max_length: Option<usize>,
    /// Regular expression text values must match
    pub pattern: Option<String>,
    /// Allowed options for select types
    pub options: Vec<String>,
}

/// Schema of a custom field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldDefinition {
    pub id: String,
    /// Machine name, unique per entity kind
    pub name: String,
    pub label: String,
    pub field_type: CustomFieldType,
    pub entity_kind: EntityKind,
    pub required: bool,
    #[serde(default)]
    pub rules: ValidationRules,
    pub default_value: Option<FieldValue>,
    pub order: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomFieldDefinition {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        field_type: CustomFieldType,
        entity_kind: EntityKind,
    ) -> Self {
        let now = Utc::now();
        let name = name.into();
        Self {
            id: id.into(),
            label: name.clone(),
            name,
            field_type,
            entity_kind,
            required: false,
            rules: ValidationRules::default(),
            default_value: None,
            order: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default_value = Some(value);
        self
    }
}

define_patch! {
    /// Partial update for [`CustomFieldDefinition`]
    pub struct CustomFieldDefinitionPatch for CustomFieldDefinition {
        name: String,
        label: String,
        required: bool,
        rules: ValidationRules,
        default_value: Option<FieldValue>,
        order: u32,
        is_active: bool,
    }
}

/// Value of one custom field on one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldValue {
    pub id: String,
    pub definition_id: String,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub value: FieldValue,
    pub updated_at: DateTime<Utc>,
}

define_patch! {
    /// Partial update for [`CustomFieldValue`]
    pub struct CustomFieldValuePatch for CustomFieldValue {
        value: FieldValue,
    }
}

/// Ordered group of definitions shown together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldGroup {
    pub id: String,
    pub name: String,
    pub entity_kind: EntityKind,
    #[serde(default)]
    pub field_ids: Vec<String>,
    pub order: u32,
}

impl CustomFieldGroup {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, entity_kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_kind,
            field_ids: Vec::new(),
            order: 0,
        }
    }
}

define_patch! {
    /// Partial update for [`CustomFieldGroup`]
    pub struct CustomFieldGroupPatch for CustomFieldGroup {
        name: String,
        field_ids: Vec<String>,
        order: u32,
    }
}

/// Reusable named set of definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldTemplate {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub entity_kind: EntityKind,
    #[serde(default)]
    pub field_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl CustomFieldTemplate {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        entity_kind: EntityKind,
        field_ids: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            entity_kind,
            field_ids,
            created_at: Utc::now(),
        }
    }
}

define_patch! {
    /// Partial update for [`CustomFieldTemplate`]
    pub struct CustomFieldTemplatePatch for CustomFieldTemplate {
        name: String,
        description: Option<String>,
        field_ids: Vec<String>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_tagged_json() {
        let value = FieldValue::Number(12.5);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json, serde_json::json!({"type": "NUMBER", "value": 12.5}));

        let date: FieldValue =
            serde_json::from_value(serde_json::json!({"type": "DATE", "value": "2025-02-01"}))
                .unwrap();
        assert_eq!(date, FieldValue::Date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
    }

    #[test]
    fn test_field_value_fits() {
        assert!(FieldValue::Text("a".into()).fits(CustomFieldType::Select));
        assert!(FieldValue::List(vec![]).fits(CustomFieldType::MultiSelect));
        assert!(!FieldValue::Boolean(true).fits(CustomFieldType::Text));
        assert!(!FieldValue::Number(1.0).fits(CustomFieldType::Date));
    }

    #[test]
    fn test_rules_default_when_missing() {
        let json = serde_json::json!({
            "id": "cf-1",
            "name": "spf",
            "label": "SPF",
            "fieldType": "NUMBER",
            "entityKind": "PROJECT",
            "required": false,
            "defaultValue": null,
            "order": 0,
            "isActive": true,
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        });
        let definition: CustomFieldDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(definition.rules, ValidationRules::default());
    }
}
