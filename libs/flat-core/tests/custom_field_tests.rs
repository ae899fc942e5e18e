//! Custom fields attached to stored entities

mod common;

use common::{add_schedule, scenario_a};
use flat_core::{
    CustomFieldDefinition, CustomFieldDefinitionPatch, CustomFieldGroup, CustomFieldTemplate,
    CustomFieldType, DeleteChildHandling, EntityKind, Factory, FieldValue, ValidationRules,
};

fn grade_field() -> CustomFieldDefinition {
    CustomFieldDefinition::new("cf-grade", "grade", CustomFieldType::Select, EntityKind::Project)
        .with_rules(ValidationRules {
            options: vec!["A".to_string(), "B".to_string()],
            ..ValidationRules::default()
        })
        .with_default(FieldValue::Text("B".to_string()))
}

fn batch_field() -> CustomFieldDefinition {
    CustomFieldDefinition::new("cf-batch", "batch_size", CustomFieldType::Number, EntityKind::Project)
        .with_rules(ValidationRules {
            min: Some(1.0),
            max: Some(10_000.0),
            ..ValidationRules::default()
        })
        .required()
}

#[test]
fn test_values_follow_field_rules() {
    let mut store = scenario_a();
    store
        .custom_fields(|fields| {
            fields.define_field(grade_field())?;
            fields.define_field(batch_field())
        })
        .unwrap();

    let result = store.custom_fields(|fields| {
        fields.set_value("S1", "cf-grade", FieldValue::Text("C".to_string()))
    });
    assert!(result.is_err());
    let result = store.custom_fields(|fields| fields.set_value("S1", "cf-batch", FieldValue::Number(0.0)));
    assert!(result.is_err());
    let result = store.custom_fields(|fields| {
        fields.set_value("S1", "cf-batch", FieldValue::Text("many".to_string()))
    });
    assert!(result.is_err());

    store
        .custom_fields(|fields| {
            fields.set_value("S1", "cf-batch", FieldValue::Number(500.0))?;
            fields.set_value("S1", "cf-batch", FieldValue::Number(750.0))
        })
        .unwrap();
    let values = store
        .custom_fields(|fields| Ok(fields.values_for_entity("S1")))
        .unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].value, FieldValue::Number(750.0));
}

#[test]
fn test_unknown_entity_and_duplicate_name() {
    let mut store = scenario_a();
    store.custom_fields(|fields| fields.define_field(grade_field())).unwrap();

    let result = store.custom_fields(|fields| {
        fields.set_value("nope", "cf-grade", FieldValue::Text("A".to_string()))
    });
    assert!(result.unwrap_err().is_not_found());

    let mut clash = grade_field();
    clash.id = "cf-grade-2".to_string();
    assert!(store.custom_fields(|fields| fields.define_field(clash)).is_err());

    // same name is fine on another entity kind
    let mut task_grade = grade_field();
    task_grade.id = "cf-task-grade".to_string();
    task_grade.entity_kind = EntityKind::Task;
    store.custom_fields(|fields| fields.define_field(task_grade)).unwrap();
}

#[test]
fn test_required_fields_and_templates() {
    let mut store = scenario_a();
    store
        .custom_fields(|fields| {
            fields.define_field(grade_field())?;
            fields.define_field(batch_field())?;
            fields.create_template(CustomFieldTemplate::new(
                "cft-1",
                "Launch",
                EntityKind::Project,
                vec!["cf-grade".to_string(), "cf-batch".to_string()],
            ))
        })
        .unwrap();

    let written = store
        .custom_fields(|fields| fields.apply_template("cft-1", "S2"))
        .unwrap();
    // batch_size has no default
    assert_eq!(written, 1);
    let missing = store.custom_fields(|fields| fields.validate_entity(EntityKind::Project, "S2"));
    assert!(missing.unwrap_err().to_string().contains("batch_size"));

    store
        .custom_fields(|fields| {
            fields.set_value("S2", "cf-batch", FieldValue::Number(20.0))?;
            fields.validate_entity(EntityKind::Project, "S2")
        })
        .unwrap();
}

#[test]
fn test_removing_definition_detaches_it() {
    let mut store = scenario_a();
    store
        .custom_fields(|fields| {
            fields.define_field(grade_field())?;
            fields.create_group(CustomFieldGroup::new("cfg-1", "Quality", EntityKind::Project))?;
            fields.add_field_to_group("cfg-1", "cf-grade")?;
            fields.add_field_to_group("cfg-1", "cf-grade")?;
            fields.set_value("S1", "cf-grade", FieldValue::Text("A".to_string()))?;
            fields.set_value("S2", "cf-grade", FieldValue::Text("B".to_string()))
        })
        .unwrap();
    let group: CustomFieldGroup = store.get("cfg-1").unwrap();
    assert_eq!(group.field_ids, vec!["cf-grade".to_string()]);

    let removed = store
        .custom_fields(|fields| fields.remove_definition("cf-grade"))
        .unwrap();
    assert_eq!(removed, 2);
    let group: CustomFieldGroup = store.get("cfg-1").unwrap();
    assert!(group.field_ids.is_empty());
    assert!(store.database().custom_field_values.is_empty());
}

#[test]
fn test_definition_updates_are_checked() {
    let mut store = scenario_a();
    store
        .custom_fields(|fields| {
            fields.define_field(grade_field())?;
            fields.define_field(batch_field())
        })
        .unwrap();

    let rename = CustomFieldDefinitionPatch {
        name: Some("grade".to_string()),
        ..CustomFieldDefinitionPatch::default()
    };
    assert!(store
        .custom_fields(|fields| fields.update_definition("cf-batch", rename))
        .is_err());

    let bad_default = CustomFieldDefinitionPatch {
        default_value: Some(Some(FieldValue::Text("Z".to_string()))),
        ..CustomFieldDefinitionPatch::default()
    };
    assert!(store
        .custom_fields(|fields| fields.update_definition("cf-grade", bad_default))
        .is_err());

    let relabel = CustomFieldDefinitionPatch {
        label: Some("Quality grade".to_string()),
        ..CustomFieldDefinitionPatch::default()
    };
    let updated = store
        .custom_fields(|fields| fields.update_definition("cf-grade", relabel))
        .unwrap();
    assert_eq!(updated.label, "Quality grade");
    assert_eq!(updated.name, "grade");
}

#[test]
fn test_clear_values_for_entity() {
    let mut store = scenario_a();
    let cleared = store
        .custom_fields(|fields| {
            fields.define_field(grade_field())?;
            fields.define_field(batch_field())?;
            fields.set_value("S1", "cf-grade", FieldValue::Text("A".to_string()))?;
            fields.set_value("S1", "cf-batch", FieldValue::Number(10.0))?;
            fields.set_value("S2", "cf-batch", FieldValue::Number(20.0))?;
            fields.clear_values_for_entity("S1")
        })
        .unwrap();
    assert_eq!(cleared, 2);
    assert_eq!(store.database().custom_field_values.len(), 1);
}

#[test]
fn test_project_cascade_drops_field_values() {
    let mut store = scenario_a();
    add_schedule(&mut store, "S1", 1);
    store
        .custom_fields(|fields| {
            fields.define_field(grade_field())?;
            fields.define_field(CustomFieldDefinition::new(
                "cf-lot",
                "lot",
                CustomFieldType::Text,
                EntityKind::Task,
            ))?;
            fields.set_value("S1", "cf-grade", FieldValue::Text("A".to_string()))?;
            fields.set_value("M", "cf-grade", FieldValue::Text("B".to_string()))?;
            fields.set_value("task-S1-0", "cf-lot", FieldValue::Text("L-17".to_string()))
        })
        .unwrap();

    let summary = store.delete_project("M", DeleteChildHandling::Cascade).unwrap();
    assert_eq!(summary.custom_field_values, 3);
    assert!(store.database().custom_field_values.is_empty());
    assert!(store.get::<CustomFieldDefinition>("cf-grade").is_ok());
}

#[test]
fn test_entity_with_values_needs_them_cleared_first() {
    let mut store = scenario_a();
    store
        .custom_fields(|fields| {
            fields.define_field(CustomFieldDefinition::new(
                "cf-audit",
                "audit",
                CustomFieldType::Text,
                EntityKind::Factory,
            ))?;
            fields.set_value("F3", "cf-audit", FieldValue::Text("annual".to_string()))
        })
        .unwrap();

    assert!(store.delete::<Factory>("F3").is_err());
    assert!(store.get::<Factory>("F3").is_ok());

    store
        .custom_fields(|fields| fields.clear_values_for_entity("F3"))
        .unwrap();
    store.delete::<Factory>("F3").unwrap();
}
