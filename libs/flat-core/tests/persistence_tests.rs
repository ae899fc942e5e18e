//! Export/import, storage backends, migrations and reseeding

mod common;

use flat_core::{
    seed, Collection, Factory, FactoryPatch, FactoryType, FlatConfig, FlatError, FlatStore,
    KeyValueStorage, MemoryStorage, SqliteStorage, StorageBackend,
};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_export_import_reproduces_every_collection() {
    let mut source = FlatStore::in_memory();
    source
        .create(Factory::new("factory-extra", "Extra Plant", FactoryType::Container))
        .unwrap();
    let blob = source.export().unwrap();

    let mut target = common::store();
    target.import(&blob).unwrap();
    assert_eq!(target.database(), source.database());
    for collection in Collection::ALL {
        assert_eq!(
            target.database().len_of(collection),
            source.database().len_of(collection),
            "{collection} differs"
        );
    }
}

#[test]
fn test_export_uses_versioned_pair_layout() {
    let store = FlatStore::in_memory();
    let blob: serde_json::Value = serde_json::from_str(&store.export().unwrap()).unwrap();
    assert_eq!(blob["version"], "3");
    let factories = blob["data"]["factories"].as_array().unwrap();
    assert_eq!(factories.len(), 7);
    let first = factories[0].as_array().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0], first[1]["id"]);
    assert!(blob["data"]["productCategories"].is_array());
    assert!(blob["data"]["uiSettings"].is_array());
}

#[test]
fn test_sqlite_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("flat.db");

    {
        let mut store = FlatStore::builder()
            .storage(SqliteStorage::open(&path).unwrap())
            .build();
        let patch = FactoryPatch {
            name: Some("Renamed Lab".to_string()),
            ..FactoryPatch::default()
        };
        store
            .update::<Factory>(seed::ids::MFG_1, patch)
            .unwrap();
    }

    let reopened = FlatStore::from_config(&FlatConfig::sqlite(&path)).unwrap();
    assert_eq!(
        reopened.database().factories[seed::ids::MFG_1].name,
        "Renamed Lab"
    );
    assert!(reopened.stats().storage.contains("sqlite"));
}

#[test]
fn test_unsupported_version_reseeds() {
    let mut backend = MemoryStorage::new();
    backend
        .set_item("mockDb", r#"{"version": "42", "data": {}}"#)
        .unwrap();
    let store = FlatStore::builder().storage(backend).build();
    assert_eq!(store.database(), &seed::seed_database());
}

#[test]
fn test_corrupt_blob_reseeds() {
    let mut backend = MemoryStorage::new();
    backend.set_item("mockDb", "{{{not json").unwrap();
    let store = FlatStore::builder().storage(backend).build();
    assert_eq!(store.database().factories.len(), 7);
}

#[test]
fn test_current_version_blob_with_legacy_labels_reseeds() {
    let stale = json!({
        "version": "3",
        "data": {
            "factories": [
                ["factory-a", {
                    "id": "factory-a", "name": "Legacy Plant", "type": "제조",
                    "address": null, "phone": null, "manager": null, "managerEmail": null,
                    "capacity": null, "isActive": true,
                    "createdAt": "2024-05-01T00:00:00Z", "updatedAt": "2024-05-01T00:00:00Z"
                }]
            ]
        }
    });
    let mut backend = MemoryStorage::new();
    backend.set_item("mockDb", &stale.to_string()).unwrap();

    let store = FlatStore::builder().storage(backend).build();
    assert_eq!(store.database(), &seed::seed_database());
    assert!(!store.database().factories.contains_key("factory-a"));
    assert!(!store.export().unwrap().contains("제조"));
}

#[test]
fn test_version_one_blob_is_migrated_on_load() {
    let legacy = json!({
        "version": "1",
        "data": {
            "factories": [
                ["factory-a", {
                    "id": "factory-a", "name": "Legacy Plant", "type": "제조",
                    "address": null, "phone": null, "manager": null, "managerEmail": null,
                    "capacity": null, "isActive": true,
                    "createdAt": "2024-05-01T00:00:00Z", "updatedAt": "2024-05-01T00:00:00Z"
                }]
            ],
            "projects": [
                ["project-a", {
                    "id": "project-a", "type": "MASTER", "parentId": null, "name": "Old line",
                    "customerId": null, "customer": null, "factoryId": "factory-a",
                    "containerId": null, "packagingId": null,
                    "serviceType": "OEM", "priority": "MEDIUM", "status": "PLANNING",
                    "startDate": null, "endDate": null, "productType": null, "product": null,
                    "createdAt": "2024-05-01T00:00:00Z", "updatedAt": "2024-05-01T00:00:00Z"
                }]
            ]
        }
    });
    let mut store = common::store();
    store.import(&legacy.to_string()).unwrap();

    let db = store.database();
    assert_eq!(db.factories["factory-a"].factory_type, FactoryType::Manufacturing);
    let project = &db.projects["project-a"];
    assert!(project
        .factory_ids(FactoryType::Manufacturing)
        .is_some_and(|ids| ids.contains("factory-a")));
}

#[test]
fn test_import_of_future_version_fails_cleanly() {
    let mut store = FlatStore::in_memory();
    let error = store
        .import(r#"{"version": "9", "data": {}}"#)
        .unwrap_err();
    assert!(matches!(error, FlatError::SchemaVersion { .. }));
    assert_eq!(store.database().factories.len(), 7);
}

#[test]
fn test_full_storage_degrades_to_memory_only() {
    let mut store = FlatStore::builder()
        .storage(MemoryStorage::with_quota(256))
        .seed_when_empty(false)
        .build();
    store
        .create(Factory::new("factory-1", "Plant", FactoryType::Packaging))
        .unwrap();

    assert!(store.persistence_warning().is_some());
    assert!(store.stats().persistence_warning.is_some());
    assert!(store.get::<Factory>("factory-1").is_ok());
}

#[test]
fn test_custom_key_isolates_stores() {
    let config = FlatConfig {
        backend: StorageBackend::Memory,
        storage_key: "otherDb".to_string(),
        seed_when_empty: false,
        ..FlatConfig::default()
    };
    let store = FlatStore::from_config(&config).unwrap();
    assert_eq!(store.stats().storage_key, "otherDb");
    assert!(store.database().is_empty());
}

#[test]
fn test_sqlite_config_without_path_is_rejected() {
    let config = FlatConfig {
        backend: StorageBackend::Sqlite,
        ..FlatConfig::default()
    };
    assert!(matches!(
        FlatStore::from_config(&config),
        Err(FlatError::Configuration { .. })
    ));
}
