//! Transactions through the store

mod common;

use common::store_with_factories;
use flat_core::{
    Collection, Factory, FactoryPatch, FactoryType, FlatError, TxOperation, User,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn record_events(store: &flat_core::FlatStore) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = store.subscribe(flat_core::Topic::All, move |event| {
        sink.lock()
            .push(format!("{} {}/{}", event.kind, event.collection, event.entity_id));
    });
    seen
}

#[test]
fn test_commit_applies_staged_writes_in_order() {
    let mut store = store_with_factories();
    let seen = record_events(&store);

    let tx = store.begin_transaction();
    store
        .stage_create(&tx, &Factory::new("F9", "New plant", FactoryType::Container))
        .unwrap();
    let patch = FactoryPatch {
        name: Some("Renamed plant".to_string()),
        ..FactoryPatch::default()
    };
    store.stage_update::<Factory>(&tx, "F9", &patch).unwrap();
    store.stage_delete::<Factory>(&tx, "P1").unwrap();

    // nothing happens until commit
    assert!(store.get::<Factory>("F9").is_err());
    assert!(seen.lock().is_empty());

    assert_eq!(store.commit_transaction(&tx).unwrap(), 3);
    assert_eq!(store.get::<Factory>("F9").unwrap().name, "Renamed plant");
    assert!(store.get::<Factory>("P1").is_err());
    assert_eq!(
        *seen.lock(),
        vec![
            "CREATED factories/F9",
            "UPDATED factories/F9",
            "DELETED factories/P1"
        ]
    );
    assert_eq!(store.open_transactions(), 0);
}

#[test]
fn test_failed_commit_restores_and_stays_silent() {
    let mut store = store_with_factories();
    let before = store.database().clone();
    let seen = record_events(&store);

    let tx = store.begin_transaction();
    store
        .stage_create(&tx, &Factory::new("F9", "New plant", FactoryType::Container))
        .unwrap();
    store
        .stage(
            &tx,
            TxOperation::Delete {
                collection: Collection::Users,
                id: "user-404".to_string(),
            },
        )
        .unwrap();

    match store.commit_transaction(&tx) {
        Err(FlatError::Transaction { index, .. }) => assert_eq!(index, 1),
        other => panic!("expected a failed commit, got {other:?}"),
    }
    assert_eq!(store.database(), &before);
    assert!(seen.lock().is_empty());
    assert_eq!(store.open_transactions(), 0);
}

#[test]
fn test_rollback_restores_direct_writes() {
    let mut store = store_with_factories();
    let tx = store.begin_transaction();
    store
        .create(User::new("user-2", "Lee", "lee@flat.dev", flat_core::UserRole::Customer))
        .unwrap();
    assert!(store.get::<User>("user-2").is_ok());

    store.rollback_transaction(&tx).unwrap();
    assert!(store.get::<User>("user-2").is_err());
    assert!(matches!(
        store.rollback_transaction(&tx),
        Err(FlatError::TransactionNotFound { .. })
    ));
}

#[test]
fn test_transactions_are_independent() {
    let mut store = store_with_factories();
    let first = store.begin_transaction();
    let second = store.begin_transaction();
    assert_ne!(first, second);
    assert_eq!(store.open_transactions(), 2);

    store
        .stage_create(&first, &Factory::new("F8", "Eight", FactoryType::Packaging))
        .unwrap();
    store.commit_transaction(&first).unwrap();
    store.rollback_transaction(&second).unwrap();

    // the second snapshot predates the first commit
    assert!(store.get::<Factory>("F8").is_err());
    assert!(store.commit_transaction(&first).is_err());
}
