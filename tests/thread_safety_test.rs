//! Tests for sharing a validator and moving registries between threads.

use std::sync::Arc;
use std::thread;

use serde_json::json;
use typedobj::{
    IdReference, IdReferenceRegistry, InMemoryTypeRegistry, PassThroughHandler,
    TypedObjectValidator,
};

fn validator() -> Arc<TypedObjectValidator> {
    let types = InMemoryTypeRegistry::new();
    types
        .register(
            "Test.User-1.0".parse().unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "searchable-ws-subset": true},
                    "age": {"type": "integer"},
                    "home": {"type": "string", "id-reference": {"id-type": "ws"}}
                },
                "required": ["name"]
            })
            .to_string(),
        )
        .unwrap();
    Arc::new(TypedObjectValidator::new(Arc::new(types)))
}

#[test]
fn test_concurrent_validation() {
    let validator = validator();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let validator = Arc::clone(&validator);
            thread::spawn(move || {
                let report = validator
                    .validate_value(
                        &json!({"name": format!("User{i}"), "age": 20 + i, "home": format!("ws/{i}")}),
                        &"Test.User".parse().unwrap(),
                    )
                    .unwrap();
                assert!(report.is_valid());
                assert_eq!(report.searchable_subset(), Some(&json!({"name": format!("User{i}")})));
                report
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let report = handle.join().unwrap();
        assert_eq!(report.id_references()[0].id(), format!("ws/{i}"));
    }
    assert_eq!(validator.cached_schemas(), 1);
}

#[test]
fn test_concurrent_failures_are_independent() {
    let validator = validator();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let validator = Arc::clone(&validator);
            thread::spawn(move || {
                let doc = if i % 2 == 0 {
                    json!({"name": "ok"})
                } else {
                    json!({"age": "old"})
                };
                let report = validator
                    .validate_value(&doc, &"Test.User-1".parse().unwrap())
                    .unwrap();
                (i, report.errors().len())
            })
        })
        .collect();

    for handle in handles {
        let (i, errors) = handle.join().unwrap();
        assert_eq!(errors, if i % 2 == 0 { 0 } else { 2 });
    }
}

#[test]
fn test_registry_moves_between_threads() {
    let mut registry = IdReferenceRegistry::builder(10)
        .handler("ws", PassThroughHandler::new("ws"))
        .build();
    registry.associate(1u32);
    registry.add_id(&IdReference::new("ws", "a", vec![])).unwrap();

    let registry = thread::spawn(move || {
        let mut registry = registry;
        registry.associate(2u32);
        registry.add_id(&IdReference::new("ws", "a", vec![])).unwrap();
        registry.process_ids().unwrap();
        registry
    })
    .join()
    .unwrap();

    assert_eq!(registry.size(), 2);
    assert_eq!(registry.remapped_id(&"ws".into(), "a").unwrap(), "a");
}
