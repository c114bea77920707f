//! Integration tests for writing remapped identifiers back into documents.

use std::collections::HashMap;

use serde_json::{json, Value};
use typedobj::{
    engine, relabel, CompiledSchema, IdReferenceRegistry, JsonPath, PassThroughHandler,
    RelabelError,
};

fn schema() -> CompiledSchema {
    CompiledSchema::compile(
        "Test.Obj-1.0".parse().unwrap(),
        &json!({
            "type": "object",
            "properties": {
                "primary": {"type": "string", "id-reference": {"id-type": "ws"}},
                "links": {
                    "type": "object",
                    "additionalProperties": {"type": "string", "id-reference": {"id-type": "ws"}}
                },
                "rows": {
                    "type": "array",
                    "items": {
                        "type": "array",
                        "items": [{"type": "string", "id-reference": {"id-type": "ws"}}, {"type": "integer"}]
                    }
                },
                "label": {"type": "string"}
            }
        })
        .to_string(),
    )
    .unwrap()
}

fn document() -> Value {
    json!({
        "primary": "a/1",
        "links": {"left": "a/2", "right": "a/1"},
        "rows": [["a/3", 1], ["a/2", 2]],
        "label": "a/1"
    })
}

fn table() -> HashMap<String, String> {
    HashMap::from([
        ("a/1".to_string(), "9/1/1".to_string()),
        ("a/2".to_string(), "9/2/4".to_string()),
        ("a/3".to_string(), "9/3/2".to_string()),
    ])
}

#[test]
fn test_every_position_is_rewritten() {
    let mut doc = document();
    let report = engine::validate(&doc, &schema(), 10).unwrap();
    assert!(report.is_valid());
    assert_eq!(report.id_references().len(), 5);

    assert_eq!(relabel(&mut doc, &report, &table()).unwrap(), 5);
    assert_eq!(
        doc,
        json!({
            "primary": "9/1/1",
            "links": {"left": "9/2/4", "right": "9/1/1"},
            "rows": [["9/3/2", 1], ["9/2/4", 2]],
            "label": "a/1"
        })
    );
}

#[test]
fn test_relabel_is_idempotent() {
    let mut doc = document();
    let report = engine::validate(&doc, &schema(), 10).unwrap();

    relabel(&mut doc, &report, &table()).unwrap();
    let once = doc.clone();
    assert_eq!(relabel(&mut doc, &report, &table()).unwrap(), 0);
    assert_eq!(doc, once);
}

#[test]
fn test_incomplete_table_leaves_document_untouched() {
    let mut doc = document();
    let report = engine::validate(&doc, &schema(), 10).unwrap();

    let mut partial = table();
    partial.remove("a/3");

    let err = relabel(&mut doc, &report, &partial).unwrap_err();
    assert_eq!(
        err,
        RelabelError::UnresolvedId {
            id: "a/3".to_string(),
            path: JsonPath::root().push_field("rows").push_index(0).push_index(0),
        }
    );
    assert_eq!(doc, document());
}

#[test]
fn test_relabel_through_registry() {
    let schema = schema();
    let mut docs = vec![document(), json!({"primary": "b/1"})];
    let mut reports: Vec<_> = docs
        .iter()
        .map(|doc| engine::validate(doc, &schema, 10).unwrap())
        .collect();

    let mut registry = IdReferenceRegistry::builder(100)
        .handler("ws", PassThroughHandler::new("ws"))
        .build();
    for (i, report) in reports.iter().enumerate() {
        registry.add_report(i, report).unwrap();
    }
    registry.process_ids().unwrap();

    for (doc, report) in docs.iter_mut().zip(reports.iter_mut()) {
        let remapped = registry.remap_report(report).unwrap();
        report.set_absolute_id_references(remapped);
        assert_eq!(report.relabel(doc).unwrap(), 0);
    }
    assert_eq!(docs[1], json!({"primary": "b/1"}));
    assert!(reports[0].absolute_id_references().is_some());
}
