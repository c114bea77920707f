//! Integration tests for SchemaError and SchemaErrors.

use serde_json::json;
use stillwater::prelude::*;
use typedobj::{CompiledSchema, JsonPath, SchemaError, SchemaErrors};

fn compile_errors(doc: serde_json::Value) -> SchemaErrors {
    CompiledSchema::compile("Test.Obj-1.0".parse().unwrap(), &doc.to_string()).unwrap_err()
}

#[test]
fn test_schema_error_full_context() {
    let error = SchemaError::new(JsonPath::root().push_field("size"), "expected integer")
        .with_code("invalid_type")
        .with_got("string")
        .with_expected("integer");

    assert_eq!(error.path.to_string(), "size");
    assert_eq!(error.message, "expected integer");
    assert_eq!(error.code, "invalid_type");
    assert_eq!(error.got, Some("string".to_string()));
    assert_eq!(error.expected, Some("integer".to_string()));
    assert_eq!(
        error.to_string(),
        "size: expected integer (expected: integer) (got: string)"
    );
}

#[test]
fn test_errors_combine_via_semigroup() {
    let e1 = SchemaErrors::single(SchemaError::new(JsonPath::root().push_field("a"), "one"));
    let e2 = SchemaErrors::single(SchemaError::new(JsonPath::root().push_field("b"), "two"));
    let e3 = SchemaErrors::single(SchemaError::new(JsonPath::root().push_index(0), "three"));

    let combined = e1.combine(e2).combine(e3);
    assert_eq!(combined.len(), 3);
    assert_eq!(combined.first().message, "one");

    let messages: Vec<String> = combined.into_iter().map(|e| e.message).collect();
    assert_eq!(messages, ["one", "two", "three"]);
}

#[test]
fn test_try_from_vec() {
    assert!(SchemaErrors::try_from_vec(Vec::new()).is_none());
    let errors = SchemaErrors::try_from_vec(vec![SchemaError::new(JsonPath::root(), "x")]).unwrap();
    assert!(!errors.is_empty());
}

#[test]
fn test_schema_compilation_reports_every_problem() {
    let errors = compile_errors(json!({
        "type": "object",
        "properties": {
            "count": {"type": "integer", "id-reference": {"id-type": "ws"}},
            "list": {"type": "array", "items": {"type": "string", "searchable-ws-subset": true}},
            "bad": {"type": "decimal"}
        },
        "required": ["missing"]
    }));

    assert!(errors.len() >= 4, "{}", errors);
    assert_eq!(errors.with_code("misplaced_id_reference").len(), 1);
    assert_eq!(errors.with_code("misplaced_searchable").len(), 1);
    assert_eq!(errors.with_code("undeclared_required").len(), 1);
    assert!(!errors.with_code("invalid_schema_node").is_empty());
    assert_eq!(
        errors
            .at_path(&JsonPath::root().push_field("properties").push_field("count").push_field("id-reference"))
            .len(),
        1
    );
}

#[test]
fn test_malformed_schema_document() {
    let errors =
        CompiledSchema::compile("Test.Obj-1.0".parse().unwrap(), "{\"type\": ").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.first().code, "malformed_schema");
}

#[test]
fn test_display_lists_every_error() {
    let errors = SchemaErrors::single(SchemaError::new(JsonPath::root(), "first"))
        .combine(SchemaErrors::single(SchemaError::new(JsonPath::root().push_field("x"), "second")));
    let text = errors.to_string();
    assert!(text.starts_with("2 error(s):"));
    assert!(text.contains("1. (root): first"));
    assert!(text.contains("2. x: second"));
}
