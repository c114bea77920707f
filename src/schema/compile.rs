//! Schema document compilation.
//!
//! Every node is checked independently and problems are accumulated with
//! stillwater's `Validation`, so a broken document reports all of its
//! defects in one pass.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use stillwater::Validation;

use crate::error::{SchemaError, SchemaErrors};
use crate::idref::IdReferenceType;
use crate::path::JsonPath;

use super::{FieldDef, IdReferenceSpec, SchemaKind, SchemaNode, Searchable, StructureSchema};

/// Where a node sits relative to the root, for searchable-subset rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Root,
    /// A structure property reached from the root through structure properties only.
    Field,
    /// Anywhere beneath a mapping, list or tuple.
    Detached,
}

impl Position {
    fn for_properties(self) -> Self {
        match self {
            Position::Root | Position::Field => Position::Field,
            Position::Detached => Position::Detached,
        }
    }
}

pub(super) fn compile_document(document: &str) -> Result<SchemaNode, SchemaErrors> {
    let value: Value = serde_json::from_str(document).map_err(|e| {
        SchemaErrors::single(
            SchemaError::new(JsonPath::root(), format!("schema document is not valid JSON: {e}"))
                .with_code("malformed_schema"),
        )
    })?;
    compile_node(&value, &JsonPath::root(), Position::Root).into_result()
}

fn compile_node(
    value: &Value,
    path: &JsonPath,
    position: Position,
) -> Validation<SchemaNode, SchemaErrors> {
    let Some(obj) = value.as_object() else {
        return Validation::Failure(SchemaErrors::single(
            SchemaError::new(path.clone(), "schema node must be an object")
                .with_code("invalid_schema_node")
                .with_got(json_type_name(value)),
        ));
    };

    let mut errors = Vec::new();

    let (declared, nullable) = absorb(declared_type(obj, path), &mut errors).unwrap_or((None, false));
    let kind = absorb(
        compile_kind(obj, declared.as_deref(), path, position),
        &mut errors,
    );
    let id_reference = absorb(compile_id_reference(obj, path), &mut errors).flatten();
    let searchable = absorb(compile_searchable(obj, path), &mut errors).flatten();

    if let (Some(kind), Some(_)) = (&kind, &id_reference) {
        if !matches!(kind, SchemaKind::String) {
            errors.push(
                SchemaError::new(
                    path.push_field("id-reference"),
                    "id-reference is only allowed on string fields",
                )
                .with_code("misplaced_id_reference")
                .with_got(kind.name()),
            );
        }
    }

    if let Some(mode) = searchable {
        if position != Position::Field {
            errors.push(
                SchemaError::new(
                    path.push_field("searchable-ws-subset"),
                    "searchable-ws-subset is only allowed on structure fields reached through structures",
                )
                .with_code("misplaced_searchable"),
            );
        }
        if mode == Searchable::Keys && !matches!(kind, Some(SchemaKind::Mapping(_))) {
            errors.push(
                SchemaError::new(
                    path.push_field("searchable-ws-subset"),
                    "searchable-ws-subset \"keys\" requires a mapping",
                )
                .with_code("misplaced_searchable"),
            );
        }
    }

    match (SchemaErrors::try_from_vec(errors), kind) {
        (Some(errors), _) => Validation::Failure(errors),
        (None, Some(kind)) => {
            let has_searchable_descendants = match &kind {
                SchemaKind::Structure(structure) => structure.fields.values().any(|f| {
                    f.schema.searchable.is_some() || f.schema.has_searchable_descendants
                }),
                _ => false,
            };
            Validation::Success(SchemaNode {
                kind,
                nullable,
                id_reference,
                searchable,
                has_searchable_descendants,
            })
        }
        (None, None) => Validation::Failure(SchemaErrors::single(
            SchemaError::new(path.clone(), "unable to determine node kind")
                .with_code("invalid_schema_node"),
        )),
    }
}

/// Reads `"type"`: the single non-null type, and whether `"null"` is allowed.
fn declared_type(
    obj: &Map<String, Value>,
    path: &JsonPath,
) -> Validation<(Option<String>, bool), SchemaErrors> {
    let names: Vec<&str> = match obj.get("type") {
        None => return Validation::Success((None, false)),
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(items)) => {
            let names: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
            match names {
                Some(names) => names,
                None => return invalid(path.push_field("type"), "type list must contain strings"),
            }
        }
        Some(other) => {
            return Validation::Failure(SchemaErrors::single(
                SchemaError::new(path.push_field("type"), "type must be a string or array")
                    .with_code("invalid_schema_node")
                    .with_got(json_type_name(other)),
            ))
        }
    };

    let nullable = names.contains(&"null");
    let mut concrete = names.into_iter().filter(|n| *n != "null");
    match (concrete.next(), concrete.next()) {
        (Some(_), Some(_)) => invalid(
            path.push_field("type"),
            "at most one non-null type may be declared",
        ),
        (Some(name), None) => Validation::Success((Some(name.to_string()), nullable)),
        (None, _) if nullable => Validation::Success((Some("null".to_string()), false)),
        (None, _) => invalid(path.push_field("type"), "type list is empty"),
    }
}

fn compile_kind(
    obj: &Map<String, Value>,
    declared: Option<&str>,
    path: &JsonPath,
    position: Position,
) -> Validation<SchemaKind, SchemaErrors> {
    let original = match obj.get("original-type") {
        None => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => return invalid(path.push_field("original-type"), "original-type must be a string"),
    };

    let shape = match original {
        Some("kidl-structure") => Shape::Structure,
        Some("kidl-mapping") => Shape::Mapping,
        Some("kidl-list") => Shape::List,
        Some("kidl-tuple") => Shape::Tuple,
        Some("kidl-string") => Shape::String,
        Some("kidl-int") => Shape::Integer,
        Some("kidl-float") => Shape::Float,
        Some("kidl-UnspecifiedObject") => Shape::Any,
        Some(other) => {
            return invalid(
                path.push_field("original-type"),
                format!("unknown original-type '{other}'"),
            )
        }
        None => match infer_shape(obj, declared) {
            Some(shape) => shape,
            None => {
                return invalid(
                    path.push_field("type"),
                    format!("unsupported type '{}'", declared.unwrap_or_default()),
                )
            }
        },
    };

    match shape {
        Shape::Structure => compile_structure(obj, path, position).map(SchemaKind::Structure),
        Shape::Mapping => compile_optional_child(obj, "additionalProperties", path)
            .map(|values| SchemaKind::Mapping(Box::new(values))),
        Shape::List => {
            compile_optional_child(obj, "items", path).map(|items| SchemaKind::List(Box::new(items)))
        }
        Shape::Tuple => compile_tuple(obj, path).map(SchemaKind::Tuple),
        Shape::String => Validation::Success(SchemaKind::String),
        Shape::Integer => Validation::Success(SchemaKind::Integer),
        Shape::Float => Validation::Success(SchemaKind::Float),
        Shape::Boolean => Validation::Success(SchemaKind::Boolean),
        Shape::Null => Validation::Success(SchemaKind::Null),
        Shape::Any => Validation::Success(SchemaKind::Any),
    }
}

enum Shape {
    Structure,
    Mapping,
    List,
    Tuple,
    String,
    Integer,
    Float,
    Boolean,
    Null,
    Any,
}

fn infer_shape(obj: &Map<String, Value>, declared: Option<&str>) -> Option<Shape> {
    Some(match declared {
        None => Shape::Any,
        Some("object") => {
            if !obj.contains_key("properties")
                && obj.get("additionalProperties").is_some_and(Value::is_object)
            {
                Shape::Mapping
            } else {
                Shape::Structure
            }
        }
        Some("array") => {
            if obj.get("items").is_some_and(Value::is_array) {
                Shape::Tuple
            } else {
                Shape::List
            }
        }
        Some("string") => Shape::String,
        Some("integer") => Shape::Integer,
        Some("number") => Shape::Float,
        Some("boolean") => Shape::Boolean,
        Some("null") => Shape::Null,
        Some(_) => return None,
    })
}

fn compile_structure(
    obj: &Map<String, Value>,
    path: &JsonPath,
    position: Position,
) -> Validation<StructureSchema, SchemaErrors> {
    let mut errors = Vec::new();
    let mut compiled = IndexMap::new();
    let child_position = position.for_properties();

    match obj.get("properties") {
        None => {}
        Some(Value::Object(properties)) => {
            let properties_path = path.push_field("properties");
            for (name, node) in properties {
                let node_path = properties_path.push_field(name);
                if let Some(schema) = absorb(compile_node(node, &node_path, child_position), &mut errors) {
                    compiled.insert(name.clone(), schema);
                }
            }
        }
        Some(_) => errors.push(
            SchemaError::new(path.push_field("properties"), "properties must be an object")
                .with_code("invalid_schema_node"),
        ),
    }

    let mut required = Vec::new();
    match obj.get("required") {
        None => {}
        Some(Value::Array(names)) => {
            for (idx, name) in names.iter().enumerate() {
                let entry_path = path.push_field("required").push_index(idx);
                match name.as_str() {
                    Some(name) if obj_has_property(obj, name) => required.push(name.to_string()),
                    Some(name) => errors.push(
                        SchemaError::new(entry_path, format!("required field '{name}' is not declared"))
                            .with_code("undeclared_required"),
                    ),
                    None => errors.push(
                        SchemaError::new(entry_path, "required entries must be strings")
                            .with_code("invalid_schema_node"),
                    ),
                }
            }
        }
        Some(_) => errors.push(
            SchemaError::new(path.push_field("required"), "required must be an array")
                .with_code("invalid_schema_node"),
        ),
    }

    let additional_properties = match obj.get("additionalProperties") {
        None => true,
        Some(Value::Bool(allow)) => *allow,
        Some(_) => {
            errors.push(
                SchemaError::new(
                    path.push_field("additionalProperties"),
                    "additionalProperties of a structure must be a boolean",
                )
                .with_code("invalid_schema_node"),
            );
            true
        }
    };

    match SchemaErrors::try_from_vec(errors) {
        Some(errors) => Validation::Failure(errors),
        None => {
            let fields = compiled
                .into_iter()
                .map(|(name, schema)| {
                    let required = required.contains(&name);
                    (name, FieldDef { schema, required })
                })
                .collect();
            Validation::Success(StructureSchema {
                fields,
                additional_properties,
            })
        }
    }
}

fn obj_has_property(obj: &Map<String, Value>, name: &str) -> bool {
    obj.get("properties")
        .and_then(Value::as_object)
        .is_some_and(|p| p.contains_key(name))
}

/// Compiles `obj[key]` as a detached child; an absent key means "any value".
fn compile_optional_child(
    obj: &Map<String, Value>,
    key: &str,
    path: &JsonPath,
) -> Validation<SchemaNode, SchemaErrors> {
    match obj.get(key) {
        None | Some(Value::Bool(true)) => Validation::Success(any_node()),
        Some(node) => compile_node(node, &path.push_field(key), Position::Detached),
    }
}

fn compile_tuple(obj: &Map<String, Value>, path: &JsonPath) -> Validation<Vec<SchemaNode>, SchemaErrors> {
    let items_path = path.push_field("items");
    let Some(items) = obj.get("items").and_then(Value::as_array) else {
        return invalid(items_path, "tuple items must be an array of schema nodes");
    };

    let mut errors = Vec::new();
    let mut compiled = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        if let Some(node) = absorb(
            compile_node(item, &items_path.push_index(idx), Position::Detached),
            &mut errors,
        ) {
            compiled.push(node);
        }
    }

    match SchemaErrors::try_from_vec(errors) {
        Some(errors) => Validation::Failure(errors),
        None => Validation::Success(compiled),
    }
}

fn compile_id_reference(
    obj: &Map<String, Value>,
    path: &JsonPath,
) -> Validation<Option<IdReferenceSpec>, SchemaErrors> {
    let Some(spec) = obj.get("id-reference") else {
        return Validation::Success(None);
    };
    let spec_path = path.push_field("id-reference");
    let Some(spec) = spec.as_object() else {
        return invalid(spec_path, "id-reference must be an object");
    };

    let id_type = match spec.get("id-type").and_then(Value::as_str) {
        Some(tag) if !tag.is_empty() => IdReferenceType::new(tag),
        _ => return invalid(spec_path.push_field("id-type"), "id-type must be a non-empty string"),
    };

    let attributes = match spec.get("attributes") {
        None => Vec::new(),
        Some(Value::Array(items)) => {
            let attrs: Option<Vec<String>> =
                items.iter().map(|a| a.as_str().map(str::to_string)).collect();
            match attrs {
                Some(attrs) => attrs,
                None => {
                    return invalid(
                        spec_path.push_field("attributes"),
                        "attributes must be an array of strings",
                    )
                }
            }
        }
        Some(_) => {
            return invalid(
                spec_path.push_field("attributes"),
                "attributes must be an array of strings",
            )
        }
    };

    Validation::Success(Some(IdReferenceSpec {
        id_type,
        attributes,
    }))
}

fn compile_searchable(
    obj: &Map<String, Value>,
    path: &JsonPath,
) -> Validation<Option<Searchable>, SchemaErrors> {
    match obj.get("searchable-ws-subset") {
        None | Some(Value::Bool(false)) => Validation::Success(None),
        Some(Value::Bool(true)) => Validation::Success(Some(Searchable::Whole)),
        Some(Value::String(mode)) if mode == "keys" => Validation::Success(Some(Searchable::Keys)),
        Some(_) => invalid(
            path.push_field("searchable-ws-subset"),
            "searchable-ws-subset must be true, false or \"keys\"",
        ),
    }
}

fn any_node() -> SchemaNode {
    SchemaNode {
        kind: SchemaKind::Any,
        nullable: true,
        id_reference: None,
        searchable: None,
        has_searchable_descendants: false,
    }
}

fn invalid<T>(path: JsonPath, message: impl Into<String>) -> Validation<T, SchemaErrors> {
    Validation::Failure(SchemaErrors::single(
        SchemaError::new(path, message).with_code("invalid_schema_node"),
    ))
}

/// Moves a failure's errors into `errors`, returning the success value if any.
fn absorb<T>(result: Validation<T, SchemaErrors>, errors: &mut Vec<SchemaError>) -> Option<T> {
    match result {
        Validation::Success(value) => Some(value),
        Validation::Failure(e) => {
            errors.extend(e);
            None
        }
    }
}

/// Returns the JSON type name for a value.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(doc: Value) -> Result<SchemaNode, SchemaErrors> {
        compile_document(&doc.to_string())
    }

    #[test]
    fn test_structure_fields_keep_declaration_order() {
        let node = compile(json!({
            "type": "object",
            "properties": {
                "zeta": {"type": "string"},
                "alpha": {"type": "integer"},
                "mid": {"type": "number"}
            },
            "required": ["alpha"]
        }))
        .unwrap();

        let SchemaKind::Structure(structure) = node.kind() else {
            panic!("expected structure");
        };
        let names: Vec<_> = structure.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert!(structure.field("alpha").unwrap().1.is_required());
        assert!(!structure.field("zeta").unwrap().1.is_required());
        assert!(structure.allows_additional_properties());
    }

    #[test]
    fn test_kind_inference() {
        let node = compile(json!({
            "type": "object",
            "properties": {
                "map": {"type": "object", "additionalProperties": {"type": "integer"}},
                "list": {"type": "array", "items": {"type": "string"}},
                "tuple": {"type": "array", "items": [{"type": "string"}, {"type": "integer"}]},
                "anything": {},
                "maybe": {"type": ["string", "null"]}
            }
        }))
        .unwrap();
        let SchemaKind::Structure(s) = node.kind() else {
            panic!("expected structure");
        };
        let kind = |name: &str| s.field(name).unwrap().1.schema().kind().name();
        assert_eq!(kind("map"), "mapping");
        assert_eq!(kind("list"), "list");
        assert_eq!(kind("tuple"), "tuple");
        assert_eq!(kind("anything"), "any");
        assert_eq!(kind("maybe"), "string");
        assert!(s.field("maybe").unwrap().1.schema().is_nullable());
    }

    #[test]
    fn test_original_type_wins_over_inference() {
        let node = compile(json!({
            "type": "object",
            "original-type": "kidl-mapping",
            "additionalProperties": {"type": "string"}
        }))
        .unwrap();
        assert_eq!(node.kind().name(), "mapping");
    }

    #[test]
    fn test_id_reference_and_searchable() {
        let node = compile(json!({
            "type": "object",
            "properties": {
                "ref": {
                    "type": "string",
                    "id-reference": {"id-type": "ws", "attributes": ["Mod.Genome"]}
                },
                "tags": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                    "searchable-ws-subset": "keys"
                },
                "meta": {
                    "type": "object",
                    "properties": {"source": {"type": "string", "searchable-ws-subset": true}}
                }
            }
        }))
        .unwrap();

        assert!(node.has_searchable_descendants());
        let SchemaKind::Structure(s) = node.kind() else {
            panic!("expected structure");
        };
        let spec = s.field("ref").unwrap().1.schema().id_reference().unwrap();
        assert_eq!(spec.id_type().as_str(), "ws");
        assert_eq!(spec.attributes(), ["Mod.Genome".to_string()]);
        assert_eq!(s.field("tags").unwrap().1.schema().searchable(), Some(Searchable::Keys));
        assert!(s.field("meta").unwrap().1.schema().has_searchable_descendants());
    }

    #[test]
    fn test_all_problems_reported_together() {
        let errors = compile(json!({
            "type": "object",
            "properties": {
                "a": {"type": "integer", "id-reference": {"id-type": "ws"}},
                "b": {"type": "wat"},
                "c": {
                    "type": "array",
                    "items": {"type": "string", "searchable-ws-subset": true}
                },
                "d": 5
            },
            "required": ["missing"]
        }))
        .unwrap_err();

        assert_eq!(errors.with_code("misplaced_id_reference").len(), 1);
        assert_eq!(errors.with_code("misplaced_searchable").len(), 1);
        assert_eq!(errors.with_code("undeclared_required").len(), 1);
        assert_eq!(errors.with_code("invalid_schema_node").len(), 2);
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_malformed_document() {
        let errors = compile_document("{not json").unwrap_err();
        assert_eq!(errors.first().code, "malformed_schema");
    }

    #[test]
    fn test_keys_requires_mapping() {
        let errors = compile(json!({
            "type": "object",
            "properties": {"name": {"type": "string", "searchable-ws-subset": "keys"}}
        }))
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().code, "misplaced_searchable");
    }
}
