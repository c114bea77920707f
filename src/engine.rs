//! The single-pass validation walker.
//!
//! An instance is validated as it is read: the compiled schema drives a serde
//! [`DeserializeSeed`] over the token stream, so the document is never built in
//! memory. Only the parts that belong to the searchable subset are
//! materialized. Anything the schema does not need to look at (undeclared
//! fields, `any` values, subtrees that already failed their kind check) is
//! skipped with [`IgnoredAny`].
//!
//! # Example
//!
//! ```rust
//! use typedobj::{engine, CompiledSchema};
//!
//! let schema = CompiledSchema::compile(
//!     "Mod.Thing-1.0".parse().unwrap(),
//!     r#"{"type": "object", "properties": {"size": {"type": "integer"}}, "required": ["size"]}"#,
//! )
//! .unwrap();
//!
//! let report = engine::validate(r#"{"size": 3}"#, &schema, 10).unwrap();
//! assert!(report.is_valid());
//!
//! let report = engine::validate(r#"{"size": "big"}"#, &schema, 10).unwrap();
//! assert_eq!(report.errors()[0].code, "invalid_type");
//! ```

use std::collections::HashSet;
use std::fmt;
use std::io::Read;

use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Number, Value};

use crate::error::SchemaError;
use crate::path::PathSegment;
use crate::report::ValidationReport;
use crate::schema::{CompiledSchema, SchemaKind, SchemaNode, Searchable, StructureSchema};
use crate::validation::{Step, ValidationContext};
use crate::validator::ValidatorError;

/// The smallest error budget accepted; smaller values are raised to it.
pub const MIN_MAX_ERRORS: usize = 2;

/// A forward-only source of one JSON instance.
///
/// Implementations hand the [`Walker`] to a serde deserializer over their
/// input and return what it produced. The stream is consumed by the walk.
pub trait TokenStream {
    /// Drives `walker` over the instance.
    ///
    /// # Errors
    ///
    /// Syntax or I/O faults in the input, and the walker's own abort.
    fn walk(self, walker: Walker<'_>) -> Result<Option<Value>, serde_json::Error>;
}

/// Streams an instance from any [`Read`] implementation.
pub struct JsonReader<R> {
    reader: R,
}

impl<R: Read> JsonReader<R> {
    /// Wraps a reader. Buffering is left to the caller.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> TokenStream for JsonReader<R> {
    fn walk(self, walker: Walker<'_>) -> Result<Option<Value>, serde_json::Error> {
        let mut de = serde_json::Deserializer::from_reader(self.reader);
        let captured = walker.deserialize(&mut de)?;
        de.end()?;
        Ok(captured)
    }
}

impl TokenStream for &str {
    fn walk(self, walker: Walker<'_>) -> Result<Option<Value>, serde_json::Error> {
        let mut de = serde_json::Deserializer::from_str(self);
        let captured = walker.deserialize(&mut de)?;
        de.end()?;
        Ok(captured)
    }
}

impl TokenStream for &[u8] {
    fn walk(self, walker: Walker<'_>) -> Result<Option<Value>, serde_json::Error> {
        let mut de = serde_json::Deserializer::from_slice(self);
        let captured = walker.deserialize(&mut de)?;
        de.end()?;
        Ok(captured)
    }
}

impl TokenStream for &Value {
    fn walk(self, walker: Walker<'_>) -> Result<Option<Value>, serde_json::Error> {
        walker.deserialize(self)
    }
}

/// Validates one instance against a structure schema.
///
/// At most `max_errors - 1` violations are reported; the `max_errors`-th ends
/// the walk early. Syntax faults in the input become a single
/// `malformed_instance` error at the root. The stream is always consumed.
///
/// # Errors
///
/// [`ValidatorError::NotAStructure`] when the schema's root is not a
/// structure.
pub fn validate<S: TokenStream>(
    stream: S,
    schema: &CompiledSchema,
    max_errors: usize,
) -> Result<ValidationReport, ValidatorError> {
    if !schema.is_structure() {
        drop(stream);
        return Err(ValidatorError::NotAStructure(schema.type_def().clone()));
    }

    let mut ctx = ValidationContext::new(max_errors.max(MIN_MAX_ERRORS));
    let capture = if schema.has_searchable_subset() {
        Capture::Projection
    } else {
        Capture::None
    };
    let walked = stream.walk(Walker {
        node: schema.root(),
        ctx: &mut ctx,
        capture,
    });

    let subset = match walked {
        Ok(subset) => subset,
        Err(_) if ctx.is_aborted() => None,
        Err(e) => {
            tracing::warn!(type_def = %schema.type_def(), error = %e, "malformed instance");
            ctx.record_malformed(e.to_string());
            None
        }
    };

    let (errors, references, tree) = ctx.finish();
    tracing::debug!(
        type_def = %schema.type_def(),
        errors = errors.len(),
        references = references.len(),
        "validated instance"
    );
    Ok(ValidationReport::new(
        schema.type_def().clone(),
        errors,
        subset,
        references,
        tree,
    ))
}

/// What the walker copies out of the value it is visiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    /// Nothing.
    None,
    /// The complete value.
    Whole,
    /// A mapping's keys, as an array.
    Keys,
    /// Only the searchable fields of a structure.
    Projection,
}

impl Capture {
    fn for_field(self, field: &SchemaNode) -> Capture {
        match self {
            Capture::Whole => Capture::Whole,
            Capture::Projection => match field.searchable() {
                Some(Searchable::Whole) => Capture::Whole,
                Some(Searchable::Keys) => Capture::Keys,
                None if field.has_searchable_descendants() => Capture::Projection,
                None => Capture::None,
            },
            Capture::None | Capture::Keys => Capture::None,
        }
    }

    fn for_element(self) -> Capture {
        match self {
            Capture::Whole => Capture::Whole,
            _ => Capture::None,
        }
    }
}

/// Deserialization seed that validates one value against one schema node.
///
/// Produced by [`validate`] and passed to [`TokenStream::walk`]; it cannot be
/// built directly.
pub struct Walker<'a> {
    node: &'a SchemaNode,
    ctx: &'a mut ValidationContext,
    capture: Capture,
}

fn aborted<E: de::Error>() -> E {
    E::custom("validation aborted: too many errors")
}

impl<'a> Walker<'a> {
    fn child<'b>(&'b mut self, node: &'a SchemaNode, capture: Capture) -> Walker<'b> {
        Walker {
            node,
            ctx: &mut *self.ctx,
            capture,
        }
    }

    fn expected(&self) -> String {
        if self.node.is_nullable() {
            format!("{} or null", self.node.kind())
        } else {
            self.node.kind().to_string()
        }
    }

    fn mismatch(&mut self, got: &str) -> Step {
        let expected = self.expected();
        let error = SchemaError::new(self.ctx.path(), format!("expected {}", expected))
            .with_code("invalid_type")
            .with_got(got)
            .with_expected(expected);
        self.ctx.record(error)
    }

    fn leaf<E: de::Error>(
        mut self,
        got: &str,
        accepted: bool,
        value: impl FnOnce() -> Value,
    ) -> Result<Option<Value>, E> {
        if !accepted && self.mismatch(got) == Step::Abort {
            return Err(aborted());
        }
        Ok((self.capture == Capture::Whole).then(value))
    }

    fn duplicate_key<E: de::Error>(&mut self, key: &str) -> Result<(), E> {
        let error = SchemaError::new(self.ctx.field_path(key), format!("duplicate key '{}'", key))
            .with_code("duplicate_key");
        match self.ctx.record(error) {
            Step::Abort => Err(aborted()),
            _ => Ok(()),
        }
    }

    fn skip_map<'de, A: MapAccess<'de>>(mut self, got: &str, mut map: A) -> Result<Option<Value>, A::Error> {
        if self.mismatch(got) == Step::Abort {
            return Err(aborted());
        }
        if self.capture == Capture::Whole {
            return Value::deserialize(MapAccessDeserializer::new(map)).map(Some);
        }
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn skip_seq<'de, A: SeqAccess<'de>>(mut self, got: &str, mut seq: A) -> Result<Option<Value>, A::Error> {
        if self.mismatch(got) == Step::Abort {
            return Err(aborted());
        }
        if self.capture == Capture::Whole {
            return Value::deserialize(SeqAccessDeserializer::new(seq)).map(Some);
        }
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_structure<'de, A: MapAccess<'de>>(
        mut self,
        structure: &'a StructureSchema,
        mut map: A,
    ) -> Result<Option<Value>, A::Error> {
        let mut seen = vec![false; structure.len()];
        let mut undeclared = HashSet::new();
        let mut captured = Map::new();

        while let Some(key) = map.next_key::<String>()? {
            let Some((idx, field)) = structure.field(&key) else {
                if !undeclared.insert(key.clone()) {
                    self.duplicate_key(&key)?;
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
                if !structure.allows_additional_properties() {
                    let error =
                        SchemaError::new(self.ctx.field_path(&key), format!("unknown field '{}'", key))
                            .with_code("additional_property");
                    if self.ctx.record(error) == Step::Abort {
                        return Err(aborted());
                    }
                }
                if self.capture == Capture::Whole {
                    let value: Value = map.next_value()?;
                    captured.insert(key, value);
                } else {
                    map.next_value::<IgnoredAny>()?;
                }
                continue;
            };

            if std::mem::replace(&mut seen[idx], true) {
                self.duplicate_key(&key)?;
                map.next_value::<IgnoredAny>()?;
                continue;
            }

            let capture = self.capture.for_field(field.schema());
            self.ctx.enter(PathSegment::field(key.as_str()));
            let value = map.next_value_seed(self.child(field.schema(), capture));
            self.ctx.leave();
            match value? {
                Some(Value::Object(m)) if capture == Capture::Projection && m.is_empty() => {}
                Some(v) => {
                    captured.insert(key, v);
                }
                None => {}
            }
        }

        for ((name, field), present) in structure.fields().zip(&seen) {
            if field.is_required() && !present {
                let error = SchemaError::new(
                    self.ctx.field_path(name),
                    format!("required field '{}' is missing", name),
                )
                .with_code("required")
                .with_expected("value");
                if self.ctx.record(error) == Step::Abort {
                    return Err(aborted());
                }
            }
        }

        Ok(match self.capture {
            Capture::Whole | Capture::Projection => Some(Value::Object(captured)),
            Capture::None | Capture::Keys => None,
        })
    }

    fn visit_mapping<'de, A: MapAccess<'de>>(
        mut self,
        values: &'a SchemaNode,
        mut map: A,
    ) -> Result<Option<Value>, A::Error> {
        let mut seen = HashSet::new();
        let mut captured = Map::new();
        let mut keys = Vec::new();

        while let Some(key) = map.next_key::<String>()? {
            if !seen.insert(key.clone()) {
                self.duplicate_key(&key)?;
                map.next_value::<IgnoredAny>()?;
                continue;
            }
            let capture = self.capture.for_element();
            self.ctx.enter(PathSegment::field(key.as_str()));
            let value = map.next_value_seed(self.child(values, capture));
            self.ctx.leave();
            let value = value?;
            match self.capture {
                Capture::Whole => {
                    if let Some(v) = value {
                        captured.insert(key, v);
                    }
                }
                Capture::Keys => keys.push(Value::String(key)),
                Capture::None | Capture::Projection => {}
            }
        }

        Ok(match self.capture {
            Capture::Whole => Some(Value::Object(captured)),
            Capture::Keys => Some(Value::Array(keys)),
            Capture::None | Capture::Projection => None,
        })
    }

    fn visit_list<'de, A: SeqAccess<'de>>(
        mut self,
        items: &'a SchemaNode,
        mut seq: A,
    ) -> Result<Option<Value>, A::Error> {
        let capture = self.capture.for_element();
        let mut captured = Vec::new();
        let mut idx = 0;
        loop {
            self.ctx.enter(PathSegment::index(idx));
            let next = seq.next_element_seed(self.child(items, capture));
            self.ctx.leave();
            match next? {
                None => break,
                Some(value) => captured.extend(value),
            }
            idx += 1;
        }
        Ok((self.capture == Capture::Whole).then(|| Value::Array(captured)))
    }

    fn visit_tuple<'de, A: SeqAccess<'de>>(
        mut self,
        items: &'a [SchemaNode],
        mut seq: A,
    ) -> Result<Option<Value>, A::Error> {
        let capture = self.capture.for_element();
        let mut captured = Vec::new();
        let mut count = 0;
        loop {
            let next = match items.get(count) {
                Some(item) => {
                    self.ctx.enter(PathSegment::index(count));
                    let next = seq.next_element_seed(self.child(item, capture));
                    self.ctx.leave();
                    next?.map(|value| captured.extend(value))
                }
                None if capture == Capture::Whole => {
                    seq.next_element::<Value>()?.map(|value| captured.push(value))
                }
                None => seq.next_element::<IgnoredAny>()?.map(|_| ()),
            };
            if next.is_none() {
                break;
            }
            count += 1;
        }

        if count != items.len() {
            let error = SchemaError::new(
                self.ctx.path(),
                format!("expected {} items, got {}", items.len(), count),
            )
            .with_code("tuple_length")
            .with_expected(format!("{} items", items.len()))
            .with_got(format!("{} items", count));
            if self.ctx.record(error) == Step::Abort {
                return Err(aborted());
            }
        }
        Ok((self.capture == Capture::Whole).then(|| Value::Array(captured)))
    }
}

impl<'de> DeserializeSeed<'de> for Walker<'_> {
    type Value = Option<Value>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        if let SchemaKind::Any = self.node.kind() {
            return match self.capture {
                Capture::Whole => Value::deserialize(deserializer).map(Some),
                _ => IgnoredAny::deserialize(deserializer).map(|_| None),
            };
        }
        deserializer.deserialize_any(self)
    }
}

impl<'de, 'a> Visitor<'de> for Walker<'a> {
    type Value = Option<Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a JSON value matching {}", self.node.kind())
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        let accepted = matches!(self.node.kind(), SchemaKind::Boolean);
        self.leaf("boolean", accepted, || Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        let accepted = matches!(self.node.kind(), SchemaKind::Integer | SchemaKind::Float);
        self.leaf("integer", accepted, || Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        let accepted = matches!(self.node.kind(), SchemaKind::Integer | SchemaKind::Float);
        self.leaf("integer", accepted, || Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        let accepted = matches!(self.node.kind(), SchemaKind::Float);
        self.leaf("float", accepted, || {
            Number::from_f64(v).map_or(Value::Null, Value::Number)
        })
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let accepted = matches!(self.node.kind(), SchemaKind::String);
        if accepted {
            if let Some(spec) = self.node.id_reference() {
                self.ctx.add_reference(spec, v);
            }
        }
        self.leaf("string", accepted, || Value::String(v.to_owned()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        let accepted = self.node.is_nullable() || matches!(self.node.kind(), SchemaKind::Null);
        self.leaf("null", accepted, || Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        self.visit_unit()
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        match self.node.kind() {
            SchemaKind::Structure(structure) => self.visit_structure(structure, map),
            SchemaKind::Mapping(values) => self.visit_mapping(values, map),
            _ => self.skip_map("object", map),
        }
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
        match self.node.kind() {
            SchemaKind::List(items) => self.visit_list(items, seq),
            SchemaKind::Tuple(items) => self.visit_tuple(items, seq),
            _ => self.skip_seq("array", seq),
        }
    }
}
