//! Compiled schemas for typed object validation.
//!
//! A schema document (handed over by the type registry as JSON) is compiled
//! once into a tree of [`SchemaNode`]s. Besides the expected shape of the
//! instance, the tree records which string fields carry identifier
//! references and which structure fields belong to the searchable subset.
//!
//! # Example
//!
//! ```rust
//! use typedobj::CompiledSchema;
//!
//! let schema = CompiledSchema::compile(
//!     "Mod.Thing-1.0".parse().unwrap(),
//!     r#"{
//!         "type": "object",
//!         "original-type": "kidl-structure",
//!         "properties": {
//!             "id": {"type": "string", "id-reference": {"id-type": "ws"}},
//!             "name": {"type": "string", "searchable-ws-subset": true}
//!         },
//!         "required": ["id"]
//!     }"#,
//! )
//! .unwrap();
//!
//! assert!(schema.is_structure());
//! assert!(schema.has_searchable_subset());
//! ```

mod compile;

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use indexmap::IndexMap;

use crate::idref::IdReferenceType;
use crate::typedef::AbsoluteTypeDefId;
use crate::CompileResult;

/// A schema document compiled for one exact type version.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    type_def: AbsoluteTypeDefId,
    root: SchemaNode,
}

impl CompiledSchema {
    /// Compiles a schema document.
    ///
    /// # Errors
    ///
    /// Returns every problem found in the document, not just the first.
    pub fn compile(type_def: AbsoluteTypeDefId, document: &str) -> CompileResult<Self> {
        let root = compile::compile_document(document)?;
        Ok(Self { type_def, root })
    }

    /// The type version this schema describes.
    pub fn type_def(&self) -> &AbsoluteTypeDefId {
        &self.type_def
    }

    /// The root node.
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// True when the root is a structure; only structures can be validated.
    pub fn is_structure(&self) -> bool {
        matches!(self.root.kind, SchemaKind::Structure(_))
    }

    /// True when any field is declared part of the searchable subset.
    pub fn has_searchable_subset(&self) -> bool {
        self.root.has_searchable_descendants
    }

    /// All identifier types declared anywhere in the schema.
    pub fn id_types(&self) -> BTreeSet<IdReferenceType> {
        let mut types = BTreeSet::new();
        self.root.collect_id_types(&mut types);
        types
    }
}

/// One node of a compiled schema.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    kind: SchemaKind,
    nullable: bool,
    id_reference: Option<IdReferenceSpec>,
    searchable: Option<Searchable>,
    has_searchable_descendants: bool,
}

impl SchemaNode {
    /// The kind of value this node accepts.
    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Whether `null` is accepted in place of the declared kind.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The identifier declaration, for identifier-bearing string fields.
    pub fn id_reference(&self) -> Option<&IdReferenceSpec> {
        self.id_reference.as_ref()
    }

    /// How this field contributes to the searchable subset, if at all.
    pub fn searchable(&self) -> Option<Searchable> {
        self.searchable
    }

    /// Whether some field below this node contributes to the searchable subset.
    pub fn has_searchable_descendants(&self) -> bool {
        self.has_searchable_descendants
    }

    fn collect_id_types(&self, types: &mut BTreeSet<IdReferenceType>) {
        if let Some(spec) = &self.id_reference {
            types.insert(spec.id_type.clone());
        }
        match &self.kind {
            SchemaKind::Structure(structure) => {
                for field in structure.fields.values() {
                    field.schema.collect_id_types(types);
                }
            }
            SchemaKind::Mapping(values) => values.collect_id_types(types),
            SchemaKind::List(items) => items.collect_id_types(types),
            SchemaKind::Tuple(items) => {
                for item in items {
                    item.collect_id_types(types);
                }
            }
            _ => {}
        }
    }
}

/// The value kinds a schema node can require.
#[derive(Debug, Clone)]
pub enum SchemaKind {
    /// An object with declared fields.
    Structure(StructureSchema),
    /// An object with arbitrary keys and uniformly typed values.
    Mapping(Box<SchemaNode>),
    /// An array with uniformly typed elements.
    List(Box<SchemaNode>),
    /// A fixed-length array with per-position types.
    Tuple(Vec<SchemaNode>),
    /// A string.
    String,
    /// An integer.
    Integer,
    /// Any number.
    Float,
    /// A boolean.
    Boolean,
    /// Only `null`.
    Null,
    /// Any value at all; nothing below it is inspected.
    Any,
}

impl SchemaKind {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Structure(_) => "structure",
            SchemaKind::Mapping(_) => "mapping",
            SchemaKind::List(_) => "list",
            SchemaKind::Tuple(_) => "tuple",
            SchemaKind::String => "string",
            SchemaKind::Integer => "integer",
            SchemaKind::Float => "float",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Null => "null",
            SchemaKind::Any => "any",
        }
    }
}

impl Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared fields of a structure.
#[derive(Debug, Clone)]
pub struct StructureSchema {
    fields: IndexMap<String, FieldDef>,
    additional_properties: bool,
}

impl StructureSchema {
    /// Looks up a field by name, with its declaration index.
    pub fn field(&self, name: &str) -> Option<(usize, &FieldDef)> {
        self.fields.get_full(name).map(|(idx, _, field)| (idx, field))
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether undeclared fields are tolerated.
    pub fn allows_additional_properties(&self) -> bool {
        self.additional_properties
    }
}

/// A declared structure field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    schema: SchemaNode,
    required: bool,
}

impl FieldDef {
    /// The field's schema.
    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    /// Whether the field must be present.
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Identifier declaration on a string field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdReferenceSpec {
    id_type: IdReferenceType,
    attributes: Vec<String>,
}

impl IdReferenceSpec {
    /// The identifier type tag.
    pub fn id_type(&self) -> &IdReferenceType {
        &self.id_type
    }

    /// Type-specific attributes attached to every occurrence.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }
}

/// How a field contributes to the searchable subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Searchable {
    /// The whole field value is copied.
    Whole,
    /// Only the keys of a mapping are copied, as an array.
    Keys,
}
