//! # typedobj
//!
//! Streaming validation of typed JSON objects, with identifier extraction and
//! batch remapping.
//!
//! ## Overview
//!
//! An instance is checked against the schema of a versioned type in a single
//! pass over its tokens. The same pass collects every identifier-bearing
//! string (with its position) and copies out the fields the schema marks as
//! searchable. The identifiers of many instances can then be pooled in an
//! [`IdReferenceRegistry`], resolved as one batch by per-type handlers, and
//! written back into each instance with [`relabel`].
//!
//! ## Core Types
//!
//! - [`TypedObjectValidator`]: resolves types, caches compiled schemas, validates
//! - [`CompiledSchema`]: a schema document compiled into a validation tree
//! - [`ValidationReport`]: errors, identifiers, and searchable subset of one instance
//! - [`IdReferenceRegistry`]: pools identifiers and dispatches them to handlers
//! - [`JsonPath`]: positions inside an instance (e.g. `features[0].location`)
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use typedobj::{
//!     IdReferenceRegistry, InMemoryTypeRegistry, PassThroughHandler, TypedObjectValidator,
//! };
//!
//! let types = InMemoryTypeRegistry::new();
//! types
//!     .register(
//!         "Mod.Gene-1.0".parse().unwrap(),
//!         r#"{
//!             "type": "object",
//!             "properties": {
//!                 "name": {"type": "string", "searchable-ws-subset": true},
//!                 "genome": {"type": "string", "id-reference": {"id-type": "kb"}}
//!             },
//!             "required": ["genome"]
//!         }"#,
//!     )
//!     .unwrap();
//!
//! let validator = TypedObjectValidator::new(Arc::new(types));
//! let mut gene = json!({"name": "dnaA", "genome": "g1"});
//! let mut report = validator
//!     .validate_value(&gene, &"Mod.Gene".parse().unwrap())
//!     .unwrap();
//! assert!(report.is_valid());
//! assert_eq!(report.searchable_subset(), Some(&json!({"name": "dnaA"})));
//!
//! let mut ids = IdReferenceRegistry::builder(100)
//!     .handler("kb", PassThroughHandler::new("kb"))
//!     .build();
//! ids.add_report("gene-1", &report).unwrap();
//! ids.process_ids().unwrap();
//!
//! report.set_absolute_id_references(ids.remap_report(&report).unwrap());
//! assert_eq!(report.relabel(&mut gene).unwrap(), 0);
//! ```

pub mod engine;
pub mod error;
pub mod idref;
pub mod path;
pub mod relabel;
pub mod report;
pub mod schema;
pub mod typedb;
pub mod typedef;
mod validation;
pub mod validator;

pub use engine::{JsonReader, TokenStream};
pub use error::{SchemaError, SchemaErrors};
pub use idref::{
    IdRefError, IdRefNode, IdRefTree, IdReference, IdReferenceHandler, IdReferenceHandlerError,
    IdReferenceRegistry, IdReferenceRegistryBuilder, IdReferenceType, NodeId, ObjectReference,
    ObjectResolver, PassThroughHandler, ResolvedObject, WorkspaceIdHandler,
};
pub use path::{JsonPath, PathSegment};
pub use relabel::{relabel, RelabelError};
pub use report::ValidationReport;
pub use schema::{CompiledSchema, FieldDef, IdReferenceSpec, SchemaKind, SchemaNode, Searchable, StructureSchema};
pub use typedb::{InMemoryTypeRegistry, TypeRegistry, TypeRegistryError};
pub use typedef::{AbsoluteTypeDefId, TypeDefId, TypeDefName, TypeIdError};
pub use validator::{TypedObjectValidator, ValidatorConfig, ValidatorError};

/// Result of compiling a schema document.
pub type CompileResult<T> = Result<T, SchemaErrors>;
