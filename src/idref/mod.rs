//! Identifier references: extraction results, positional tree, and the
//! handler registry that batches and remaps them.
//!
//! Validation emits one [`IdReference`] per identifier-bearing field it
//! meets and files its position in an [`IdRefTree`]. Many reports' references
//! are then pooled into one [`IdReferenceRegistry`], which dispatches each to
//! the [`IdReferenceHandler`] registered for its type, caps the number of
//! distinct identifiers held, and resolves them in one batch.

mod error;
mod handler;
mod passthrough;
mod registry;
mod tree;
mod workspace;

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

pub use error::{IdRefError, IdReferenceHandlerError};
pub use handler::IdReferenceHandler;
pub use passthrough::PassThroughHandler;
pub use registry::{IdReferenceRegistry, IdReferenceRegistryBuilder};
pub use tree::{IdRefNode, IdRefTree, NodeId};
pub use workspace::{ObjectReference, ObjectResolver, ResolvedObject, WorkspaceIdHandler};

/// The type tag of an identifier (e.g. `ws` for workspace object references).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdReferenceType(String);

impl IdReferenceType {
    /// Tag for workspace object references.
    pub const WORKSPACE: &'static str = "ws";

    /// Creates a type tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The workspace object reference tag.
    pub fn workspace() -> Self {
        Self::new(Self::WORKSPACE)
    }

    /// The tag as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdReferenceType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// One identifier found in an instance: its type, raw value, and the
/// attributes the schema declared for that field.
///
/// Its position lives in the report's [`IdRefTree`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdReference {
    id_type: IdReferenceType,
    id: String,
    attributes: Vec<String>,
}

impl IdReference {
    /// Creates a reference.
    pub fn new(
        id_type: impl Into<IdReferenceType>,
        id: impl Into<String>,
        attributes: Vec<String>,
    ) -> Self {
        Self {
            id_type: id_type.into(),
            id: id.into(),
            attributes,
        }
    }

    /// The identifier type.
    pub fn id_type(&self) -> &IdReferenceType {
        &self.id_type
    }

    /// The raw identifier as written in the instance.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Type-specific attributes from the schema.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }
}

impl Display for IdReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} id {}", self.id_type, self.id)?;
        if !self.attributes.is_empty() {
            write!(f, " {:?}", self.attributes)?;
        }
        Ok(())
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<IdReference>();
    assert_sync::<IdReference>();
    assert_send::<IdRefTree>();
    assert_sync::<IdRefTree>();
};
