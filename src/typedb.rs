//! Type registry interface and an in-memory implementation.
//!
//! The validator never stores type definitions itself. It asks a
//! [`TypeRegistry`] to resolve a possibly version-less [`TypeDefId`] to an
//! [`AbsoluteTypeDefId`] and then to hand over that version's schema
//! document. [`InMemoryTypeRegistry`] is a thread-safe implementation for
//! embedding and tests.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::typedef::{AbsoluteTypeDefId, TypeDefId, TypeDefName};

/// Errors raised by a type registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeRegistryError {
    /// The module is not registered.
    #[error("module '{0}' does not exist")]
    NoSuchModule(String),

    /// The type, or the requested version of it, does not exist.
    #[error("unable to locate type '{0}'")]
    NoSuchType(String),

    /// The backing store failed.
    #[error("type storage error: {0}")]
    Storage(String),

    /// The exact type version is already registered.
    #[error("type '{0}' already registered")]
    DuplicateType(String),
}

/// Source of type resolution and schema documents.
///
/// Implementations must be shareable between threads; the validator may
/// resolve types from several batch workers at once.
pub trait TypeRegistry: Send + Sync {
    /// Resolves a type id to the exact version it designates.
    ///
    /// A missing major version means the latest version; a missing minor
    /// version means the latest minor version of that major.
    fn resolve_type(&self, id: &TypeDefId) -> Result<AbsoluteTypeDefId, TypeRegistryError>;

    /// Returns the schema document for an exact type version.
    fn schema_document(&self, id: &AbsoluteTypeDefId) -> Result<String, TypeRegistryError>;
}

/// Versions of one type, ordered so the last entry is the newest.
type Versions = BTreeMap<(u32, u32), Arc<str>>;

/// module -> type name -> versions
type ModuleMap = Arc<RwLock<HashMap<String, HashMap<String, Versions>>>>;

/// A thread-safe in-memory [`TypeRegistry`].
///
/// # Example
///
/// ```rust
/// use typedobj::{InMemoryTypeRegistry, TypeRegistry};
///
/// let registry = InMemoryTypeRegistry::new();
/// registry
///     .register("Mod.Thing-1.0".parse().unwrap(), r#"{"type":"object"}"#)
///     .unwrap();
/// registry
///     .register("Mod.Thing-1.1".parse().unwrap(), r#"{"type":"object"}"#)
///     .unwrap();
///
/// let latest = registry.resolve_type(&"Mod.Thing".parse().unwrap()).unwrap();
/// assert_eq!(latest.to_string(), "Mod.Thing-1.1");
/// ```
#[derive(Clone, Default)]
pub struct InMemoryTypeRegistry {
    modules: ModuleMap,
}

impl InMemoryTypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema document for an exact type version.
    ///
    /// # Errors
    ///
    /// Returns `TypeRegistryError::DuplicateType` if that exact version is
    /// already present.
    pub fn register(
        &self,
        id: AbsoluteTypeDefId,
        schema: impl Into<String>,
    ) -> Result<(), TypeRegistryError> {
        let mut modules = self.modules.write();
        let versions = modules
            .entry(id.type_name().module().to_string())
            .or_default()
            .entry(id.type_name().name().to_string())
            .or_default();

        let key = (id.major(), id.minor());
        if versions.contains_key(&key) {
            return Err(TypeRegistryError::DuplicateType(id.to_string()));
        }
        let schema: String = schema.into();
        versions.insert(key, Arc::from(schema));
        Ok(())
    }

    /// Returns all registered versions of a type, oldest first.
    pub fn versions(&self, name: &TypeDefName) -> Vec<AbsoluteTypeDefId> {
        let modules = self.modules.read();
        modules
            .get(name.module())
            .and_then(|types| types.get(name.name()))
            .map(|versions| {
                versions
                    .keys()
                    .map(|&(major, minor)| AbsoluteTypeDefId::new(name.clone(), major, minor))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TypeRegistry for InMemoryTypeRegistry {
    fn resolve_type(&self, id: &TypeDefId) -> Result<AbsoluteTypeDefId, TypeRegistryError> {
        let modules = self.modules.read();
        let name = id.type_name();
        let types = modules
            .get(name.module())
            .ok_or_else(|| TypeRegistryError::NoSuchModule(name.module().to_string()))?;
        let versions = types
            .get(name.name())
            .ok_or_else(|| TypeRegistryError::NoSuchType(id.to_string()))?;

        let found = match (id.major(), id.minor()) {
            (Some(major), Some(minor)) => versions.get_key_value(&(major, minor)),
            (Some(major), None) => versions.range((major, 0)..=(major, u32::MAX)).next_back(),
            _ => versions.iter().next_back(),
        };

        found
            .map(|(&(major, minor), _)| AbsoluteTypeDefId::new(name.clone(), major, minor))
            .ok_or_else(|| TypeRegistryError::NoSuchType(id.to_string()))
    }

    fn schema_document(&self, id: &AbsoluteTypeDefId) -> Result<String, TypeRegistryError> {
        let modules = self.modules.read();
        let name = id.type_name();
        modules
            .get(name.module())
            .ok_or_else(|| TypeRegistryError::NoSuchModule(name.module().to_string()))?
            .get(name.name())
            .and_then(|versions| versions.get(&(id.major(), id.minor())))
            .map(|schema| schema.to_string())
            .ok_or_else(|| TypeRegistryError::NoSuchType(id.to_string()))
    }
}
