//! Registry-backed validation of typed objects.
//!
//! [`TypedObjectValidator`] ties the pieces together: it resolves the
//! requested type through a [`TypeRegistry`], compiles (and caches) the
//! schema document of the resolved version, and runs the validation walker
//! over the instance.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{self, JsonReader, TokenStream, MIN_MAX_ERRORS};
use crate::error::SchemaErrors;
use crate::report::ValidationReport;
use crate::schema::CompiledSchema;
use crate::typedb::{TypeRegistry, TypeRegistryError};
use crate::typedef::{AbsoluteTypeDefId, TypeDefId};

/// Errors that prevent a report from being produced at all.
#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    /// The type could not be resolved or its schema fetched.
    #[error(transparent)]
    TypeRegistry(#[from] TypeRegistryError),

    /// The stored schema document does not compile.
    #[error("schema for {type_def} is invalid: {errors}")]
    BadSchema {
        /// The type version whose schema failed.
        type_def: AbsoluteTypeDefId,
        /// Every problem in the document.
        errors: SchemaErrors,
    },

    /// Only structures can be validated as typed objects.
    #[error("type {0} is not a structure")]
    NotAStructure(AbsoluteTypeDefId),
}

/// Validator settings.
///
/// # Example
///
/// ```rust
/// use typedobj::ValidatorConfig;
///
/// let config: ValidatorConfig = serde_json::from_str(r#"{"max_errors": 50}"#).unwrap();
/// assert_eq!(config.max_errors(), 50);
///
/// assert_eq!(ValidatorConfig::default().max_errors(), 10);
/// assert_eq!(ValidatorConfig::default().with_max_errors(1).max_errors(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    max_errors: usize,
}

impl ValidatorConfig {
    /// The default error budget.
    pub const DEFAULT_MAX_ERRORS: usize = 10;

    /// Sets the error budget: the walk stops at the `max_errors`-th
    /// violation, so at most `max_errors - 1` are reported.
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// The effective error budget, never below 2.
    pub fn max_errors(&self) -> usize {
        self.max_errors.max(MIN_MAX_ERRORS)
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_errors: Self::DEFAULT_MAX_ERRORS,
        }
    }
}

/// Validates instances of registered types.
///
/// Compiled schemas are cached per exact type version and shared between
/// threads.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use typedobj::{InMemoryTypeRegistry, TypedObjectValidator};
///
/// let types = InMemoryTypeRegistry::new();
/// types
///     .register(
///         "Mod.Thing-1.0".parse().unwrap(),
///         r#"{"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]}"#,
///     )
///     .unwrap();
///
/// let validator = TypedObjectValidator::new(Arc::new(types));
/// let thing = "Mod.Thing".parse().unwrap();
///
/// assert!(validator.validate_str(r#"{"name": "x"}"#, &thing).unwrap().is_valid());
/// assert!(!validator.validate_str(r#"{}"#, &thing).unwrap().is_valid());
/// ```
pub struct TypedObjectValidator {
    registry: Arc<dyn TypeRegistry>,
    config: ValidatorConfig,
    schemas: RwLock<HashMap<AbsoluteTypeDefId, Arc<CompiledSchema>>>,
}

impl TypedObjectValidator {
    /// Creates a validator with default settings.
    pub fn new(registry: Arc<dyn TypeRegistry>) -> Self {
        Self {
            registry,
            config: ValidatorConfig::default(),
            schemas: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the settings.
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// The current settings.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Resolves `type_def` and returns the compiled schema of that version.
    ///
    /// # Errors
    ///
    /// Registry failures and schema documents that do not compile.
    pub fn schema(&self, type_def: &TypeDefId) -> Result<Arc<CompiledSchema>, ValidatorError> {
        let absolute = self.registry.resolve_type(type_def)?;
        if let Some(schema) = self.schemas.read().get(&absolute) {
            return Ok(Arc::clone(schema));
        }

        tracing::debug!(requested = %type_def, resolved = %absolute, "compiling schema");
        let document = self.registry.schema_document(&absolute)?;
        let compiled = CompiledSchema::compile(absolute.clone(), &document).map_err(|errors| {
            tracing::warn!(type_def = %absolute, errors = errors.len(), "schema does not compile");
            ValidatorError::BadSchema {
                type_def: absolute.clone(),
                errors,
            }
        })?;

        let mut schemas = self.schemas.write();
        let schema = schemas.entry(absolute).or_insert_with(|| Arc::new(compiled));
        Ok(Arc::clone(schema))
    }

    /// Number of compiled schemas held.
    pub fn cached_schemas(&self) -> usize {
        self.schemas.read().len()
    }

    /// Validates an instance read from any token stream.
    ///
    /// # Errors
    ///
    /// See [`schema`](Self::schema) and [`engine::validate`]. The stream is
    /// dropped unread if the schema cannot be obtained.
    pub fn validate<S: TokenStream>(
        &self,
        stream: S,
        type_def: &TypeDefId,
    ) -> Result<ValidationReport, ValidatorError> {
        let schema = self.schema(type_def)?;
        engine::validate(stream, &schema, self.config.max_errors())
    }

    /// Validates JSON text.
    ///
    /// # Errors
    ///
    /// See [`validate`](Self::validate).
    pub fn validate_str(&self, json: &str, type_def: &TypeDefId) -> Result<ValidationReport, ValidatorError> {
        self.validate(json, type_def)
    }

    /// Validates JSON bytes.
    ///
    /// # Errors
    ///
    /// See [`validate`](Self::validate).
    pub fn validate_slice(&self, json: &[u8], type_def: &TypeDefId) -> Result<ValidationReport, ValidatorError> {
        self.validate(json, type_def)
    }

    /// Validates JSON streamed from a reader.
    ///
    /// # Errors
    ///
    /// See [`validate`](Self::validate).
    pub fn validate_reader<R: Read>(
        &self,
        reader: R,
        type_def: &TypeDefId,
    ) -> Result<ValidationReport, ValidatorError> {
        self.validate(JsonReader::new(reader), type_def)
    }

    /// Validates an already parsed instance.
    ///
    /// # Errors
    ///
    /// See [`validate`](Self::validate).
    pub fn validate_value(&self, value: &Value, type_def: &TypeDefId) -> Result<ValidationReport, ValidatorError> {
        self.validate(value, type_def)
    }

    /// Validates many instances of one type in parallel.
    ///
    /// The type is resolved once; reports come back in input order.
    ///
    /// # Errors
    ///
    /// See [`schema`](Self::schema).
    pub fn validate_batch(
        &self,
        instances: &[Value],
        type_def: &TypeDefId,
    ) -> Result<Vec<ValidationReport>, ValidatorError> {
        let schema = self.schema(type_def)?;
        let max_errors = self.config.max_errors();
        instances
            .par_iter()
            .map(|instance| engine::validate(instance, &schema, max_errors))
            .collect()
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<TypedObjectValidator>();
    assert_sync::<TypedObjectValidator>();
    assert_send::<ValidationReport>();
};
