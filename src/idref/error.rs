//! Errors raised while accumulating, processing and remapping identifiers.

use std::error::Error;

use super::IdReferenceType;

/// Errors from the identifier registry and its handlers.
#[derive(Debug, thiserror::Error)]
pub enum IdRefError {
    /// No handler is registered for the identifier type.
    #[error("there is no handler for the ID type {0}")]
    NoHandler(IdReferenceType),

    /// Accepting another distinct identifier would exceed the ceiling.
    #[error("maximum ID count of {max} exceeded")]
    TooManyIds {
        /// The configured ceiling.
        max: usize,
    },

    /// The identifier was never added to the handler.
    #[error("no such {id_type} ID: {id}")]
    NoSuchId {
        /// The identifier type.
        id_type: IdReferenceType,
        /// The raw identifier.
        id: String,
    },

    /// The registry no longer accepts identifiers.
    #[error("this ID registry is locked")]
    Locked,

    /// A handler no longer accepts identifiers.
    #[error("the {0} ID handler is locked")]
    HandlerLocked(IdReferenceType),

    /// Identifiers were added before any carrier object was associated.
    #[error("an object must be associated before IDs can be added")]
    NoAssociatedObject,

    /// Remapping was requested before the batch was processed.
    #[error("IDs have not been processed")]
    NotProcessed,

    /// A handler rejected an identifier or failed while processing.
    #[error(transparent)]
    Handler(#[from] Box<IdReferenceHandlerError>),
}

/// A handler-specific failure, with the identifier and carrier that caused it.
#[derive(Debug, thiserror::Error)]
#[error("{message} ({id_type} ID {id} on {associated})")]
pub struct IdReferenceHandlerError {
    message: String,
    id_type: IdReferenceType,
    id: String,
    attributes: Vec<String>,
    associated: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl IdReferenceHandlerError {
    /// Creates an error; `associated` is a diagnostic rendering of the carrier.
    pub fn new(
        message: impl Into<String>,
        id_type: IdReferenceType,
        associated: impl Into<String>,
        id: impl Into<String>,
        attributes: &[String],
    ) -> Self {
        Self {
            message: message.into(),
            id_type,
            id: id.into(),
            attributes: attributes.to_vec(),
            associated: associated.into(),
            source: None,
        }
    }

    /// Attaches an underlying cause.
    pub fn with_source(mut self, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The failure description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The identifier type.
    pub fn id_type(&self) -> &IdReferenceType {
        &self.id_type
    }

    /// The offending identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The identifier's attributes.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// The carrier the identifier was associated with.
    pub fn associated(&self) -> &str {
        &self.associated
    }
}

impl From<IdReferenceHandlerError> for IdRefError {
    fn from(error: IdReferenceHandlerError) -> Self {
        IdRefError::Handler(Box::new(error))
    }
}
