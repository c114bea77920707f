//! The identifier registry: one handler per identifier type, a shared
//! ceiling on distinct identifiers, and the open → locked → processed
//! lifecycle.

use std::collections::HashMap;
use std::fmt::Debug;

use indexmap::IndexMap;

use crate::report::ValidationReport;

use super::{IdRefError, IdReference, IdReferenceHandler, IdReferenceType};

type HandlerMap<T> = IndexMap<IdReferenceType, Box<dyn IdReferenceHandler<T>>>;

/// Pools identifiers from many objects and resolves them as one batch.
///
/// Identifiers are attributed to whichever carrier object was most recently
/// passed to [`associate`](Self::associate). The registry counts distinct
/// identifiers (as reported by the handlers) and refuses the one that would
/// take the count past its ceiling.
///
/// # Example
///
/// ```rust
/// use typedobj::{IdReference, IdReferenceRegistry, PassThroughHandler};
///
/// let mut registry = IdReferenceRegistry::builder(2)
///     .handler("ws", PassThroughHandler::new("ws"))
///     .build();
///
/// registry.associate("object-1");
/// registry.add_id(&IdReference::new("ws", "a", vec![])).unwrap();
/// registry.add_id(&IdReference::new("ws", "b", vec![])).unwrap();
/// assert!(registry.add_id(&IdReference::new("ws", "c", vec![])).is_err());
/// assert_eq!(registry.size(), 2);
///
/// registry.process_ids().unwrap();
/// assert_eq!(registry.remapped_id(&"ws".into(), "a").unwrap(), "a");
/// ```
pub struct IdReferenceRegistry<T> {
    handlers: HandlerMap<T>,
    max_unique_ids: usize,
    unique_ids: usize,
    locked: bool,
    processed: bool,
    associated: Option<T>,
}

/// Builder fixing the handler set of an [`IdReferenceRegistry`].
pub struct IdReferenceRegistryBuilder<T> {
    handlers: HandlerMap<T>,
    max_unique_ids: usize,
}

impl<T> IdReferenceRegistryBuilder<T> {
    /// Registers the handler for an identifier type, replacing any earlier one.
    pub fn handler<H>(mut self, id_type: impl Into<IdReferenceType>, handler: H) -> Self
    where
        H: IdReferenceHandler<T> + 'static,
    {
        self.handlers.insert(id_type.into(), Box::new(handler));
        self
    }

    /// Finishes the registry; no handlers can be added afterwards.
    pub fn build(self) -> IdReferenceRegistry<T> {
        IdReferenceRegistry {
            handlers: self.handlers,
            max_unique_ids: self.max_unique_ids,
            unique_ids: 0,
            locked: false,
            processed: false,
            associated: None,
        }
    }
}

impl<T: Debug> IdReferenceRegistry<T> {
    /// Starts a registry that holds at most `max_unique_ids` distinct identifiers.
    pub fn builder(max_unique_ids: usize) -> IdReferenceRegistryBuilder<T> {
        IdReferenceRegistryBuilder {
            handlers: IndexMap::new(),
            max_unique_ids,
        }
    }

    /// Whether a handler is registered for `id_type`.
    pub fn has_handler(&self, id_type: &IdReferenceType) -> bool {
        self.handlers.contains_key(id_type)
    }

    /// Attributes all identifiers added from now on to `object`.
    pub fn associate(&mut self, object: T) -> &mut Self {
        self.associated = Some(object);
        self
    }

    /// The carrier identifiers are currently attributed to.
    pub fn associated(&self) -> Option<&T> {
        self.associated.as_ref()
    }

    /// Adds an identifier to its type's handler.
    ///
    /// # Errors
    ///
    /// - `Locked` once the registry is locked or processed
    /// - `NoAssociatedObject` if `associate` was never called
    /// - `NoHandler` if the identifier type has no handler
    /// - `TooManyIds` if this would be one distinct identifier too many; the
    ///   handler is not touched in that case
    /// - any error the handler raises
    pub fn add_id(&mut self, reference: &IdReference) -> Result<(), IdRefError> {
        if self.locked {
            return Err(IdRefError::Locked);
        }
        let associated = self.associated.as_ref().ok_or(IdRefError::NoAssociatedObject)?;
        let handler = self
            .handlers
            .get_mut(reference.id_type())
            .ok_or_else(|| IdRefError::NoHandler(reference.id_type().clone()))?;

        if self.unique_ids >= self.max_unique_ids && !handler.contains(associated, reference.id()) {
            tracing::warn!(
                max = self.max_unique_ids,
                id_type = %reference.id_type(),
                id = reference.id(),
                "rejecting ID over the distinct ID ceiling"
            );
            return Err(IdRefError::TooManyIds {
                max: self.max_unique_ids,
            });
        }

        if handler.add_id(associated, reference.id(), reference.attributes())? {
            self.unique_ids += 1;
        }
        Ok(())
    }

    /// Associates `object` and adds every reference found in `report`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing reference; see [`add_id`](Self::add_id).
    pub fn add_report(&mut self, object: T, report: &ValidationReport) -> Result<(), IdRefError> {
        self.associate(object);
        report
            .id_references()
            .iter()
            .try_for_each(|reference| self.add_id(reference))
    }

    /// Locks the registry and runs every handler's batch step.
    ///
    /// Calling this again after it succeeded does nothing. If a handler
    /// fails the registry stays locked and unprocessed.
    ///
    /// # Errors
    ///
    /// The first handler failure.
    pub fn process_ids(&mut self) -> Result<(), IdRefError> {
        if self.processed {
            return Ok(());
        }
        self.locked = true;
        tracing::debug!(
            unique_ids = self.unique_ids,
            handlers = self.handlers.len(),
            "processing ID batch"
        );
        for (id_type, handler) in self.handlers.iter_mut() {
            handler.process_ids().inspect_err(|e| {
                tracing::warn!(%id_type, error = %e, "ID batch processing failed");
            })?;
            handler.lock();
        }
        self.processed = true;
        Ok(())
    }

    /// Whether [`process_ids`](Self::process_ids) has completed.
    pub fn ids_processed(&self) -> bool {
        self.processed
    }

    /// Translates an identifier to its remapped form.
    ///
    /// # Errors
    ///
    /// `NoHandler`, `NotProcessed`, or the handler's `NoSuchId`.
    pub fn remapped_id(&self, id_type: &IdReferenceType, old_id: &str) -> Result<String, IdRefError> {
        let handler = self
            .handlers
            .get(id_type)
            .ok_or_else(|| IdRefError::NoHandler(id_type.clone()))?;
        if !self.processed {
            return Err(IdRefError::NotProcessed);
        }
        handler.remapped_id(old_id)
    }

    /// Builds the raw id → remapped id table for one report's references.
    ///
    /// # Errors
    ///
    /// The first reference that cannot be remapped.
    pub fn remap_report(&self, report: &ValidationReport) -> Result<HashMap<String, String>, IdRefError> {
        report
            .id_references()
            .iter()
            .map(|r| Ok((r.id().to_string(), self.remapped_id(r.id_type(), r.id())?)))
            .collect()
    }

    /// Locks the registry and every handler without processing.
    pub fn lock(&mut self) -> &mut Self {
        self.locked = true;
        for handler in self.handlers.values_mut() {
            handler.lock();
        }
        self
    }

    /// Whether new identifiers are refused.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The distinct identifier ceiling.
    pub fn max_unique_ids(&self) -> usize {
        self.max_unique_ids
    }

    /// Number of distinct identifiers accepted so far.
    pub fn size(&self) -> usize {
        self.unique_ids
    }

    /// True when no identifiers have been accepted.
    pub fn is_empty(&self) -> bool {
        self.unique_ids == 0
    }
}
