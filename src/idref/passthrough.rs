//! A handler that accepts identifiers verbatim.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use super::{IdRefError, IdReferenceHandler, IdReferenceHandlerError, IdReferenceType};

/// Accepts any non-empty identifier and remaps it to itself.
///
/// Suitable for identifier types that only need to be collected (e.g. for
/// indexing) but not rewritten.
pub struct PassThroughHandler<T> {
    id_type: IdReferenceType,
    seen: HashSet<(T, String)>,
    ids: HashSet<String>,
    locked: bool,
    processed: bool,
}

impl<T> PassThroughHandler<T> {
    /// Creates a handler for the given identifier type.
    pub fn new(id_type: impl Into<IdReferenceType>) -> Self {
        Self {
            id_type: id_type.into(),
            seen: HashSet::new(),
            ids: HashSet::new(),
            locked: false,
            processed: false,
        }
    }
}

impl<T> IdReferenceHandler<T> for PassThroughHandler<T>
where
    T: Clone + Eq + Hash + Debug + Send,
{
    fn add_id(&mut self, associated: &T, id: &str, attributes: &[String]) -> Result<bool, IdRefError> {
        if self.locked {
            return Err(IdRefError::HandlerLocked(self.id_type.clone()));
        }
        if id.trim().is_empty() {
            return Err(IdReferenceHandlerError::new(
                "IDs may not be empty or whitespace",
                self.id_type.clone(),
                format!("{associated:?}"),
                id,
                attributes,
            )
            .into());
        }
        self.ids.insert(id.to_string());
        Ok(self.seen.insert((associated.clone(), id.to_string())))
    }

    fn contains(&self, associated: &T, id: &str) -> bool {
        self.seen.contains(&(associated.clone(), id.to_string()))
    }

    fn process_ids(&mut self) -> Result<(), IdRefError> {
        self.processed = true;
        Ok(())
    }

    fn remapped_id(&self, old_id: &str) -> Result<String, IdRefError> {
        if self.processed && self.ids.contains(old_id) {
            Ok(old_id.to_string())
        } else {
            Err(IdRefError::NoSuchId {
                id_type: self.id_type.clone(),
                id: old_id.to_string(),
            })
        }
    }

    fn lock(&mut self) {
        self.locked = true;
    }
}
