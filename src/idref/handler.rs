//! The per-type identifier handler capability.

use super::IdRefError;

/// Checks, batches and remaps identifiers of one type.
///
/// Identifiers are added with the carrier object they came from, so that a
/// whole batch of objects can be resolved at once while errors still point at
/// the object responsible. `T` is the carrier type.
///
/// Lifecycle: `add_id` any number of times, then `process_ids` once the batch
/// is complete, then `remapped_id` lookups. After `lock` no further
/// identifiers are accepted.
///
/// # Example
///
/// ```rust
/// use typedobj::{IdReferenceHandler, PassThroughHandler};
///
/// let mut handler = PassThroughHandler::<u32>::new("kb");
/// assert!(handler.add_id(&1, "abc", &[]).unwrap());
/// assert!(!handler.add_id(&1, "abc", &[]).unwrap());
///
/// handler.process_ids().unwrap();
/// handler.lock();
/// assert_eq!(handler.remapped_id("abc").unwrap(), "abc");
/// ```
pub trait IdReferenceHandler<T>: Send {
    /// Adds an identifier for `associated`.
    ///
    /// Returns true if this is a new distinct identifier for that carrier and
    /// so counts toward the registry's ceiling.
    ///
    /// # Errors
    ///
    /// `HandlerLocked` after `lock`; `Handler` when the identifier or its
    /// attributes are unacceptable.
    fn add_id(&mut self, associated: &T, id: &str, attributes: &[String]) -> Result<bool, IdRefError>;

    /// Whether `(associated, id)` has already been added.
    fn contains(&self, associated: &T, id: &str) -> bool;

    /// Resolves the accumulated identifiers in one batch.
    ///
    /// # Errors
    ///
    /// `Handler` when an identifier cannot be resolved.
    fn process_ids(&mut self) -> Result<(), IdRefError>;

    /// Translates an identifier to its remapped form.
    ///
    /// # Errors
    ///
    /// `NoSuchId` if the identifier was never added or not yet resolved.
    fn remapped_id(&self, old_id: &str) -> Result<String, IdRefError>;

    /// Rejects any further identifiers.
    fn lock(&mut self);
}
