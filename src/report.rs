//! The outcome of validating one instance.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::SchemaError;
use crate::idref::{IdRefTree, IdReference};
use crate::path::JsonPath;
use crate::relabel::{self, RelabelError};
use crate::typedef::AbsoluteTypeDefId;

/// Errors, extracted identifiers, and searchable subset of one instance.
///
/// A report is read-only except for attaching the identifier remapping
/// computed for it, which [`relabel`](Self::relabel) then applies.
///
/// # Example
///
/// ```rust
/// use typedobj::{engine, CompiledSchema};
///
/// let schema = CompiledSchema::compile(
///     "Mod.Thing-1.0".parse().unwrap(),
///     r#"{"type": "object", "properties": {
///         "ref": {"type": "string", "id-reference": {"id-type": "ws"}}
///     }}"#,
/// )
/// .unwrap();
///
/// let report = engine::validate(r#"{"ref": "ws/obj"}"#, &schema, 10).unwrap();
/// assert!(report.is_valid());
/// assert_eq!(report.id_references()[0].id(), "ws/obj");
/// assert_eq!(report.id_reference_paths()[0].to_string(), "ref");
/// ```
#[derive(Debug, Clone)]
pub struct ValidationReport {
    type_def: AbsoluteTypeDefId,
    errors: Vec<SchemaError>,
    searchable_subset: Option<Value>,
    id_references: Vec<IdReference>,
    id_tree: IdRefTree,
    absolute_ids: Option<HashMap<String, String>>,
}

impl ValidationReport {
    pub(crate) fn new(
        type_def: AbsoluteTypeDefId,
        errors: Vec<SchemaError>,
        searchable_subset: Option<Value>,
        id_references: Vec<IdReference>,
        id_tree: IdRefTree,
    ) -> Self {
        Self {
            type_def,
            errors,
            searchable_subset,
            id_references,
            id_tree,
            absolute_ids: None,
        }
    }

    /// True iff no errors were found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors in document order.
    pub fn errors(&self) -> &[SchemaError] {
        &self.errors
    }

    /// Errors rendered as text.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// The searchable fields of the instance, or `None` when the schema
    /// declares none.
    pub fn searchable_subset(&self) -> Option<&Value> {
        self.searchable_subset.as_ref()
    }

    /// The exact type version the instance was validated against.
    pub fn type_def(&self) -> &AbsoluteTypeDefId {
        &self.type_def
    }

    /// Identifiers in document order.
    pub fn id_references(&self) -> &[IdReference] {
        &self.id_references
    }

    /// Where each identifier was found.
    pub fn id_tree(&self) -> &IdRefTree {
        &self.id_tree
    }

    /// The location of each entry of [`id_references`](Self::id_references),
    /// index for index.
    pub fn id_reference_paths(&self) -> Vec<JsonPath> {
        let mut paths = vec![JsonPath::root(); self.id_references.len()];
        for (path, indices) in self.id_tree.located_references() {
            for &idx in indices {
                if let Some(slot) = paths.get_mut(idx) {
                    *slot = path.clone();
                }
            }
        }
        paths
    }

    /// Attaches the raw id → remapped id table used by [`relabel`](Self::relabel).
    pub fn set_absolute_id_references(&mut self, absolute_ids: HashMap<String, String>) {
        self.absolute_ids = Some(absolute_ids);
    }

    /// The attached remapping table, if any.
    pub fn absolute_id_references(&self) -> Option<&HashMap<String, String>> {
        self.absolute_ids.as_ref()
    }

    /// Rewrites the identifiers in `document` using the attached table.
    ///
    /// `document` must be the instance this report was produced from.
    /// Returns how many positions were rewritten.
    ///
    /// # Errors
    ///
    /// [`RelabelError::NoMapping`] when no table is attached, otherwise see
    /// [`relabel::relabel`].
    pub fn relabel(&self, document: &mut Value) -> Result<usize, RelabelError> {
        let absolute_ids = self.absolute_ids.as_ref().ok_or(RelabelError::NoMapping)?;
        relabel::relabel(document, self, absolute_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathSegment;

    fn report() -> ValidationReport {
        let mut tree = IdRefTree::new();
        tree.insert(&JsonPath::root().push_field("b"), 0);
        tree.insert(&JsonPath::root().push_field("a").push_index(1), 1);
        ValidationReport::new(
            "M.T-1.0".parse().unwrap(),
            vec![SchemaError::new(JsonPath::root().push_field("x"), "bad")],
            None,
            vec![
                IdReference::new("ws", "1/1", vec![]),
                IdReference::new("ws", "2/2", vec![]),
            ],
            tree,
        )
    }

    #[test]
    fn test_validity_follows_errors() {
        let report = report();
        assert!(!report.is_valid());
        assert_eq!(report.error_messages(), ["x: bad"]);
        assert_eq!(report.type_def().to_string(), "M.T-1.0");
        assert!(report.searchable_subset().is_none());
    }

    #[test]
    fn test_paths_match_reference_order() {
        let paths = report().id_reference_paths();
        assert_eq!(paths[0], JsonPath::from_segments([PathSegment::field("b")]));
        assert_eq!(paths[1].to_string(), "a[1]");
    }

    #[test]
    fn test_relabel_needs_table() {
        let mut report = report();
        let mut doc = serde_json::json!({"b": "1/1", "a": [0, "2/2"]});
        assert!(matches!(report.relabel(&mut doc), Err(RelabelError::NoMapping)));

        report.set_absolute_id_references(HashMap::from([
            ("1/1".to_string(), "10/1/1".to_string()),
            ("2/2".to_string(), "20/2/1".to_string()),
        ]));
        assert_eq!(report.relabel(&mut doc).unwrap(), 2);
        assert_eq!(doc, serde_json::json!({"b": "10/1/1", "a": [0, "20/2/1"]}));
    }
}
