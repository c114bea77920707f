//! Rewrites identifier positions of an already validated document.
//!
//! The report's positional tree says where each identifier sits; relabeling
//! replaces the value at each such position with its remapped form. All
//! positions are checked before any is written, so a failed relabel leaves
//! the document as it was.

use std::collections::HashMap;

use serde_json::Value;

use crate::path::JsonPath;
use crate::report::ValidationReport;

/// Why a document could not be relabeled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelabelError {
    /// An identifier found during validation has no remapped value.
    #[error("no remapped value for ID {id} at {path}")]
    UnresolvedId {
        /// The raw identifier.
        id: String,
        /// Where it was found.
        path: JsonPath,
    },

    /// The document has no value where an identifier was found.
    #[error("no value at {0}; is this the validated document?")]
    PathNotFound(JsonPath),

    /// The value at an identifier position is not the identifier.
    #[error("value at {path} is not the ID {id}")]
    ValueMismatch {
        /// The raw identifier.
        id: String,
        /// Where it was found.
        path: JsonPath,
    },

    /// The report carries no remapping table.
    #[error("no remapped IDs have been attached to the report")]
    NoMapping,
}

/// Replaces every identifier `report` found in `document` with its value in
/// `absolute_ids` (keyed by raw identifier).
///
/// Positions already holding the remapped value are left alone, so relabeling
/// twice with the same table is harmless. Returns the number of positions
/// written.
///
/// # Errors
///
/// The first position that cannot be relabeled; nothing is written then.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use serde_json::json;
/// use typedobj::{engine, relabel, CompiledSchema};
///
/// let schema = CompiledSchema::compile(
///     "Mod.Thing-1.0".parse().unwrap(),
///     r#"{"type": "object", "properties": {
///         "ref": {"type": "string", "id-reference": {"id-type": "ws"}}
///     }}"#,
/// )
/// .unwrap();
///
/// let mut doc = json!({"ref": "ws/obj"});
/// let report = engine::validate(&doc, &schema, 10).unwrap();
/// let ids = HashMap::from([("ws/obj".to_string(), "3/7/1".to_string())]);
///
/// assert_eq!(relabel(&mut doc, &report, &ids).unwrap(), 1);
/// assert_eq!(doc, json!({"ref": "3/7/1"}));
/// ```
pub fn relabel(
    document: &mut Value,
    report: &ValidationReport,
    absolute_ids: &HashMap<String, String>,
) -> Result<usize, RelabelError> {
    let references = report.id_references();
    let mut plan: Vec<(JsonPath, &str)> = Vec::with_capacity(references.len());

    for (path, indices) in report.id_tree().located_references() {
        for &idx in indices {
            let Some(reference) = references.get(idx) else {
                continue;
            };
            let id = reference.id();
            let resolved = absolute_ids.get(id).ok_or_else(|| RelabelError::UnresolvedId {
                id: id.to_string(),
                path: path.clone(),
            })?;
            match path.get(document) {
                None => return Err(RelabelError::PathNotFound(path)),
                Some(Value::String(current)) if current == resolved => {}
                Some(Value::String(current)) if current == id => {
                    plan.push((path.clone(), resolved.as_str()));
                }
                Some(_) => {
                    return Err(RelabelError::ValueMismatch {
                        id: id.to_string(),
                        path,
                    })
                }
            }
        }
    }

    let mut written = 0;
    for (path, resolved) in plan {
        if let Some(slot) = path.get_mut(document) {
            *slot = Value::String(resolved.to_string());
            written += 1;
        }
    }
    tracing::debug!(type_def = %report.type_def(), written, "relabeled document");
    Ok(written)
}
