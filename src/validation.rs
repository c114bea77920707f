//! Per-run state of the validation walker.
//!
//! [`ValidationContext`] is threaded through one traversal of one instance.
//! It tracks the current location, enforces the error budget, and collects
//! identifier references together with their positional tree.

use crate::error::SchemaError;
use crate::idref::{IdRefTree, IdReference};
use crate::path::{JsonPath, PathSegment};
use crate::schema::IdReferenceSpec;

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// The value passed; descend into it.
    Continue,
    /// A violation was recorded; skip the value's contents.
    Recorded,
    /// The error budget is exhausted; stop the whole traversal.
    Abort,
}

/// Mutable state shared by every level of one traversal.
#[derive(Debug)]
pub(crate) struct ValidationContext {
    path: Vec<PathSegment>,
    errors: Vec<SchemaError>,
    max_errors: usize,
    aborted: bool,
    references: Vec<IdReference>,
    tree: IdRefTree,
}

impl ValidationContext {
    /// Creates a context that stops at the `max_errors`-th violation.
    pub(crate) fn new(max_errors: usize) -> Self {
        Self {
            path: Vec::new(),
            errors: Vec::new(),
            max_errors,
            aborted: false,
            references: Vec::new(),
            tree: IdRefTree::new(),
        }
    }

    /// Descends into a child location.
    pub(crate) fn enter(&mut self, segment: PathSegment) {
        self.path.push(segment);
    }

    /// Returns to the parent location.
    pub(crate) fn leave(&mut self) {
        self.path.pop();
    }

    /// The current location.
    pub(crate) fn path(&self) -> JsonPath {
        JsonPath::from_segments(self.path.iter().cloned())
    }

    /// The current location extended by one field.
    pub(crate) fn field_path(&self, name: &str) -> JsonPath {
        self.path().push_field(name)
    }

    /// Records a violation against the budget.
    ///
    /// The violation that reaches the budget is not kept; it ends the walk.
    pub(crate) fn record(&mut self, error: SchemaError) -> Step {
        if self.aborted {
            return Step::Abort;
        }
        if self.errors.len() + 1 >= self.max_errors {
            tracing::debug!(
                max_errors = self.max_errors,
                path = %error.path,
                "error budget exhausted, aborting validation"
            );
            self.aborted = true;
            return Step::Abort;
        }
        self.errors.push(error);
        Step::Recorded
    }

    /// Whether the budget has been exhausted.
    pub(crate) fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Files an identifier found at the current location.
    pub(crate) fn add_reference(&mut self, spec: &IdReferenceSpec, id: &str) {
        let index = self.references.len();
        self.references.push(IdReference::new(
            spec.id_type().clone(),
            id,
            spec.attributes().to_vec(),
        ));
        self.tree.insert(&self.path(), index);
    }

    /// Records a fault of the input itself, outside the budget.
    pub(crate) fn record_malformed(&mut self, message: impl Into<String>) {
        self.errors.push(
            SchemaError::new(JsonPath::root(), message).with_code("malformed_instance"),
        );
    }

    /// Consumes the context into errors, references and their tree.
    pub(crate) fn finish(self) -> (Vec<SchemaError>, Vec<IdReference>, IdRefTree) {
        (self.errors, self.references, self.tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(ctx: &ValidationContext) -> SchemaError {
        SchemaError::new(ctx.path(), "bad").with_code("invalid_type")
    }

    #[test]
    fn test_budget_stops_before_recording_last() {
        let mut ctx = ValidationContext::new(3);
        assert_eq!(ctx.record(violation(&ctx)), Step::Recorded);
        assert_eq!(ctx.record(violation(&ctx)), Step::Recorded);
        assert_eq!(ctx.record(violation(&ctx)), Step::Abort);
        assert!(ctx.is_aborted());
        assert_eq!(ctx.record(violation(&ctx)), Step::Abort);

        let (errors, _, _) = ctx.finish();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_paths_follow_enter_and_leave() {
        let mut ctx = ValidationContext::new(10);
        ctx.enter(PathSegment::field("a"));
        ctx.enter(PathSegment::index(2));
        assert_eq!(ctx.path().to_string(), "a[2]");
        assert_eq!(ctx.field_path("b").to_string(), "a[2].b");
        ctx.leave();
        ctx.leave();
        assert!(ctx.path().is_root());
    }

    #[test]
    fn test_references_are_filed_by_position() {
        let mut ctx = ValidationContext::new(10);
        let schema = crate::schema::CompiledSchema::compile(
            "M.T-1.0".parse().unwrap(),
            r#"{"type": "object", "properties": {
                "r": {"type": "string", "id-reference": {"id-type": "ws", "attributes": ["M.X"]}}
            }}"#,
        )
        .unwrap();
        let crate::schema::SchemaKind::Structure(structure) = schema.root().kind() else {
            panic!("expected structure");
        };
        let (_, field) = structure.field("r").unwrap();
        let spec = field.schema().id_reference().unwrap();

        ctx.enter(PathSegment::field("r"));
        ctx.add_reference(spec, "1/2/3");
        ctx.leave();

        let (_, references, tree) = ctx.finish();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].attributes(), ["M.X".to_string()]);
        let located = tree.located_references();
        assert_eq!(located[0].0.to_string(), "r");
        assert_eq!(located[0].1, [0]);
    }
}
