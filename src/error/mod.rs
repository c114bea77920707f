//! Error types for structural validation failures.
//!
//! Module-specific failures (type resolution, identifier handling,
//! relabeling) live beside the code that raises them.

mod schema_error;

pub use schema_error::{SchemaError, SchemaErrors};
