//! Structural locations inside a typed object instance.
//!
//! [`JsonPath`] names the position of a value (e.g. `features[3].location`).
//! The validation walker builds one per visited value; the positional
//! reference tree and the relabeling pass use them to find identifier
//! positions again in an already-parsed document.

use std::fmt::{self, Display};

use serde_json::Value;

/// A segment of a path: a structure/mapping key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// An object key (e.g. `name`).
    Field(String),
    /// An array position (e.g. `[0]`).
    Index(usize),
}

impl PathSegment {
    /// Creates a new field segment.
    pub fn field(name: impl Into<String>) -> Self {
        PathSegment::Field(name.into())
    }

    /// Creates a new index segment.
    pub fn index(idx: usize) -> Self {
        PathSegment::Index(idx)
    }

    /// Looks up this segment directly beneath `value`.
    fn child<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        match (self, value) {
            (PathSegment::Field(name), Value::Object(map)) => map.get(name),
            (PathSegment::Index(idx), Value::Array(items)) => items.get(*idx),
            _ => None,
        }
    }

    fn child_mut<'v>(&self, value: &'v mut Value) -> Option<&'v mut Value> {
        match (self, value) {
            (PathSegment::Field(name), Value::Object(map)) => map.get_mut(name),
            (PathSegment::Index(idx), Value::Array(items)) => items.get_mut(*idx),
            _ => None,
        }
    }
}

/// A path from the instance root to a nested value.
///
/// # Example
///
/// ```rust
/// use typedobj::JsonPath;
///
/// let path = JsonPath::root()
///     .push_field("features")
///     .push_index(3)
///     .push_field("location");
///
/// assert_eq!(path.to_string(), "features[3].location");
/// assert_eq!(path.to_pointer(), "/features/3/location");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    /// Creates an empty path representing the root value.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from segments ordered root first.
    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Returns a new path with a field segment appended.
    pub fn push_field(&self, name: impl Into<String>) -> Self {
        self.push(PathSegment::Field(name.into()))
    }

    /// Returns a new path with an index segment appended.
    pub fn push_index(&self, index: usize) -> Self {
        self.push(PathSegment::Index(index))
    }

    /// Returns a new path with `segment` appended.
    pub fn push(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }

    /// Returns true if this is the root path (no segments).
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of segments in this path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if this path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns an iterator over the path segments, root first.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    /// Returns the parent path, or None if this is root.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    /// Returns the last segment, or None if this is root.
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Resolves this path against a parsed document.
    pub fn get<'v>(&self, document: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(document, |value, segment| segment.child(value))
    }

    /// Resolves this path against a parsed document for mutation.
    pub fn get_mut<'v>(&self, document: &'v mut Value) -> Option<&'v mut Value> {
        self.segments
            .iter()
            .try_fold(document, |value, segment| segment.child_mut(value))
    }

    /// Renders the path as an RFC 6901 JSON pointer.
    pub fn to_pointer(&self) -> String {
        let mut pointer = String::new();
        for segment in &self.segments {
            pointer.push('/');
            match segment {
                PathSegment::Field(name) => {
                    pointer.push_str(&name.replace('~', "~0").replace('/', "~1"));
                }
                PathSegment::Index(idx) => pointer.push_str(&idx.to_string()),
            }
        }
        pointer
    }
}

impl Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_path_is_empty() {
        let path = JsonPath::root();
        assert!(path.is_root());
        assert_eq!(path.len(), 0);
        assert_eq!(path.to_string(), "");
        assert_eq!(path.to_pointer(), "");
    }

    #[test]
    fn test_display_mixes_fields_and_indices() {
        let path = JsonPath::root()
            .push_field("contigs")
            .push_index(2)
            .push_field("id");
        assert_eq!(path.to_string(), "contigs[2].id");
    }

    #[test]
    fn test_push_leaves_base_untouched() {
        let base = JsonPath::root().push_field("refs");
        let first = base.push_index(0);
        let second = base.push_index(1);

        assert_eq!(base.to_string(), "refs");
        assert_eq!(first.to_string(), "refs[0]");
        assert_eq!(second.to_string(), "refs[1]");
    }

    #[test]
    fn test_parent_walks_to_root() {
        let path = JsonPath::root().push_field("a").push_index(1);
        let parent = path.parent().unwrap();
        assert_eq!(parent.to_string(), "a");
        assert!(parent.parent().unwrap().is_root());
        assert!(JsonPath::root().parent().is_none());
    }

    #[test]
    fn test_pointer_escapes_special_characters() {
        let path = JsonPath::root().push_field("a/b").push_field("c~d").push_index(4);
        assert_eq!(path.to_pointer(), "/a~1b/c~0d/4");

        let doc = json!({"a/b": {"c~d": [0, 1, 2, 3, "x"]}});
        assert_eq!(doc.pointer(&path.to_pointer()), Some(&json!("x")));
    }

    #[test]
    fn test_get_and_get_mut() {
        let mut doc = json!({"refs": [{"id": "1/2/3"}, {"id": "4/5/6"}]});
        let path = JsonPath::root().push_field("refs").push_index(1).push_field("id");

        assert_eq!(path.get(&doc), Some(&json!("4/5/6")));

        *path.get_mut(&mut doc).unwrap() = json!("7/8/9");
        assert_eq!(doc["refs"][1]["id"], "7/8/9");
    }

    #[test]
    fn test_get_on_wrong_shape_is_none() {
        let doc = json!({"refs": {"0": "x"}});
        let path = JsonPath::root().push_field("refs").push_index(0);
        assert!(path.get(&doc).is_none());
    }

    #[test]
    fn test_from_segments() {
        let path = JsonPath::from_segments([PathSegment::field("a"), PathSegment::index(0)]);
        assert_eq!(path, JsonPath::root().push_field("a").push_index(0));
        assert_eq!(path.last(), Some(&PathSegment::Index(0)));
    }
}
