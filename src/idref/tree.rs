//! Positional tree of identifier occurrences.
//!
//! Nodes live in an arena and point at each other by [`NodeId`]; only paths
//! that lead to an identifier get nodes. Each node holds indices into the
//! owning report's reference list.

use indexmap::IndexMap;

use crate::path::{JsonPath, PathSegment};

/// Index of a node in an [`IdRefTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node.
    pub const ROOT: NodeId = NodeId(0);
}

/// One structural location in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRefNode {
    segment: Option<PathSegment>,
    parent: Option<NodeId>,
    children: IndexMap<PathSegment, NodeId>,
    references: Vec<usize>,
}

impl IdRefNode {
    fn new(segment: Option<PathSegment>, parent: Option<NodeId>) -> Self {
        Self {
            segment,
            parent,
            children: IndexMap::new(),
            references: Vec::new(),
        }
    }

    /// The segment leading from the parent to this node; `None` for the root.
    pub fn segment(&self) -> Option<&PathSegment> {
        self.segment.as_ref()
    }

    /// The parent node; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in the order they were first reached.
    pub fn children(&self) -> impl Iterator<Item = (&PathSegment, NodeId)> {
        self.children.iter().map(|(segment, id)| (segment, *id))
    }

    /// Indices of the references found exactly here.
    pub fn references(&self) -> &[usize] {
        &self.references
    }
}

/// Arena-backed tree mirroring the instance at identifier positions.
///
/// # Example
///
/// ```rust
/// use typedobj::{IdRefTree, JsonPath};
///
/// let mut tree = IdRefTree::new();
/// let node = tree.insert(&JsonPath::root().push_field("refs").push_index(0), 0);
///
/// assert_eq!(tree.path_of(node).to_string(), "refs[0]");
/// assert_eq!(tree.reference_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRefTree {
    nodes: Vec<IdRefNode>,
    reference_count: usize,
}

impl IdRefTree {
    /// Creates a tree holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![IdRefNode::new(None, None)],
            reference_count: 0,
        }
    }

    /// Files reference `reference` at `path`, creating missing nodes.
    pub fn insert(&mut self, path: &JsonPath, reference: usize) -> NodeId {
        let mut current = NodeId::ROOT;
        for segment in path.segments() {
            current = match self.nodes[current.0].children.get(segment) {
                Some(&child) => child,
                None => {
                    let child = NodeId(self.nodes.len());
                    self.nodes
                        .push(IdRefNode::new(Some(segment.clone()), Some(current)));
                    self.nodes[current.0].children.insert(segment.clone(), child);
                    child
                }
            };
        }
        self.nodes[current.0].references.push(reference);
        self.reference_count += 1;
        current
    }

    /// The root node.
    pub fn root(&self) -> &IdRefNode {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&IdRefNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of references filed in the tree.
    pub fn reference_count(&self) -> usize {
        self.reference_count
    }

    /// Reconstructs the path of a node.
    pub fn path_of(&self, id: NodeId) -> JsonPath {
        let mut segments = Vec::new();
        let mut cursor = self.nodes.get(id.0);
        while let Some(node) = cursor {
            if let Some(segment) = &node.segment {
                segments.push(segment.clone());
            }
            cursor = node.parent.and_then(|p| self.nodes.get(p.0));
        }
        segments.reverse();
        JsonPath::from_segments(segments)
    }

    /// Visits every node holding references, depth first in document order.
    pub fn located_references(&self) -> Vec<(JsonPath, &[usize])> {
        let mut out = Vec::new();
        self.walk(NodeId::ROOT, &JsonPath::root(), &mut out);
        out
    }

    fn walk<'t>(&'t self, id: NodeId, path: &JsonPath, out: &mut Vec<(JsonPath, &'t [usize])>) {
        let node = &self.nodes[id.0];
        if !node.references.is_empty() {
            out.push((path.clone(), node.references.as_slice()));
        }
        for (segment, child) in &node.children {
            self.walk(*child, &path.push(segment.clone()), out);
        }
    }
}

impl Default for IdRefTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree() {
        let tree = IdRefTree::new();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.reference_count(), 0);
        assert!(tree.root().segment().is_none());
        assert!(tree.located_references().is_empty());
    }

    #[test]
    fn test_shared_prefixes_share_nodes() {
        let mut tree = IdRefTree::new();
        let base = JsonPath::root().push_field("features");
        tree.insert(&base.push_index(0).push_field("ref"), 0);
        tree.insert(&base.push_index(1).push_field("ref"), 1);
        tree.insert(&base.push_index(1).push_field("ref"), 2);

        // root, features, [0], [0].ref, [1], [1].ref
        assert_eq!(tree.node_count(), 6);
        assert_eq!(tree.reference_count(), 3);

        let located = tree.located_references();
        assert_eq!(located.len(), 2);
        assert_eq!(located[0].0.to_string(), "features[0].ref");
        assert_eq!(located[0].1, &[0]);
        assert_eq!(located[1].0.to_string(), "features[1].ref");
        assert_eq!(located[1].1, &[1, 2]);
    }

    #[test]
    fn test_path_of_and_parents() {
        let mut tree = IdRefTree::new();
        let leaf = tree.insert(&JsonPath::root().push_field("a").push_field("b"), 0);
        assert_eq!(tree.path_of(leaf).to_string(), "a.b");

        let parent = tree.node(leaf).unwrap().parent().unwrap();
        assert_eq!(tree.path_of(parent).to_string(), "a");
        assert_eq!(tree.node(parent).unwrap().parent(), Some(NodeId::ROOT));
        assert_eq!(tree.path_of(NodeId::ROOT), JsonPath::root());
    }

    #[test]
    fn test_reference_at_root() {
        let mut tree = IdRefTree::new();
        tree.insert(&JsonPath::root(), 7);
        assert_eq!(tree.root().references(), &[7]);
        assert_eq!(tree.located_references()[0].0, JsonPath::root());
    }
}
