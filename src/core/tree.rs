//! core::tree
//!
//! Namespace tree arena.
//!
//! # Architecture
//!
//! The namespace tree is the backbone every registry entity references into.
//! Nodes are stored in a single-owner arena keyed by path; the parent is a
//! key reference and children are kept in a derived reverse-edge index that
//! is maintained on insert. No node holds a pointer to another node, so the
//! bidirectional shape of the namespace graph involves no ownership cycles.
//!
//! # Invariants
//!
//! - The parent of node `P` is the node whose path equals `P` with the final
//!   `:segment` stripped, or absent if `P` has no colon.
//! - Every ancestor of a stored node is itself stored (creation cascades).

use std::collections::{BTreeSet, HashMap};

use super::types::Mrn;

/// A single namespace node. Identity is the path; everything else hangs off
/// the arena's indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceNode {
    /// Full colon-delimited path, unique within the tree.
    pub path: Mrn,
    /// Path of the parent node, absent for single-segment roots.
    pub parent: Option<Mrn>,
}

/// Arena of namespace nodes keyed by path.
#[derive(Debug, Default)]
pub struct NamespaceTree {
    nodes: HashMap<String, NamespaceNode>,
    /// Reverse edges, sorted for deterministic traversal order.
    children: HashMap<String, BTreeSet<String>>,
}

impl NamespaceTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact lookup, no traversal and no side effects.
    pub fn find(&self, path: &Mrn) -> Option<&NamespaceNode> {
        self.nodes.get(path.as_str())
    }

    /// Whether a node exists for the exact path.
    pub fn contains(&self, path: &Mrn) -> bool {
        self.nodes.contains_key(path.as_str())
    }

    /// Idempotently return the node for `path`, creating it and every
    /// missing ancestor. Cascading creation is expected and is not an error.
    ///
    /// # Example
    ///
    /// ```
    /// use mrn_registry::core::tree::NamespaceTree;
    /// use mrn_registry::core::types::Mrn;
    ///
    /// let mut tree = NamespaceTree::new();
    /// tree.get_or_create(&Mrn::new("urn:mrn:test").unwrap());
    ///
    /// assert!(tree.contains(&Mrn::new("urn").unwrap()));
    /// assert!(tree.contains(&Mrn::new("urn:mrn").unwrap()));
    /// assert!(tree.contains(&Mrn::new("urn:mrn:test").unwrap()));
    /// ```
    pub fn get_or_create(&mut self, path: &Mrn) -> &NamespaceNode {
        if !self.nodes.contains_key(path.as_str()) {
            let parent = path.parent();
            if let Some(ref parent_path) = parent {
                self.get_or_create(parent_path);
                self.children
                    .entry(parent_path.as_str().to_string())
                    .or_default()
                    .insert(path.as_str().to_string());
            }
            self.nodes.insert(
                path.as_str().to_string(),
                NamespaceNode {
                    path: path.clone(),
                    parent,
                },
            );
        }
        &self.nodes[path.as_str()]
    }

    /// Direct children of a node, in path order.
    pub fn children(&self, path: &Mrn) -> impl Iterator<Item = &NamespaceNode> {
        self.children
            .get(path.as_str())
            .into_iter()
            .flatten()
            .filter_map(|child| self.nodes.get(child))
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
