//! Key-indexed tree built from a run's records.
//!
//! The tree has one level per key. The root has no key; nodes keyed by
//! levels `0..H-2` are index nodes, nodes keyed by level `H-2` are structure
//! nodes, and every record becomes a leaf keyed by its discriminator.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`].
//!
//! # Invariants
//!
//! - Children are kept in sibling order (see [`Key`]'s `Ord`).
//! - Index and structure nodes are unique among their siblings by key.
//! - Leaves are never merged: two records with the same full path become two
//!   leaves, and the duplicate detector reports them.
//! - Nodes are only ever appended; nothing is removed after insertion.

use crate::record::{Key, KeyShape, KeyWidthMismatch, Record};

/// Index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Role of a node, determined by its depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    /// Keyed by one of levels `0..H-2`; children are index or structure nodes.
    Index,
    /// Keyed by level `H-2`; children are leaves.
    Structure,
    /// Keyed by the discriminator; refers to a record owned by the tree.
    Leaf { record: usize },
}

/// One node of the tree.
#[derive(Debug)]
pub struct Node {
    key: Option<Key>,
    kind: NodeKind,
    parent: Option<NodeId>,
    depth: usize,
    children: Vec<NodeId>,
}

impl Node {
    /// The node's own key; `None` only for the root.
    #[must_use]
    pub const fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Distance from the root; a node at depth `d` is keyed by level `d - 1`.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Children in sibling order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// The key-indexed tree for one compilation run.
#[derive(Debug)]
pub struct LutTree {
    shape: KeyShape,
    nodes: Vec<Node>,
    records: Vec<Record>,
}

impl LutTree {
    /// Id of the root node.
    pub const ROOT: NodeId = NodeId(0);

    /// Create an empty tree for records of the given shape.
    #[must_use]
    pub fn new(shape: KeyShape) -> Self {
        Self {
            shape,
            nodes: vec![Node {
                key: None,
                kind: NodeKind::Root,
                parent: None,
                depth: 0,
                children: Vec::new(),
            }],
            records: Vec::new(),
        }
    }

    /// Build a tree from records, failing on the first shape mismatch.
    pub fn from_records<I>(shape: KeyShape, records: I) -> Result<Self, KeyWidthMismatch>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut tree = Self::new(shape);
        for record in records {
            tree.insert(record)?;
        }
        Ok(tree)
    }

    /// Insert a record, returning the id of its new leaf.
    ///
    /// Index and structure nodes along the record's path are reused when a
    /// sibling with the same key exists and created otherwise. The leaf is
    /// always new.
    ///
    /// # Errors
    ///
    /// Returns [`KeyWidthMismatch`] without modifying the tree if the record
    /// does not match the tree's key shape.
    pub fn insert(&mut self, record: Record) -> Result<NodeId, KeyWidthMismatch> {
        self.shape.validate(&record)?;

        let structure_level = self.shape.structure_level();
        let mut current = Self::ROOT;
        for level in 0..=structure_level {
            let key = &record.keys[level];
            let found = self.nodes[current.0]
                .children
                .binary_search_by(|&child| self.nodes[child.0].key.as_ref().cmp(&Some(key)));
            current = match found {
                Ok(position) => self.nodes[current.0].children[position],
                Err(position) => {
                    let kind = if level == structure_level {
                        NodeKind::Structure
                    } else {
                        NodeKind::Index
                    };
                    self.attach(current, position, key.clone(), kind)
                }
            };
        }

        let discriminator = &record.keys[self.shape.height() - 1];
        // Equal discriminators stay in insertion order after their peers.
        let position = self.nodes[current.0]
            .children
            .partition_point(|&child| self.nodes[child.0].key.as_ref() <= Some(discriminator));
        let kind = NodeKind::Leaf {
            record: self.records.len(),
        };
        let leaf = self.attach(current, position, discriminator.clone(), kind);
        self.records.push(record);
        Ok(leaf)
    }

    fn attach(&mut self, parent: NodeId, position: usize, key: Key, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(Node {
            key: Some(key),
            kind,
            parent: Some(parent),
            depth,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.insert(position, id);
        id
    }

    #[must_use]
    pub const fn shape(&self) -> &KeyShape {
        &self.shape
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// The record behind a leaf, or `None` for other nodes.
    #[must_use]
    pub fn record(&self, id: NodeId) -> Option<&Record> {
        match self.nodes[id.0].kind {
            NodeKind::Leaf { record } => self.records.get(record),
            _ => None,
        }
    }

    /// All records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records (leaves).
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len() is not const-stable
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::is_empty() is not const-stable
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of nodes including the root.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len() is not const-stable
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Ids of all structure nodes, in depth-first sibling order.
    #[must_use]
    pub fn structure_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.kind == NodeKind::Structure {
                out.push(id);
                continue;
            }
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Concatenation of every key from the root down to `id`.
    #[must_use]
    pub fn full_path(&self, id: NodeId) -> Vec<u8> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.0];
            if let Some(key) = &node.key {
                chain.push(key.as_bytes());
            }
            cursor = node.parent;
        }
        chain.iter().rev().flat_map(|k| k.iter().copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(widths: &[usize]) -> KeyShape {
        KeyShape::new(widths.to_vec()).expect("valid shape")
    }

    fn rec(keys: &[u64], widths: &[usize], payload: u8) -> Record {
        Record::new(
            keys.iter()
                .zip(widths)
                .map(|(&k, &w)| Key::from_uint(k, w))
                .collect(),
            vec![payload],
            0,
        )
    }

    fn child_keys(tree: &LutTree, id: NodeId) -> Vec<Key> {
        tree.children(id)
            .iter()
            .filter_map(|&c| tree.node(c).key().cloned())
            .collect()
    }

    #[test]
    fn test_structure_nodes_are_shared() {
        let w = [4, 4];
        let mut tree = LutTree::new(shape(&w));
        tree.insert(rec(&[1, 0x0A], &w, 0x11)).expect("insert");
        tree.insert(rec(&[1, 0x0B], &w, 0x22)).expect("insert");
        tree.insert(rec(&[2, 0x0A], &w, 0x33)).expect("insert");

        let structures = tree.children(LutTree::ROOT).to_vec();
        assert_eq!(structures.len(), 2);
        assert_eq!(tree.node(structures[0]).kind(), NodeKind::Structure);
        assert_eq!(
            child_keys(&tree, structures[0]),
            vec![Key::from_uint(0x0A, 4), Key::from_uint(0x0B, 4)]
        );
        assert_eq!(child_keys(&tree, structures[1]), vec![Key::from_uint(0x0A, 4)]);

        let leaf = tree.children(structures[1])[0];
        assert_eq!(tree.record(leaf).map(|r| r.payload.clone()), Some(vec![0x33]));
        assert_eq!(tree.full_path(leaf), vec![2, 0, 0, 0, 0x0A, 0, 0, 0]);
    }

    #[test]
    fn test_equal_leaves_are_not_merged() {
        let w = [2, 2];
        let mut tree = LutTree::new(shape(&w));
        let first = tree.insert(rec(&[1, 5], &w, 1)).expect("insert");
        let second = tree.insert(rec(&[1, 5], &w, 2)).expect("insert");

        let structure = tree.children(LutTree::ROOT)[0];
        assert_eq!(tree.children(structure), &[first, second]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_index_levels_for_taller_shapes() {
        let w = [1, 2, 4];
        let mut tree = LutTree::new(shape(&w));
        tree.insert(rec(&[3, 1, 1], &w, 0)).expect("insert");
        tree.insert(rec(&[3, 2, 1], &w, 0)).expect("insert");
        tree.insert(rec(&[1, 1, 1], &w, 0)).expect("insert");

        let index = tree.children(LutTree::ROOT).to_vec();
        assert_eq!(child_keys(&tree, LutTree::ROOT), vec![Key::from_uint(1, 1), Key::from_uint(3, 1)]);
        assert_eq!(tree.node(index[0]).kind(), NodeKind::Index);
        assert_eq!(tree.children(index[1]).len(), 2);
        assert_eq!(tree.structure_nodes().len(), 3);
        // root + 2 index + 3 structure + 3 leaves
        assert_eq!(tree.node_count(), 9);
    }

    #[test]
    fn test_shape_independent_of_insertion_order() {
        let w = [2, 1];
        let records: Vec<Record> = [[5, 1], [1, 2], [0x100, 3], [1, 1], [5, 0]]
            .iter()
            .map(|k| rec(k, &w, 0))
            .collect();

        let forward = LutTree::from_records(shape(&w), records.clone()).expect("build");
        let backward = LutTree::from_records(shape(&w), records.into_iter().rev()).expect("build");

        let paths = |tree: &LutTree| -> Vec<Vec<u8>> {
            tree.structure_nodes()
                .into_iter()
                .flat_map(|s| tree.children(s).to_vec())
                .map(|leaf| tree.full_path(leaf))
                .collect()
        };
        assert_eq!(paths(&forward), paths(&backward));
        assert_eq!(
            child_keys(&forward, LutTree::ROOT),
            vec![Key::from_uint(1, 2), Key::from_uint(5, 2), Key::from_uint(0x100, 2)]
        );
    }

    #[test]
    fn test_insert_rejects_wrong_shape_without_mutating() {
        let mut tree = LutTree::new(shape(&[4, 4]));
        let bad = rec(&[1, 2], &[4, 2], 0);
        assert!(tree.insert(bad).is_err());
        assert_eq!(tree.node_count(), 1);
        assert!(tree.is_empty());
    }
}
