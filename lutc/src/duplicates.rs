//! Detection of colliding full key paths.
//!
//! Index and structure nodes are deduplicated on insert, so in practice only
//! leaves collide. The walk does not rely on that and checks every node.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::tree::{LutTree, NodeId};

/// Return every full key path that occurs more than once in the tree.
#[must_use]
pub fn find_duplicates(tree: &LutTree) -> BTreeSet<Vec<u8>> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    visit(tree, LutTree::ROOT, &[], &mut seen, &mut duplicates);
    duplicates
}

fn visit(
    tree: &LutTree,
    id: NodeId,
    parent_path: &[u8],
    seen: &mut BTreeSet<Vec<u8>>,
    duplicates: &mut BTreeSet<Vec<u8>>,
) {
    let mut path = parent_path.to_vec();
    if let Some(key) = tree.node(id).key() {
        path.extend_from_slice(key.as_bytes());
        if !seen.insert(path.clone()) {
            duplicates.insert(path.clone());
        }
    }
    for &child in tree.children(id) {
        visit(tree, child, &path, seen, duplicates);
    }
}

/// Render a key path as bracketed hex bytes, e.g. `[ 01h 00h ]`.
#[must_use]
pub fn format_key_path(path: &[u8]) -> String {
    let mut out = String::from("[ ");
    for byte in path {
        let _ = write!(out, "{byte:02x}h ");
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Key, KeyShape, Record};

    fn tree_of(widths: &[usize], paths: &[&[u64]]) -> LutTree {
        let shape = KeyShape::new(widths.to_vec()).expect("valid shape");
        let records = paths.iter().map(|keys| {
            Record::new(
                keys.iter()
                    .zip(widths)
                    .map(|(&k, &w)| Key::from_uint(k, w))
                    .collect(),
                vec![0],
                0,
            )
        });
        LutTree::from_records(shape, records).expect("build")
    }

    #[test]
    fn test_distinct_paths_have_no_duplicates() {
        let tree = tree_of(&[4, 4], &[&[1, 0x0A], &[1, 0x0B], &[2, 0x0A]]);
        assert!(find_duplicates(&tree).is_empty());
    }

    #[test]
    fn test_reports_colliding_leaf_once() {
        let tree = tree_of(&[4, 4], &[&[1, 0x0A], &[1, 0x0A], &[1, 0x0A], &[2, 0x0A]]);
        let duplicates = find_duplicates(&tree);
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates.contains(&vec![1, 0, 0, 0, 0x0A, 0, 0, 0]));
    }

    #[test]
    fn test_detects_collisions_under_index_levels() {
        let tree = tree_of(&[1, 1, 2], &[&[1, 2, 3], &[1, 2, 3], &[1, 3, 3], &[2, 2, 3]]);
        let duplicates: Vec<Vec<u8>> = find_duplicates(&tree).into_iter().collect();
        assert_eq!(duplicates, vec![vec![1, 2, 3, 0]]);
    }

    #[test]
    fn test_format_key_path() {
        assert_eq!(format_key_path(&[0x01, 0x00, 0x0A]), "[ 01h 00h 0ah ]");
        assert_eq!(format_key_path(&[]), "[ ]");
    }
}
