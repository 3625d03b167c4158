//! Index arithmetic over the sorted row sequence.
//!
//! Everything here relies on subtree contiguity: a folder row is followed by
//! exactly the rows of its subtree.

use std::ops::Range;

use crate::store::EntryKind;
use crate::tree::{compare_nodes, subtree_end, ViewNode};

/// Rows of the folder at `index` and its whole subtree
pub fn subtree_block(nodes: &[ViewNode], index: usize) -> Range<usize> {
    index..subtree_end(nodes, index)
}

/// Rows strictly below a parent: the whole sequence for the root, the
/// folder's subtree otherwise
pub fn children_block(nodes: &[ViewNode], parent_index: Option<usize>) -> Range<usize> {
    match parent_index {
        Some(index) => index + 1..subtree_end(nodes, index),
        None => 0..nodes.len(),
    }
}

/// Where a new placeholder goes so that, once named, it already sits among
/// its future siblings: folders become the first child of their parent,
/// files go before the first sibling file or after the parent's subtree.
pub fn insertion_index(
    nodes: &[ViewNode],
    parent_path: &str,
    parent_index: Option<usize>,
    kind: EntryKind,
) -> usize {
    match kind {
        EntryKind::Folder => parent_index.map(|i| i + 1).unwrap_or(0),
        EntryKind::File => {
            let block = children_block(nodes, parent_index);
            nodes[block.clone()]
                .iter()
                .position(|node| {
                    node.is_file() && !node.is_transient && node.parent_path == parent_path
                })
                .map(|offset| block.start + offset)
                .unwrap_or(block.end)
        }
    }
}

/// Contiguous range of committed files directly under `parent_path`
pub fn sibling_files(nodes: &[ViewNode], parent_path: &str) -> Range<usize> {
    let mut indices = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.is_file() && !n.is_transient && n.parent_path == parent_path)
        .map(|(i, _)| i);

    match indices.next() {
        Some(first) => first..indices.last().unwrap_or(first) + 1,
        None => 0..0,
    }
}

/// Check whether a committed sibling of the given kind already uses `name`
pub fn has_sibling(nodes: &[ViewNode], parent_path: &str, kind: EntryKind, name: &str) -> bool {
    nodes.iter().any(|n| {
        !n.is_transient && n.kind == kind && n.parent_path == parent_path && n.name == name
    })
}

/// Re-sort a range of rows in place
pub fn resort(nodes: &mut [ViewNode], range: Range<usize>) {
    nodes[range].sort_by(compare_nodes);
}
