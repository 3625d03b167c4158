//! Ordering of namespace entries into a pre-order flattening.
//!
//! Each path is read as a sequence of segment keys `(rank, name)`, where
//! `rank` is 0 for folders and 1 for files. Every segment but the last names
//! a folder; the last one takes the entry's own kind. Comparing those key
//! sequences lexicographically (shorter prefix first) gives:
//! - siblings: folders before files, then names in byte order
//! - a folder before everything in its subtree
//! - unrelated entries ordered by their branches under the nearest common
//!   ancestor
//!
//! so a sorted sequence lists every folder immediately followed by its whole
//! subtree, without any parent/child links.

use std::cmp::Ordering;

use super::ViewNode;
use crate::paths;
use crate::store::{Entry, EntryKind};

fn rank(kind: EntryKind) -> u8 {
    match kind {
        EntryKind::Folder => 0,
        EntryKind::File => 1,
    }
}

/// Compare two `(path, kind)` pairs
pub fn compare_paths(a_path: &str, a_kind: EntryKind, b_path: &str, b_kind: EntryKind) -> Ordering {
    let mut a_segments = paths::segments(a_path).peekable();
    let mut b_segments = paths::segments(b_path).peekable();

    loop {
        match (a_segments.next(), b_segments.next()) {
            (None, None) => return rank(a_kind).cmp(&rank(b_kind)),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a_name), Some(b_name)) => {
                let a_rank = if a_segments.peek().is_some() { 0 } else { rank(a_kind) };
                let b_rank = if b_segments.peek().is_some() { 0 } else { rank(b_kind) };

                let ordering = a_rank.cmp(&b_rank).then_with(|| a_name.cmp(b_name));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Compare two entries
pub fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    compare_paths(&a.path, a.kind, &b.path, b.kind)
}

/// Compare two committed view nodes
pub fn compare_nodes(a: &ViewNode, b: &ViewNode) -> Ordering {
    compare_paths(&a.path, a.kind, &b.path, b.kind)
}

/// Sort view nodes into pre-order
pub fn sort_nodes(nodes: &mut [ViewNode]) {
    nodes.sort_by(compare_nodes);
}
