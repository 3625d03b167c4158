//! Projection of the entry store into ordered view rows.
//!
//! Visibility is derived in one linear pass over the sorted rows while
//! carrying the chain of folders that are ancestors of the current row. Since
//! the order is a pre-order flattening, a folder leaves the chain as soon as
//! a row outside its subtree is reached, and a row is hidden iff some folder
//! on the chain is collapsed or hidden itself.

use std::collections::HashMap;
use std::ops::Range;

use super::{sort_nodes, ViewNode};
use crate::store::Entry;

/// Folder path → expanded flag, carried across re-projections
pub type ExpansionMap = HashMap<String, bool>;

/// Build the ordered rows for a set of entries.
///
/// Folders missing from `expansion` start collapsed.
pub fn project<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
    expansion: &ExpansionMap,
) -> Vec<ViewNode> {
    let mut nodes: Vec<ViewNode> = entries
        .into_iter()
        .map(|entry| {
            let mut node = ViewNode::from_entry(entry);
            if node.is_folder() {
                node.expanded = expansion.get(&node.path).copied().unwrap_or(false);
            }
            node
        })
        .collect();

    sort_nodes(&mut nodes);
    recompute_hidden(&mut nodes);
    nodes
}

/// Re-derive `hidden` for every row
pub fn recompute_hidden(nodes: &mut [ViewNode]) {
    let len = nodes.len();
    propagate(nodes, 0..len, Vec::new());
}

/// Flip the expansion flag of the folder at `index` and re-derive visibility
/// of its subtree. Returns `false` (and changes nothing) if `index` is not a
/// committed folder row.
pub fn toggle_expansion(nodes: &mut [ViewNode], index: usize) -> bool {
    match nodes.get_mut(index) {
        Some(node) if node.is_folder() && !node.is_transient => {
            node.expanded = !node.expanded;
        }
        _ => return false,
    }

    let end = subtree_end(nodes, index);
    let hides_below = nodes[index].hidden || !nodes[index].expanded;
    propagate(nodes, index + 1..end, vec![(index, hides_below)]);
    true
}

/// Set the expansion flag of the folder at `index`. Returns whether anything
/// changed.
pub fn set_expanded(nodes: &mut [ViewNode], index: usize, expanded: bool) -> bool {
    let differs = matches!(
        nodes.get(index),
        Some(node) if node.is_folder() && node.expanded != expanded
    );
    differs && toggle_expansion(nodes, index)
}

/// Index one past the last row of the subtree rooted at `index`.
///
/// Relies on subtree contiguity of the sorted rows. For files and transient
/// rows this is `index + 1`.
pub fn subtree_end(nodes: &[ViewNode], index: usize) -> usize {
    let Some(root) = nodes.get(index) else {
        return nodes.len();
    };

    if !root.is_folder() || root.is_transient {
        return index + 1;
    }

    nodes[index + 1..]
        .iter()
        .position(|node| !node.is_inside(&root.path))
        .map(|offset| index + 1 + offset)
        .unwrap_or(nodes.len())
}

/// Snapshot the expansion flag of every committed folder row
pub fn expansion_map(nodes: &[ViewNode]) -> ExpansionMap {
    nodes
        .iter()
        .filter(|node| node.is_folder() && !node.is_transient)
        .map(|node| (node.path.clone(), node.expanded))
        .collect()
}

/// Rows that should be rendered, with their indices
pub fn visible(nodes: &[ViewNode]) -> impl Iterator<Item = (usize, &ViewNode)> {
    nodes.iter().enumerate().filter(|(_, node)| !node.hidden)
}

/// Walk `range` carrying the ancestor chain. Each chain element is a folder
/// row index and whether rows below it are hidden.
fn propagate(nodes: &mut [ViewNode], range: Range<usize>, mut chain: Vec<(usize, bool)>) {
    let floor = chain.len();

    for idx in range {
        while chain.len() > floor {
            let (ancestor, _) = chain[chain.len() - 1];
            if nodes[idx].is_inside(&nodes[ancestor].path) {
                break;
            }
            chain.pop();
        }

        let hidden = chain.last().map(|&(_, hides)| hides).unwrap_or(false);
        let node = &mut nodes[idx];
        node.hidden = hidden;

        if node.is_folder() && !node.is_transient {
            chain.push((idx, hidden || !node.expanded));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths;
    use crate::store::sample_entries;

    fn index_of(nodes: &[ViewNode], path: &str) -> usize {
        nodes.iter().position(|n| n.path == path).unwrap()
    }

    fn all_expanded(entries: &[Entry]) -> ExpansionMap {
        entries
            .iter()
            .filter(|e| e.is_folder())
            .map(|e| (e.path.clone(), true))
            .collect()
    }

    #[test]
    fn test_initial_projection_collapsed() {
        let entries = sample_entries();
        let nodes = project(&entries, &ExpansionMap::new());

        assert_eq!(nodes.len(), entries.len());
        for node in &nodes {
            assert_eq!(node.hidden, node.depth != 1, "{}", node.path);
            assert!(!node.expanded);
        }
    }

    #[test]
    fn test_projection_honors_expansion_map() {
        let entries = sample_entries();
        let mut expansion = ExpansionMap::new();
        expansion.insert("/test".to_string(), true);

        let nodes = project(&entries, &expansion);

        assert!(!nodes[index_of(&nodes, "/test/haha.css")].hidden);
        assert!(!nodes[index_of(&nodes, "/test/test")].hidden);
        assert!(nodes[index_of(&nodes, "/test/test/aaa.ts")].hidden);
    }

    #[test]
    fn test_collapse_hides_whole_subtree() {
        let entries = sample_entries();
        let mut nodes = project(&entries, &all_expanded(&entries));
        assert!(nodes.iter().all(|n| !n.hidden));

        let test2 = index_of(&nodes, "/test2");
        assert!(toggle_expansion(&mut nodes, test2));

        for node in &nodes {
            let inside = paths::is_ancestor("/test2", &node.path);
            assert_eq!(node.hidden, inside, "{}", node.path);
        }
    }

    #[test]
    fn test_expand_keeps_nested_collapsed_hidden() {
        let entries = sample_entries();
        let mut expansion = all_expanded(&entries);
        expansion.insert("/test2".to_string(), false);
        expansion.insert("/test2/test3/test4".to_string(), false);
        let mut nodes = project(&entries, &expansion);

        let test2 = index_of(&nodes, "/test2");
        assert!(toggle_expansion(&mut nodes, test2));

        assert!(!nodes[index_of(&nodes, "/test2/test3")].hidden);
        assert!(!nodes[index_of(&nodes, "/test2/test3/test4")].hidden);
        assert!(nodes[index_of(&nodes, "/test2/test3/test4/index.js")].hidden);
        assert!(!nodes[index_of(&nodes, "/test2/test3/index.css")].hidden);
    }

    #[test]
    fn test_toggle_matches_full_recompute() {
        let entries = sample_entries();
        let mut nodes = project(&entries, &ExpansionMap::new());

        for path in ["/test", "/test/test", "/test2/test3", "/test2", "/test"] {
            let idx = index_of(&nodes, path);
            toggle_expansion(&mut nodes, idx);

            let mut expected = nodes.clone();
            recompute_hidden(&mut expected);
            assert_eq!(nodes, expected);
        }
    }

    #[test]
    fn test_toggle_ignores_files() {
        let entries = sample_entries();
        let mut nodes = project(&entries, &ExpansionMap::new());
        let before = nodes.clone();

        let file = index_of(&nodes, "/index.ts");
        assert!(!toggle_expansion(&mut nodes, file));
        let len = nodes.len();
        assert!(!toggle_expansion(&mut nodes, len));
        assert_eq!(nodes, before);
    }

    #[test]
    fn test_set_expanded_is_idempotent() {
        let entries = sample_entries();
        let mut nodes = project(&entries, &ExpansionMap::new());
        let test = index_of(&nodes, "/test");

        assert!(set_expanded(&mut nodes, test, true));
        assert!(!set_expanded(&mut nodes, test, true));
        assert!(nodes[test].expanded);
    }

    #[test]
    fn test_subtree_end_respects_boundary() {
        let entries = vec![
            Entry::folder("/test2"),
            Entry::file("/test2/a.ts"),
            Entry::folder("/test23"),
            Entry::file("/test23/b.ts"),
        ];
        let nodes = project(&entries, &ExpansionMap::new());

        assert_eq!(subtree_end(&nodes, 0), 2);
        assert_eq!(subtree_end(&nodes, 1), 2);
        assert_eq!(subtree_end(&nodes, 2), 4);
    }

    #[test]
    fn test_expansion_map_round_trip() {
        let entries = sample_entries();
        let mut nodes = project(&entries, &ExpansionMap::new());
        let test = index_of(&nodes, "/test");
        toggle_expansion(&mut nodes, test);

        let map = expansion_map(&nodes);
        assert_eq!(map.get("/test"), Some(&true));
        assert_eq!(map.get("/A"), Some(&false));
        assert_eq!(project(&entries, &map), nodes);
    }

    #[test]
    fn test_visible_rows() {
        let entries = sample_entries();
        let nodes = project(&entries, &ExpansionMap::new());
        let names: Vec<&str> = visible(&nodes).map(|(_, n)| n.name.as_str()).collect();
        assert_eq!(names, vec!["A", "a", "test", "test2", "index.css", "index.ts"]);
    }
}
