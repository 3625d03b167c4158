//! Tree projection module.
//!
//! This module turns the flat entry store into the ordered, indentation-aware
//! row sequence a file explorer renders:
//! - `comparator`: the pre-order total order over paths
//! - `projector`: projection, visibility, and expansion toggling

pub mod comparator;
pub mod projector;

pub use comparator::{compare_entries, compare_nodes, compare_paths, sort_nodes};
pub use projector::{
    expansion_map, project, recompute_hidden, set_expanded, subtree_end, toggle_expansion,
    visible, ExpansionMap,
};

use serde::{Deserialize, Serialize};

use crate::paths;
use crate::store::{Entry, EntryKind};

/// A renderable row of the projected tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewNode {
    /// Absolute path; empty for a transient node
    pub path: String,
    /// Display name; empty for a transient node
    pub name: String,
    pub kind: EntryKind,
    /// Number of non-empty path segments
    pub depth: usize,
    /// Parent path, `/` at the top level
    pub parent_path: String,
    /// Whether the folder is expanded (always false for files)
    pub expanded: bool,
    /// Whether some ancestor folder is collapsed
    pub hidden: bool,
    /// Placeholder row of an in-progress create
    pub is_transient: bool,
}

impl ViewNode {
    /// Build a collapsed, visible row for an entry
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            path: entry.path.clone(),
            name: entry.name.clone(),
            kind: entry.kind,
            depth: paths::depth(&entry.path),
            parent_path: paths::parent_path(&entry.path).to_string(),
            expanded: false,
            hidden: false,
            is_transient: false,
        }
    }

    /// Build the placeholder row for a pending create under `parent_path`
    pub fn transient(parent_path: &str, kind: EntryKind) -> Self {
        Self {
            path: String::new(),
            name: String::new(),
            kind,
            depth: paths::depth(parent_path) + 1,
            parent_path: parent_path.to_string(),
            expanded: false,
            hidden: false,
            is_transient: true,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Check if this row lies strictly inside the folder at `folder_path`.
    /// Transient rows belong to the subtree of their parent.
    pub fn is_inside(&self, folder_path: &str) -> bool {
        if self.is_transient {
            paths::is_self_or_ancestor(folder_path, &self.parent_path)
        } else {
            paths::is_ancestor(folder_path, &self.path)
        }
    }

    /// Rewrite path and parent path after a rename or move of `old_prefix`
    pub fn rebase(&mut self, old_prefix: &str, new_prefix: &str) -> bool {
        match paths::replace_prefix(&self.path, old_prefix, new_prefix) {
            Some(new_path) => {
                self.name = paths::base_name(&new_path).to_string();
                self.parent_path = paths::parent_path(&new_path).to_string();
                self.depth = paths::depth(&new_path);
                self.path = new_path;
                true
            }
            None => false,
        }
    }
}
