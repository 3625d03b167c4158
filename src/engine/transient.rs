//! Create workflow: a placeholder row that becomes a real entry once named.
//!
//! `absent -> pending -> committed | discarded`. At most one create is
//! pending; asking for another one discards the current placeholder first.

use serde::Serialize;
use tracing::{debug, info};

use super::{layout, ParentRef, TreeEngine, TreeError, TreeResult};
use crate::paths;
use crate::storage::{EntryCommand, Persistence};
use crate::store::{Entry, EntryKind};
use crate::tree::{recompute_hidden, set_expanded, ViewNode};

/// An in-progress create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCreate {
    pub parent_path: String,
    pub kind: EntryKind,
    /// Row of the placeholder
    pub index: usize,
}

impl<P: Persistence> TreeEngine<P> {
    /// Insert a placeholder row for a new entry under `parent`, expanding the
    /// parent if needed. Returns the placeholder's row index.
    pub fn begin_create(&mut self, parent: ParentRef, kind: EntryKind) -> TreeResult<usize> {
        let (parent_path, parent_index) = self.resolve_parent(parent)?;

        // Dropping an older placeholder may shift the parent's row
        let discarded = self.discard_create();
        let parent_index = match parent_index {
            Some(_) if discarded => Some(
                self.index_of(&parent_path)
                    .ok_or_else(|| TreeError::NotFound(parent_path.clone()))?,
            ),
            other => other,
        };

        let hidden = match parent_index {
            Some(index) => {
                set_expanded(&mut self.nodes, index, true);
                self.nodes[index].hidden
            }
            None => false,
        };

        let index = layout::insertion_index(&self.nodes, &parent_path, parent_index, kind);
        let mut placeholder = ViewNode::transient(&parent_path, kind);
        placeholder.hidden = hidden;
        self.nodes.insert(index, placeholder);

        debug!("New {} pending under {} at row {}", kind, parent_path, index);
        self.pending = Some(PendingCreate {
            parent_path,
            kind,
            index,
        });

        Ok(index)
    }

    /// Name the pending placeholder. Any failure discards it.
    pub async fn commit_create(&mut self, name: &str) -> TreeResult<String> {
        let pending = self.pending.clone().ok_or(TreeError::NoPendingCreate)?;

        let result = self.try_commit(&pending, name).await;
        if result.is_err() {
            self.discard_create();
        }
        result
    }

    /// Remove the placeholder, if any. Returns whether one was pending.
    pub fn discard_create(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };

        if let Some(index) = self.placeholder_index(&pending) {
            self.nodes.remove(index);
        }

        debug!("Discarded new {} under {}", pending.kind, pending.parent_path);
        true
    }

    async fn try_commit(&mut self, pending: &PendingCreate, name: &str) -> TreeResult<String> {
        if !paths::is_valid_name(name) {
            return Err(TreeError::InvalidName(name.to_string()));
        }

        let path = paths::join(&pending.parent_path, name);

        if layout::has_sibling(&self.nodes, &pending.parent_path, pending.kind, name) {
            return Err(TreeError::SiblingCollision(path));
        }

        if self.store.contains(&path) {
            return Err(TreeError::DuplicatePath(path));
        }

        let index = self
            .placeholder_index(pending)
            .ok_or(TreeError::NoPendingCreate)?;

        let entry = match pending.kind {
            EntryKind::File => Entry::file(path.as_str()),
            EntryKind::Folder => Entry::folder(path.as_str()),
        };

        let seq = self
            .submit(&EntryCommand::AddEntry {
                entry: entry.clone(),
            })
            .await?;

        self.store.add(entry.clone())?;

        let mut node = ViewNode::from_entry(&entry);
        node.hidden = self.nodes[index].hidden;
        self.nodes[index] = node;
        self.pending = None;

        let parent_index = self.index_of(&pending.parent_path);
        let block = layout::children_block(&self.nodes, parent_index);
        layout::resort(&mut self.nodes, block);
        // A new folder can adopt rows of a sparse subtree
        recompute_hidden(&mut self.nodes);

        self.interaction.select(path.as_str());
        info!("Created {} {} (#{})", pending.kind, path, seq);

        Ok(path)
    }

    fn placeholder_index(&self, pending: &PendingCreate) -> Option<usize> {
        match self.nodes.get(pending.index) {
            Some(node) if node.is_transient => Some(pending.index),
            _ => self.nodes.iter().position(|node| node.is_transient),
        }
    }
}
