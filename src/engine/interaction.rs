//! UI session state: selection, inline rename, context menu.

use serde::{Deserialize, Serialize};

use crate::paths;
use crate::store::EntryKind;

/// Pointer position a context menu was requested at. Only carried through;
/// placement is up to the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuPosition {
    pub client_x: f64,
    pub client_y: f64,
}

/// Target of an open context menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMenu {
    pub path: String,
    pub kind: EntryKind,
    pub index: usize,
    pub position: MenuPosition,
}

/// Entries of the context menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMenuCommand {
    NewFile,
    NewFolder,
    Rename,
    Delete,
}

impl ContextMenuCommand {
    /// Commands offered for a node of the given kind
    pub fn available_for(kind: EntryKind) -> &'static [ContextMenuCommand] {
        match kind {
            EntryKind::Folder => &[
                ContextMenuCommand::NewFile,
                ContextMenuCommand::NewFolder,
                ContextMenuCommand::Rename,
                ContextMenuCommand::Delete,
            ],
            EntryKind::File => &[ContextMenuCommand::Rename, ContextMenuCommand::Delete],
        }
    }
}

/// What ended an inline name edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenameTrigger {
    Enter,
    Blur,
}

/// A parent for create and move requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRef {
    Root,
    Index(usize),
}

/// Ephemeral interaction state of one explorer session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    /// Currently selected path
    pub selected: Option<String>,
    /// Path open for inline rename
    pub editing: Option<String>,
    pub context_menu: Option<ContextMenu>,
}

impl Interaction {
    pub fn select(&mut self, path: impl Into<String>) {
        self.selected = Some(path.into());
    }

    pub fn begin_edit(&mut self, path: impl Into<String>) {
        self.editing = Some(path.into());
    }

    pub fn end_edit(&mut self) -> Option<String> {
        self.editing.take()
    }

    pub fn open_menu(&mut self, menu: ContextMenu) {
        self.context_menu = Some(menu);
    }

    pub fn close_menu(&mut self) -> Option<ContextMenu> {
        self.context_menu.take()
    }

    /// Follow a rename or move of `old_prefix`
    pub fn rebase(&mut self, old_prefix: &str, new_prefix: &str) {
        for slot in [&mut self.selected, &mut self.editing] {
            if let Some(new_path) = slot
                .as_deref()
                .and_then(|p| paths::replace_prefix(p, old_prefix, new_prefix))
            {
                *slot = Some(new_path);
            }
        }

        if let Some(menu) = self.context_menu.as_mut() {
            if let Some(new_path) = paths::replace_prefix(&menu.path, old_prefix, new_prefix) {
                menu.path = new_path;
            }
        }
    }

    /// Drop every reference to `prefix` or anything below it
    pub fn forget(&mut self, prefix: &str) {
        for slot in [&mut self.selected, &mut self.editing] {
            if slot.as_deref().is_some_and(|p| paths::is_self_or_ancestor(prefix, p)) {
                *slot = None;
            }
        }

        if self
            .context_menu
            .as_ref()
            .is_some_and(|m| paths::is_self_or_ancestor(prefix, &m.path))
        {
            self.context_menu = None;
        }
    }
}
