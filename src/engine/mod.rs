//! Tree engine: the one owner of the entry store, the projected rows, and
//! the interaction state of an explorer session.
//!
//! Structural changes are confirm-then-apply: the persistence command is
//! awaited first and local state is only touched once it has been
//! acknowledged. A rejected command leaves the projection exactly as it was.
//!
//! Typed operations (`rename`, `delete`, `move_node`, `begin_create`, ...)
//! return [`TreeResult`]. The `on_*` intent handlers wrap them for the
//! presentation layer: they log failures and report whether anything changed.

mod interaction;
mod layout;
mod mutation;
mod transient;

pub use interaction::{
    ContextMenu, ContextMenuCommand, Interaction, MenuPosition, ParentRef, RenameTrigger,
};
pub use transient::PendingCreate;

use tracing::{debug, info, warn};

use crate::paths;
use crate::storage::{EntryCommand, Persistence, StorageError};
use crate::store::{Entry, EntryKind, EntryStore, StoreError};
use crate::tree::{compare_entries, expansion_map, project, toggle_expansion, visible, ViewNode};

/// Errors that can occur during tree operations
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("Path already exists: {0}")]
    DuplicatePath(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Name already used by a sibling: {0}")]
    SiblingCollision(String),

    #[error("Persistence rejected the command: {0}")]
    PersistenceRejected(#[from] StorageError),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Not a folder: {0}")]
    NotAFolder(String),

    #[error("No committed row at index {0}")]
    InvalidIndex(usize),

    #[error("No create in progress")]
    NoPendingCreate,
}

impl From<StoreError> for TreeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicatePath(path) => TreeError::DuplicatePath(path),
            StoreError::NotFound(path) => TreeError::NotFound(path),
            StoreError::InvalidName(name) => TreeError::InvalidName(name),
            StoreError::MalformedPath(path) => TreeError::InvalidName(path),
            StoreError::NotAFile(path) => TreeError::NotAFile(path),
            StoreError::NotAFolder(path) => TreeError::NotAFolder(path),
        }
    }
}

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Coordinator of one workspace tree
pub struct TreeEngine<P> {
    persistence: P,
    store: EntryStore,
    nodes: Vec<ViewNode>,
    pending: Option<PendingCreate>,
    interaction: Interaction,
}

impl<P: Persistence> TreeEngine<P> {
    /// Create an engine over an already loaded store. Every folder starts
    /// collapsed.
    pub fn new(persistence: P, store: EntryStore) -> Self {
        let nodes = project(store.iter(), &Default::default());
        Self {
            persistence,
            store,
            nodes,
            pending: None,
            interaction: Interaction::default(),
        }
    }

    /// Load every entry from persistence and project it
    pub async fn load(persistence: P) -> TreeResult<Self> {
        let entries = persistence.load_entries().await?;

        let mut store = EntryStore::new();
        store.initialize(entries)?;

        info!(
            "Loaded {} entries ({} folders, {} files)",
            store.len(),
            store.folder_count(),
            store.file_count()
        );

        Ok(Self::new(persistence, store))
    }

    /// Populate an empty workspace. Does nothing if entries already exist;
    /// returns how many entries were added.
    pub async fn seed(&mut self, mut entries: Vec<Entry>) -> TreeResult<usize> {
        if !self.store.is_empty() {
            return Ok(0);
        }

        entries.sort_by(compare_entries);

        for entry in &entries {
            self.submit(&EntryCommand::AddEntry {
                entry: entry.clone(),
            })
            .await?;
            self.store.add(entry.clone())?;
        }

        self.nodes = project(self.store.iter(), &expansion_map(&self.nodes));
        info!("Seeded workspace with {} entries", entries.len());
        Ok(entries.len())
    }

    /// Every row in display order, hidden ones included
    pub fn ordered_view_nodes(&self) -> &[ViewNode] {
        &self.nodes
    }

    /// Rows to render, with their indices into [`Self::ordered_view_nodes`]
    pub fn visible_nodes(&self) -> Vec<(usize, &ViewNode)> {
        visible(&self.nodes).collect()
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn pending_create(&self) -> Option<&PendingCreate> {
        self.pending.as_ref()
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn node(&self, index: usize) -> Option<&ViewNode> {
        self.nodes.get(index)
    }

    /// Row index of a committed path
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|node| !node.is_transient && node.path == path)
    }

    /// Flip the expansion of the folder at `index`
    pub fn toggle(&mut self, index: usize) -> bool {
        toggle_expansion(&mut self.nodes, index)
    }

    // ------------------------------------------------------------------
    // Intent handlers
    // ------------------------------------------------------------------

    /// Select the clicked row; folders also toggle when `is_folder` is set
    pub fn on_node_click(&mut self, index: usize, is_folder: bool) -> bool {
        let Some(node) = self.nodes.get(index).filter(|n| !n.is_transient) else {
            return false;
        };

        let path = node.path.clone();
        let toggles = is_folder && node.is_folder();
        let reselected = self.interaction.selected.as_deref() != Some(path.as_str());

        self.interaction.select(path);
        let toggled = toggles && toggle_expansion(&mut self.nodes, index);

        reselected || toggled
    }

    pub fn on_context_menu_requested(
        &mut self,
        path: &str,
        kind: EntryKind,
        index: usize,
        position: MenuPosition,
    ) -> bool {
        match self.nodes.get(index) {
            Some(node) if !node.is_transient && node.path == path && node.kind == kind => {
                self.interaction.open_menu(ContextMenu {
                    path: path.to_string(),
                    kind,
                    index,
                    position,
                });
                true
            }
            _ => {
                debug!("Context menu requested for stale row {} ({})", index, path);
                false
            }
        }
    }

    /// Run a context menu entry against the menu's target. The menu closes
    /// whatever the outcome.
    pub async fn on_context_menu_command(&mut self, command: ContextMenuCommand) -> bool {
        let Some(menu) = self.interaction.close_menu() else {
            return false;
        };

        if !ContextMenuCommand::available_for(menu.kind).contains(&command) {
            debug!("{:?} is not offered for {} {}", command, menu.kind, menu.path);
            return true;
        }

        let Some(index) = self.locate(&menu.path, menu.index) else {
            debug!("Context menu target {} disappeared", menu.path);
            return true;
        };

        match command {
            ContextMenuCommand::NewFile => {
                self.on_create_requested(ParentRef::Index(index), EntryKind::File);
            }
            ContextMenuCommand::NewFolder => {
                self.on_create_requested(ParentRef::Index(index), EntryKind::Folder);
            }
            ContextMenuCommand::Rename => {
                self.on_rename_requested(index);
            }
            ContextMenuCommand::Delete => {
                self.on_delete_requested(index).await;
            }
        }

        true
    }

    pub fn on_context_menu_dismissed(&mut self) -> bool {
        self.interaction.close_menu().is_some()
    }

    /// Open the row at `index` for inline rename
    pub fn on_rename_requested(&mut self, index: usize) -> bool {
        match self.nodes.get(index) {
            Some(node) if !node.is_transient => {
                let path = node.path.clone();
                self.interaction.begin_edit(path);
                true
            }
            _ => false,
        }
    }

    /// Confirm an inline name edit. On the placeholder row this commits (or
    /// discards) the pending create; on any other row it renames.
    pub async fn on_rename_confirmed(
        &mut self,
        index: usize,
        new_name: &str,
        trigger: RenameTrigger,
    ) -> bool {
        let Some(node) = self.nodes.get(index) else {
            return false;
        };

        let name = new_name.trim();
        debug!("Name {:?} confirmed by {:?} at row {}", name, trigger, index);

        if node.is_transient {
            report("Create", self.commit_create(name).await);
            return true;
        }

        let was_editing = self.interaction.end_edit().is_some();
        report("Rename", self.rename(index, name).await).is_some() || was_editing
    }

    pub fn on_create_requested(&mut self, parent: ParentRef, kind: EntryKind) -> bool {
        report("Create request", self.begin_create(parent, kind)).is_some()
    }

    pub fn on_create_cancelled(&mut self) -> bool {
        self.discard_create()
    }

    pub async fn on_delete_requested(&mut self, index: usize) -> bool {
        report("Delete", self.delete(index).await).is_some()
    }

    pub async fn on_move_requested(&mut self, index: usize, target: ParentRef) -> bool {
        report("Move", self.move_node(index, target).await).is_some()
    }

    /// Replace the content of a file
    pub async fn update_content(&mut self, path: &str, content: &str) -> bool {
        report("Content update", self.write_content(path, content).await).is_some()
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    async fn submit(&self, command: &EntryCommand) -> TreeResult<u64> {
        Ok(self.persistence.execute(command).await?)
    }

    /// Resolve a parent reference to its path and row
    fn resolve_parent(&self, parent: ParentRef) -> TreeResult<(String, Option<usize>)> {
        match parent {
            ParentRef::Root => Ok((paths::ROOT.to_string(), None)),
            ParentRef::Index(index) => match self.nodes.get(index) {
                Some(node) if node.is_transient => Err(TreeError::InvalidIndex(index)),
                Some(node) if node.is_folder() => Ok((node.path.clone(), Some(index))),
                Some(node) => Err(TreeError::NotAFolder(node.path.clone())),
                None => Err(TreeError::InvalidIndex(index)),
            },
        }
    }

    /// Resolve the committed row at `index` and drop any pending placeholder,
    /// returning the row's index afterwards.
    fn settle(&mut self, index: usize) -> TreeResult<usize> {
        let path = match self.nodes.get(index) {
            Some(node) if !node.is_transient => node.path.clone(),
            _ => return Err(TreeError::InvalidIndex(index)),
        };

        if self.discard_create() {
            return self.index_of(&path).ok_or(TreeError::NotFound(path));
        }

        Ok(index)
    }

    /// Index of `path`, trying `hint` first
    fn locate(&self, path: &str, hint: usize) -> Option<usize> {
        match self.nodes.get(hint) {
            Some(node) if !node.is_transient && node.path == path => Some(hint),
            _ => self.index_of(path),
        }
    }
}

/// Log a failed operation the way the handlers do
fn report<T>(operation: &str, result: TreeResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err @ TreeError::PersistenceRejected(_)) => {
            warn!("{} failed: {}", operation, err);
            None
        }
        Err(err) => {
            debug!("{} refused: {}", operation, err);
            None
        }
    }
}
