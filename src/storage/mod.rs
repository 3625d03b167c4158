//! Storage module: the persistence command interface behind the tree engine.
//!
//! Every structural change to the namespace is first sent to a
//! [`Persistence`] implementation as an [`EntryCommand`]; the engine only
//! applies it locally once the command has been acknowledged. This module
//! provides:
//! - The command vocabulary and the change log record
//! - An in-memory implementation for tests and ephemeral workspaces
//! - A Sled-backed implementation for durable workspaces

mod memory;
mod sled_store;

pub use memory::MemoryPersistence;
pub use sled_store::{SledPersistence, StorageStats};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::store::{Entry, EntryStore, StoreError, StoreResult};

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Sled database error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    #[error("Command rejected: {0}")]
    Rejected(String),

    #[error("Storage initialization failed: {0}")]
    InitFailed(String),
}

impl From<StoreError> for StorageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicatePath(path) => StorageError::AlreadyExists(path),
            StoreError::NotFound(path) => StorageError::NotFound(path),
            other => StorageError::Rejected(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A structural or content change sent to persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCommand {
    /// Create a file or folder
    AddEntry { entry: Entry },
    /// Delete a single entry
    DeleteEntry { path: String },
    /// Delete a folder and everything below it, listed explicitly
    DeleteSubtree { paths: Vec<String> },
    /// Rename or move a single entry
    RenameEntry {
        old_path: String,
        new_path: String,
        new_name: String,
    },
    /// Rename or move a folder with all of its descendants
    RenameSubtree {
        old_prefix: String,
        new_prefix: String,
        new_name: String,
        /// `(old, new)` paths of every descendant
        child_paths: Vec<(String, String)>,
    },
    /// Replace file content
    UpdateContent { path: String, content: String },
}

impl EntryCommand {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            EntryCommand::AddEntry { .. } => "add_entry",
            EntryCommand::DeleteEntry { .. } => "delete_entry",
            EntryCommand::DeleteSubtree { .. } => "delete_subtree",
            EntryCommand::RenameEntry { .. } => "rename_entry",
            EntryCommand::RenameSubtree { .. } => "rename_subtree",
            EntryCommand::UpdateContent { .. } => "update_content",
        }
    }

    /// Apply the command to an entry store
    pub fn apply(&self, store: &mut EntryStore) -> StoreResult<()> {
        match self {
            EntryCommand::AddEntry { entry } => store.add(entry.clone()),
            EntryCommand::DeleteEntry { path } => store.remove(path).map(|_| ()),
            EntryCommand::DeleteSubtree { paths } => store.remove_subtree(paths).map(|_| ()),
            EntryCommand::RenameEntry {
                old_path,
                new_path,
                new_name,
            } => store.rename(old_path, new_path, new_name),
            EntryCommand::RenameSubtree {
                old_prefix,
                new_prefix,
                new_name,
                child_paths: _,
            } => store
                .rename_subtree(old_prefix, new_prefix, new_name)
                .map(|_| ()),
            EntryCommand::UpdateContent { path, content } => {
                store.update_content(path, content.as_str())
            }
        }
    }
}

/// Reject a subtree rename whose listed descendants differ from the stored
/// ones. `stored` must be sorted.
pub(crate) fn check_listed_descendants(
    old_prefix: &str,
    stored: &[String],
    child_paths: &[(String, String)],
) -> StorageResult<()> {
    let mut listed: Vec<&str> = child_paths.iter().map(|(old, _)| old.as_str()).collect();
    listed.sort_unstable();

    if !listed.iter().copied().eq(stored.iter().map(String::as_str)) {
        return Err(StorageError::Rejected(format!(
            "descendants of {} listed as {} entries, {} stored",
            old_prefix,
            listed.len(),
            stored.len()
        )));
    }
    Ok(())
}

/// Acknowledged command, as kept in the change log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Commit sequence number
    pub seq: u64,
    pub command: EntryCommand,
    /// Unix timestamp of the commit
    pub timestamp: i64,
}

impl ChangeRecord {
    pub fn new(seq: u64, command: EntryCommand) -> Self {
        Self {
            seq,
            command,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Asynchronous command interface to the durable namespace
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Execute a command, resolving to its commit sequence number
    async fn execute(&self, command: &EntryCommand) -> StorageResult<u64>;

    /// Load every stored entry
    async fn load_entries(&self) -> StorageResult<Vec<Entry>>;
}

#[async_trait]
impl<P: Persistence + ?Sized> Persistence for Arc<P> {
    async fn execute(&self, command: &EntryCommand) -> StorageResult<u64> {
        (**self).execute(command).await
    }

    async fn load_entries(&self) -> StorageResult<Vec<Entry>> {
        (**self).load_entries().await
    }
}

/// Configuration for the storage layer
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path to the Sled database directory
    pub path: String,
    /// Cache size in bytes (default: 64MB)
    pub cache_size: u64,
    /// Flush interval in milliseconds (0 = only on explicit flush)
    pub flush_interval_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "./data/vfs-tree.sled".to_string(),
            cache_size: 64 * 1024 * 1024, // 64MB
            flush_interval_ms: 500,
        }
    }
}

impl StorageConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_cache_size(mut self, size: u64) -> Self {
        self.cache_size = size;
        self
    }

    pub fn with_flush_interval_ms(mut self, interval: u64) -> Self {
        self.flush_interval_ms = interval;
        self
    }
}
