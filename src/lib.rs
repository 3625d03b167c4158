//! VFS Tree - workspace file tree engine
//!
//! Maintains a flat, path-keyed namespace of files and folders and projects
//! it into the ordered, indentation-aware row sequence a file explorer
//! renders:
//! - `store`: the canonical path-indexed entries
//! - `tree`: ordering, projection, and expansion state
//! - `engine`: confirm-then-apply mutations and the create/rename workflow
//! - `storage`: persistence commands, in memory or on Sled
//! - `config`: environment-driven server settings

pub mod config;
pub mod engine;
pub mod paths;
pub mod storage;
pub mod store;
pub mod tree;

pub use config::{ConfigError, ServerConfig};
pub use engine::{
    ContextMenu, ContextMenuCommand, Interaction, MenuPosition, ParentRef, PendingCreate,
    RenameTrigger, TreeEngine, TreeError, TreeResult,
};
pub use storage::{
    EntryCommand, MemoryPersistence, Persistence, SledPersistence, StorageConfig, StorageError,
};
pub use store::{sample_entries, Entry, EntryKind, EntryStore, StoreError};
pub use tree::ViewNode;
