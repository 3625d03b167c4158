//! Sled-based persistence for the entry namespace.
//!
//! This module stores the namespace in the Sled embedded database:
//! - `entries`: path → bincode-encoded `Entry`
//! - `changes`: zero-padded sequence number → bincode-encoded `ChangeRecord`
//!
//! Each command's entry rewrite and its change record are committed in one
//! transaction over both trees.

use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Batch, Db, Transactional, Tree};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{
    check_listed_descendants, ChangeRecord, EntryCommand, Persistence, StorageConfig,
    StorageError, StorageResult,
};
use crate::paths;
use crate::store::Entry;

/// Tree names for different data types
const TREE_ENTRIES: &str = "entries";
const TREE_CHANGES: &str = "changes";

/// Sled-backed persistence
#[derive(Clone)]
pub struct SledPersistence {
    db: Arc<Db>,
    entries: Tree,
    changes: Tree,
    config: StorageConfig,
}

impl SledPersistence {
    /// Open or create a store at the configured path
    pub fn open(config: StorageConfig) -> StorageResult<Self> {
        let path = Path::new(&config.path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::InitFailed(format!("Failed to create directory: {}", e))
            })?;
        }

        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_size)
            .flush_every_ms(if config.flush_interval_ms > 0 {
                Some(config.flush_interval_ms)
            } else {
                None
            })
            .open()?;

        let entries = db.open_tree(TREE_ENTRIES)?;
        let changes = db.open_tree(TREE_CHANGES)?;

        Ok(Self {
            db: Arc::new(db),
            entries,
            changes,
            config,
        })
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Load one entry
    pub fn get_entry(&self, path: &str) -> StorageResult<Option<Entry>> {
        match self.entries.get(path.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Check if an entry exists
    pub fn contains(&self, path: &str) -> StorageResult<bool> {
        Ok(self.entries.contains_key(path.as_bytes())?)
    }

    /// Load all change records with a sequence number of at least `since_seq`
    pub fn load_changes_since(&self, since_seq: u64) -> StorageResult<Vec<ChangeRecord>> {
        let start_key = format!("{:020}", since_seq);

        let mut changes = Vec::new();
        for item in self.changes.range(start_key.as_bytes()..) {
            let (_, value) = item?;
            changes.push(bincode::deserialize(&value)?);
        }
        Ok(changes)
    }

    /// Latest committed sequence number, 0 if nothing was committed
    pub fn latest_seq(&self) -> StorageResult<u64> {
        match self.changes.last()? {
            Some((_, value)) => {
                let record: ChangeRecord = bincode::deserialize(&value)?;
                Ok(record.seq)
            }
            None => Ok(0),
        }
    }

    /// Force flush all pending writes to disk
    pub fn flush(&self) -> StorageResult<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Get storage statistics
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            entry_count: self.entries.len(),
            change_count: self.changes.len(),
            total_size_bytes: self.db.size_on_disk().unwrap_or(0),
        }
    }

    fn require(&self, path: &str) -> StorageResult<Entry> {
        self.get_entry(path)?
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn require_free(&self, path: &str) -> StorageResult<()> {
        if self.contains(path)? {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        Ok(())
    }

    /// Validate a command against stored state and turn it into one batch
    fn plan(&self, command: &EntryCommand) -> StorageResult<Batch> {
        let mut batch = Batch::default();

        match command {
            EntryCommand::AddEntry { entry } => {
                if !paths::is_well_formed(&entry.path) {
                    return Err(StorageError::Rejected(format!("malformed path {}", entry.path)));
                }
                self.require_free(&entry.path)?;
                batch.insert(entry.path.as_bytes(), bincode::serialize(entry)?);
            }

            EntryCommand::DeleteEntry { path } => {
                self.require(path)?;
                batch.remove(path.as_bytes());
            }

            EntryCommand::DeleteSubtree { paths } => {
                for path in paths {
                    self.require(path)?;
                    batch.remove(path.as_bytes());
                }
            }

            EntryCommand::RenameEntry {
                old_path,
                new_path,
                new_name,
            } => {
                let mut entry = self.require(old_path)?;
                self.require_free(new_path)?;

                entry.path = new_path.clone();
                entry.name = new_name.clone();
                batch.remove(old_path.as_bytes());
                batch.insert(new_path.as_bytes(), bincode::serialize(&entry)?);
            }

            EntryCommand::RenameSubtree {
                old_prefix,
                new_prefix,
                new_name,
                child_paths,
            } => {
                if paths::is_self_or_ancestor(old_prefix, new_prefix) {
                    return Err(StorageError::Rejected(format!(
                        "cannot move {} into {}",
                        old_prefix, new_prefix
                    )));
                }

                let mut folder = self.require(old_prefix)?;
                self.require_free(new_prefix)?;

                let mut stored = Vec::new();
                for item in self.entries.scan_prefix(format!("{}/", old_prefix).as_bytes()) {
                    let (key, _) = item?;
                    stored.push(String::from_utf8_lossy(&key).into_owned());
                }
                check_listed_descendants(old_prefix, &stored, child_paths)?;

                folder.path = new_prefix.clone();
                folder.name = new_name.clone();
                batch.remove(old_prefix.as_bytes());
                batch.insert(new_prefix.as_bytes(), bincode::serialize(&folder)?);

                for (old, new) in child_paths {
                    let rebased = paths::replace_prefix(old, old_prefix, new_prefix);
                    if rebased.as_deref() != Some(new.as_str()) {
                        return Err(StorageError::Rejected(format!(
                            "{} is not {} rebased onto {}",
                            new, old, new_prefix
                        )));
                    }

                    let mut entry = self.require(old)?;
                    self.require_free(new)?;
                    entry.path = new.clone();
                    batch.remove(old.as_bytes());
                    batch.insert(new.as_bytes(), bincode::serialize(&entry)?);
                }
            }

            EntryCommand::UpdateContent { path, content } => {
                let mut entry = self.require(path)?;
                if !entry.is_file() {
                    return Err(StorageError::Rejected(format!("{} is not a file", path)));
                }
                entry.content = Some(content.clone());
                batch.insert(path.as_bytes(), bincode::serialize(&entry)?);
            }
        }

        Ok(batch)
    }
}

#[async_trait]
impl Persistence for SledPersistence {
    async fn execute(&self, command: &EntryCommand) -> StorageResult<u64> {
        let batch = match self.plan(command) {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Refusing {}: {}", command.name(), e);
                return Err(e);
            }
        };

        let seq = self.db.generate_id()? + 1;
        let key = format!("{:020}", seq);
        let record = bincode::serialize(&ChangeRecord::new(seq, command.clone()))?;

        (&self.entries, &self.changes)
            .transaction(|(entries, changes)| {
                entries.apply_batch(&batch)?;
                changes.insert(key.as_bytes(), record.as_slice())?;
                Ok::<_, ConflictableTransactionError<StorageError>>(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => StorageError::Sled(e),
            })?;

        debug!("Committed {} as #{}", command.name(), seq);
        Ok(seq)
    }

    async fn load_entries(&self) -> StorageResult<Vec<Entry>> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for item in self.entries.iter() {
            let (_, value) = item?;
            entries.push(bincode::deserialize(&value)?);
        }
        Ok(entries)
    }
}

/// Statistics about the storage
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub entry_count: usize,
    pub change_count: usize,
    pub total_size_bytes: u64,
}

impl Drop for SledPersistence {
    fn drop(&mut self) {
        // Attempt to flush on drop, but don't panic
        let _ = self.flush();
    }
}
