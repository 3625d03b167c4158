//! In-memory persistence backed by an [`EntryStore`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

use super::{
    check_listed_descendants, ChangeRecord, EntryCommand, Persistence, StorageError,
    StorageResult,
};
use crate::store::{Entry, EntryStore};

/// Persistence that keeps the namespace in process memory
#[derive(Default)]
pub struct MemoryPersistence {
    store: Mutex<EntryStore>,
    log: Mutex<Vec<ChangeRecord>>,
    next_seq: AtomicU64,
    rejecting: AtomicBool,
}

impl MemoryPersistence {
    /// Create an empty persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a persistence pre-populated with entries
    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> StorageResult<Self> {
        let persistence = Self::new();
        {
            let mut store = persistence.store.lock();
            for entry in entries {
                store.add(entry)?;
            }
        }
        Ok(persistence)
    }

    /// Make every following command fail (or succeed again)
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Commands acknowledged so far
    pub fn log(&self) -> Vec<ChangeRecord> {
        self.log.lock().clone()
    }

    /// Snapshot of the stored namespace
    pub fn snapshot(&self) -> EntryStore {
        self.store.lock().clone()
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn execute(&self, command: &EntryCommand) -> StorageResult<u64> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected(format!("{} refused", command.name())));
        }

        let mut store = self.store.lock();
        if let EntryCommand::RenameSubtree {
            old_prefix,
            child_paths,
            ..
        } = command
        {
            let mut stored: Vec<String> = store
                .descendants_of(old_prefix)
                .map(|entry| entry.path.clone())
                .collect();
            stored.sort();
            check_listed_descendants(old_prefix, &stored, child_paths)?;
        }
        command.apply(&mut store)?;
        drop(store);

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().push(ChangeRecord::new(seq, command.clone()));
        debug!("Committed {} as #{}", command.name(), seq);

        Ok(seq)
    }

    async fn load_entries(&self) -> StorageResult<Vec<Entry>> {
        Ok(self.store.lock().iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_and_log() {
        let persistence = MemoryPersistence::new();

        let seq = persistence
            .execute(&EntryCommand::AddEntry {
                entry: Entry::file("/a.txt"),
            })
            .await
            .unwrap();

        assert_eq!(seq, 1);
        assert_eq!(persistence.log().len(), 1);
        assert_eq!(persistence.load_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_command_is_rejected() {
        let persistence = MemoryPersistence::with_entries(vec![Entry::file("/a.txt")]).unwrap();

        let result = persistence
            .execute(&EntryCommand::AddEntry {
                entry: Entry::file("/a.txt"),
            })
            .await;

        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert!(persistence.log().is_empty());
    }

    #[tokio::test]
    async fn test_rename_subtree_needs_every_descendant() {
        let persistence = MemoryPersistence::with_entries(vec![
            Entry::folder("/a"),
            Entry::file("/a/x"),
            Entry::file("/a/y"),
        ])
        .unwrap();

        let result = persistence
            .execute(&EntryCommand::RenameSubtree {
                old_prefix: "/a".to_string(),
                new_prefix: "/z".to_string(),
                new_name: "z".to_string(),
                child_paths: vec![("/a/x".to_string(), "/z/x".to_string())],
            })
            .await;

        assert!(matches!(result, Err(StorageError::Rejected(_))));
        assert!(persistence.snapshot().contains("/a/y"));
        assert!(persistence.log().is_empty());
    }

    #[tokio::test]
    async fn test_rejecting_mode() {
        let persistence = MemoryPersistence::new();
        persistence.set_rejecting(true);

        let result = persistence
            .execute(&EntryCommand::AddEntry {
                entry: Entry::folder("/docs"),
            })
            .await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));
        assert!(persistence.snapshot().is_empty());

        persistence.set_rejecting(false);
        assert!(persistence
            .execute(&EntryCommand::AddEntry {
                entry: Entry::folder("/docs"),
            })
            .await
            .is_ok());
    }
}
