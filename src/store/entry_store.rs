//! Flat path-indexed entry store.
//!
//! Entries are kept in a single map keyed by absolute path. There are no
//! parent/child links: subtree membership is always derived with
//! [`paths::is_ancestor`]. Multi-path operations validate the whole set
//! before touching the map, so callers never observe a partial rewrite.

use std::collections::{HashMap, HashSet};

use super::{Entry, EntryKind};
use crate::paths;

/// Errors that can occur during entry store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Path already exists: {0}")]
    DuplicatePath(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Malformed path: {0}")]
    MalformedPath(String),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Not a folder: {0}")]
    NotAFolder(String),
}

/// Result type for entry store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// All entries of a workspace indexed by path
#[derive(Debug, Clone, Default)]
pub struct EntryStore {
    entries: HashMap<String, Entry>,
}

impl EntryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store. Only applies when the store is empty; returns whether
    /// the entries were taken.
    pub fn initialize(&mut self, entries: impl IntoIterator<Item = Entry>) -> StoreResult<bool> {
        if !self.entries.is_empty() {
            return Ok(false);
        }

        let mut seeded = Self::new();
        for entry in entries {
            seeded.add(entry)?;
        }

        *self = seeded;
        Ok(true)
    }

    /// Get an entry by path
    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.entries.get(path)
    }

    /// Check if a path exists
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of file entries
    pub fn file_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_file()).count()
    }

    /// Number of folder entries
    pub fn folder_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_folder()).count()
    }

    /// Iterate over all entries in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Every entry strictly inside `prefix`
    pub fn descendants_of<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries
            .values()
            .filter(move |e| paths::is_ancestor(prefix, &e.path))
    }

    /// Insert a new entry
    pub fn add(&mut self, entry: Entry) -> StoreResult<()> {
        if !paths::is_well_formed(&entry.path) {
            return Err(StoreError::MalformedPath(entry.path));
        }

        if paths::base_name(&entry.path) != entry.name {
            return Err(StoreError::InvalidName(entry.name));
        }

        if self.entries.contains_key(&entry.path) {
            return Err(StoreError::DuplicatePath(entry.path));
        }

        let entry = Entry::new(entry.path, entry.name, entry.kind, entry.content);
        self.entries.insert(entry.path.clone(), entry);
        Ok(())
    }

    /// Remove a single entry
    pub fn remove(&mut self, path: &str) -> StoreResult<Entry> {
        self.entries
            .remove(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    /// Remove every listed path. Fails without removing anything if any path
    /// is absent.
    pub fn remove_subtree(&mut self, paths: &[String]) -> StoreResult<Vec<Entry>> {
        if let Some(missing) = paths.iter().find(|p| !self.entries.contains_key(p.as_str())) {
            return Err(StoreError::NotFound(missing.clone()));
        }

        let unique: HashSet<&String> = paths.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|path| self.entries.remove(path))
            .collect())
    }

    /// Rename or move a single entry. Descendants of a folder are not
    /// touched; use [`EntryStore::rename_subtree`] for that.
    pub fn rename(&mut self, old_path: &str, new_path: &str, new_name: &str) -> StoreResult<()> {
        let kind = self
            .entries
            .get(old_path)
            .map(|e| e.kind)
            .ok_or_else(|| StoreError::NotFound(old_path.to_string()))?;

        validate_target(kind, new_path, new_name)?;

        if self.entries.contains_key(new_path) {
            return Err(StoreError::DuplicatePath(new_path.to_string()));
        }

        if let Some(mut entry) = self.entries.remove(old_path) {
            entry.path = new_path.to_string();
            entry.name = new_name.to_string();
            self.entries.insert(entry.path.clone(), entry);
        }

        Ok(())
    }

    /// Rename or move a folder together with all of its descendants.
    ///
    /// Returns the `(old, new)` path pairs of the descendants, excluding the
    /// folder itself.
    pub fn rename_subtree(
        &mut self,
        old_prefix: &str,
        new_prefix: &str,
        new_name: &str,
    ) -> StoreResult<Vec<(String, String)>> {
        let entry = self
            .entries
            .get(old_prefix)
            .ok_or_else(|| StoreError::NotFound(old_prefix.to_string()))?;

        if !entry.is_folder() {
            return Err(StoreError::NotAFolder(old_prefix.to_string()));
        }

        validate_target(EntryKind::Folder, new_prefix, new_name)?;

        if paths::is_self_or_ancestor(old_prefix, new_prefix) {
            return Err(StoreError::InvalidName(new_prefix.to_string()));
        }

        let moved: Vec<(String, String)> = self
            .entries
            .keys()
            .filter_map(|path| {
                paths::replace_prefix(path, old_prefix, new_prefix).map(|new| (path.clone(), new))
            })
            .collect();

        // Every target must be free; the moved set never overlaps its own
        // targets because the new prefix lies outside the old subtree.
        if let Some((_, taken)) = moved.iter().find(|(_, new)| self.entries.contains_key(new)) {
            return Err(StoreError::DuplicatePath(taken.clone()));
        }

        let mut relocated = Vec::with_capacity(moved.len());
        for (old, new) in &moved {
            if let Some(mut entry) = self.entries.remove(old) {
                entry.path = new.clone();
                if old == old_prefix {
                    entry.name = new_name.to_string();
                }
                relocated.push(entry);
            }
        }
        for entry in relocated {
            self.entries.insert(entry.path.clone(), entry);
        }

        Ok(moved
            .into_iter()
            .filter(|(old, _)| old != old_prefix)
            .collect())
    }

    /// Replace the content of a file
    pub fn update_content(&mut self, path: &str, content: impl Into<String>) -> StoreResult<()> {
        let entry = self
            .entries
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        if !entry.is_file() {
            return Err(StoreError::NotAFile(path.to_string()));
        }

        entry.content = Some(content.into());
        Ok(())
    }
}

fn validate_target(kind: EntryKind, new_path: &str, new_name: &str) -> StoreResult<()> {
    if kind.is_folder() && new_name.contains(paths::SEPARATOR) {
        return Err(StoreError::InvalidName(new_name.to_string()));
    }

    if !paths::is_valid_name(new_name) {
        return Err(StoreError::InvalidName(new_name.to_string()));
    }

    if !paths::is_well_formed(new_path) {
        return Err(StoreError::MalformedPath(new_path.to_string()));
    }

    if paths::base_name(new_path) != new_name {
        return Err(StoreError::InvalidName(new_name.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(entries: Vec<Entry>) -> EntryStore {
        let mut store = EntryStore::new();
        for entry in entries {
            store.add(entry).unwrap();
        }
        store
    }

    #[test]
    fn test_add_rejects_duplicate() {
        let mut store = store_with(vec![Entry::file("/a.txt")]);

        let result = store.add(Entry::folder("/a.txt"));
        assert_eq!(result, Err(StoreError::DuplicatePath("/a.txt".to_string())));
        assert!(store.get("/a.txt").unwrap().is_file());
    }

    #[test]
    fn test_add_rejects_mismatched_name() {
        let mut store = EntryStore::new();
        let entry = Entry::new("/a.txt", "b.txt", EntryKind::File, None);
        assert!(matches!(store.add(entry), Err(StoreError::InvalidName(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_initialize_only_when_empty() {
        let mut store = EntryStore::new();
        assert!(store.initialize(vec![Entry::file("/a")]).unwrap());
        assert!(!store.initialize(vec![Entry::file("/b")]).unwrap());
        assert!(store.contains("/a"));
        assert!(!store.contains("/b"));
    }

    #[test]
    fn test_remove_subtree_is_all_or_nothing() {
        let mut store = store_with(vec![
            Entry::folder("/p"),
            Entry::file("/p/one.txt"),
        ]);

        let result = store.remove_subtree(&["/p".to_string(), "/p/missing".to_string()]);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(store.len(), 2);

        let removed = store
            .remove_subtree(&["/p".to_string(), "/p/one.txt".to_string()])
            .unwrap();
        assert_eq!(removed.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_rename_file() {
        let mut store = store_with(vec![Entry::file("/p/old.rs")]);

        store.rename("/p/old.rs", "/p/new.rs", "new.rs").unwrap();

        assert!(!store.contains("/p/old.rs"));
        assert_eq!(store.get("/p/new.rs").unwrap().name, "new.rs");
    }

    #[test]
    fn test_rename_rejects_existing_target() {
        let mut store = store_with(vec![
            Entry::file("/p/one.txt"),
            Entry::file("/p/two.txt"),
        ]);

        let result = store.rename("/p/two.txt", "/p/one.txt", "one.txt");
        assert!(matches!(result, Err(StoreError::DuplicatePath(_))));
        assert!(store.contains("/p/two.txt"));
    }

    #[test]
    fn test_rename_folder_rejects_separator() {
        let mut store = store_with(vec![Entry::folder("/a")]);
        let result = store.rename("/a", "/x/y", "x/y");
        assert!(matches!(result, Err(StoreError::InvalidName(_))));
    }

    #[test]
    fn test_rename_subtree_rewrites_descendants_only() {
        let mut store = store_with(vec![
            Entry::folder("/a"),
            Entry::file("/a/x"),
            Entry::folder("/a/y"),
            Entry::file("/a/y/q"),
            Entry::folder("/abc"),
        ]);

        let moved = store.rename_subtree("/a", "/z", "z").unwrap();

        assert_eq!(moved.len(), 3);
        assert!(store.contains("/z"));
        assert!(store.contains("/z/x"));
        assert!(store.contains("/z/y/q"));
        assert!(store.contains("/abc"));
        assert!(!store.contains("/a"));
        assert_eq!(store.get("/z").unwrap().name, "z");
        assert_eq!(store.get("/z/y/q").unwrap().parent_path(), "/z/y");
    }

    #[test]
    fn test_rename_subtree_collision_changes_nothing() {
        let mut store = store_with(vec![
            Entry::folder("/a"),
            Entry::file("/a/x"),
            Entry::folder("/b"),
        ]);

        let result = store.rename_subtree("/a", "/b", "b");
        assert!(matches!(result, Err(StoreError::DuplicatePath(_))));
        assert!(store.contains("/a/x"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_rename_subtree_into_itself_rejected() {
        let mut store = store_with(vec![Entry::folder("/a"), Entry::folder("/a/b")]);
        let result = store.rename_subtree("/a", "/a/b/a", "a");
        assert!(matches!(result, Err(StoreError::InvalidName(_))));
    }

    #[test]
    fn test_update_content() {
        let mut store = store_with(vec![Entry::file("/f"), Entry::folder("/d")]);

        store.update_content("/f", "hello").unwrap();
        assert_eq!(store.get("/f").unwrap().content.as_deref(), Some("hello"));

        assert!(matches!(store.update_content("/d", "x"), Err(StoreError::NotAFile(_))));
        assert!(matches!(store.update_content("/nope", "x"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_descendants_stop_at_separator() {
        let store = store_with(vec![
            Entry::folder("/test2"),
            Entry::folder("/test2/test3"),
            Entry::file("/test2/test3/index.css"),
            Entry::file("/test23"),
        ]);

        assert_eq!(store.descendants_of("/test2").count(), 2);
    }
}
