//! Entry store module: the flat, path-indexed system of record.
//!
//! This module provides:
//! - `Entry` records for files and folders keyed by absolute path
//! - The `EntryStore` with create, delete, rename and content primitives
//! - The sample namespace used to seed an empty workspace

mod entry_store;

pub use entry_store::{EntryStore, StoreError, StoreResult};

use serde::{Deserialize, Serialize};

use crate::paths;

/// Kind of namespace entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

impl EntryKind {
    pub fn is_folder(self) -> bool {
        self == Self::Folder
    }

    pub fn is_file(self) -> bool {
        self == Self::File
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file or folder in the namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute `/`-separated path, unique in the store
    pub path: String,
    /// Last path segment
    pub name: String,
    pub kind: EntryKind,
    /// File content; always `None` for folders
    pub content: Option<String>,
}

impl Entry {
    /// Create an entry. Files always carry content (empty if none is given),
    /// folders never do.
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        kind: EntryKind,
        content: Option<String>,
    ) -> Self {
        let content = match kind {
            EntryKind::File => Some(content.unwrap_or_default()),
            EntryKind::Folder => None,
        };

        Self {
            path: path.into(),
            name: name.into(),
            kind,
            content,
        }
    }

    /// Create an empty file entry, deriving the name from the path
    pub fn file(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = paths::base_name(&path).to_string();
        Self::new(path, name, EntryKind::File, None)
    }

    /// Create a folder entry, deriving the name from the path
    pub fn folder(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = paths::base_name(&path).to_string();
        Self::new(path, name, EntryKind::Folder, None)
    }

    /// Set the file content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        if self.kind.is_file() {
            self.content = Some(content.into());
        }
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Parent path, `/` for top-level entries
    pub fn parent_path(&self) -> &str {
        paths::parent_path(&self.path)
    }
}

/// The namespace a fresh workspace starts with
pub fn sample_entries() -> Vec<Entry> {
    vec![
        Entry::file("/index.ts"),
        Entry::file("/index.css"),
        Entry::folder("/A"),
        Entry::folder("/a"),
        Entry::folder("/test2/test3"),
        Entry::file("/test2/test3/index.css"),
        Entry::folder("/test2/test3/test4"),
        Entry::file("/test2/test3/test4/index.js"),
        Entry::folder("/test"),
        Entry::file("/test/haha.css"),
        Entry::folder("/test/test"),
        Entry::file("/test/test/aaa.ts"),
        Entry::file("/test/test/index.js"),
        Entry::folder("/test2"),
    ]
}
