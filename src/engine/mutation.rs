//! Rename, delete, move, and content updates.

use tracing::info;

use super::{layout, ParentRef, TreeEngine, TreeError, TreeResult};
use crate::paths;
use crate::storage::{EntryCommand, Persistence};
use crate::store::EntryKind;
use crate::tree::{expansion_map, project, recompute_hidden, sort_nodes, ExpansionMap};

impl<P: Persistence> TreeEngine<P> {
    /// Rename the row at `index` in place. Returns the new path.
    pub async fn rename(&mut self, index: usize, new_name: &str) -> TreeResult<String> {
        let index = self.settle(index)?;
        let node = &self.nodes[index];
        let old_path = node.path.clone();
        let parent_path = node.parent_path.clone();
        let kind = node.kind;

        if new_name == node.name || !paths::is_valid_name(new_name) {
            return Err(TreeError::InvalidName(new_name.to_string()));
        }

        let new_path = paths::join(&parent_path, new_name);

        if layout::has_sibling(&self.nodes, &parent_path, kind, new_name) {
            return Err(TreeError::SiblingCollision(new_path));
        }

        if self.store.contains(&new_path) {
            return Err(TreeError::DuplicatePath(new_path));
        }

        match kind {
            EntryKind::File => {
                self.rename_file(index, &old_path, &new_path, new_name)
                    .await?
            }
            EntryKind::Folder => {
                self.rename_folder(index, &old_path, &new_path, new_name)
                    .await?
            }
        }

        self.interaction.rebase(&old_path, &new_path);
        Ok(new_path)
    }

    async fn rename_file(
        &mut self,
        index: usize,
        old_path: &str,
        new_path: &str,
        new_name: &str,
    ) -> TreeResult<()> {
        let seq = self
            .submit(&EntryCommand::RenameEntry {
                old_path: old_path.to_string(),
                new_path: new_path.to_string(),
                new_name: new_name.to_string(),
            })
            .await?;

        self.store.rename(old_path, new_path, new_name)?;

        let node = &mut self.nodes[index];
        node.path = new_path.to_string();
        node.name = new_name.to_string();
        let parent_path = node.parent_path.clone();

        let siblings = layout::sibling_files(&self.nodes, &parent_path);
        layout::resort(&mut self.nodes, siblings);

        info!("Renamed file {} -> {} (#{})", old_path, new_path, seq);
        Ok(())
    }

    async fn rename_folder(
        &mut self,
        index: usize,
        old_path: &str,
        new_path: &str,
        new_name: &str,
    ) -> TreeResult<()> {
        let block = layout::subtree_block(&self.nodes, index);

        let seq = self
            .submit(&EntryCommand::RenameSubtree {
                old_prefix: old_path.to_string(),
                new_prefix: new_path.to_string(),
                new_name: new_name.to_string(),
                child_paths: self.rebased_descendants(old_path, new_path),
            })
            .await?;

        let moved = self.store.rename_subtree(old_path, new_path, new_name)?;

        for node in &mut self.nodes[block] {
            node.rebase(old_path, new_path);
        }
        sort_nodes(&mut self.nodes);
        // The new prefix may already hold rows of a sparse subtree
        recompute_hidden(&mut self.nodes);

        info!(
            "Renamed folder {} -> {} with {} descendants (#{})",
            old_path,
            new_path,
            moved.len(),
            seq
        );
        Ok(())
    }

    /// Delete the row at `index`; folders go with their whole subtree.
    /// Returns the removed paths.
    pub async fn delete(&mut self, index: usize) -> TreeResult<Vec<String>> {
        let index = self.settle(index)?;
        let path = self.nodes[index].path.clone();

        let removed = if self.nodes[index].is_file() {
            let seq = self
                .submit(&EntryCommand::DeleteEntry { path: path.clone() })
                .await?;

            self.store.remove(&path)?;
            self.nodes.remove(index);

            info!("Deleted file {} (#{})", path, seq);
            vec![path.clone()]
        } else {
            let block = layout::subtree_block(&self.nodes, index);
            let removed: Vec<String> = self.nodes[block.clone()]
                .iter()
                .map(|node| node.path.clone())
                .collect();

            let seq = self
                .submit(&EntryCommand::DeleteSubtree {
                    paths: removed.clone(),
                })
                .await?;

            self.store.remove_subtree(&removed)?;
            self.nodes.drain(block);

            info!("Deleted folder {} ({} entries, #{})", path, removed.len(), seq);
            removed
        };

        self.interaction.forget(&path);
        Ok(removed)
    }

    /// Move the row at `index` under `target`. Returns the new path.
    pub async fn move_node(&mut self, index: usize, target: ParentRef) -> TreeResult<String> {
        let (target_path, _) = self.resolve_parent(target)?;
        let index = self.settle(index)?;

        let node = &self.nodes[index];
        let old_path = node.path.clone();
        let name = node.name.clone();
        let kind = node.kind;

        if node.parent_path == target_path {
            return Err(TreeError::InvalidName(format!(
                "{} is already in {}",
                old_path, target_path
            )));
        }

        if kind.is_folder() && paths::is_self_or_ancestor(&old_path, &target_path) {
            return Err(TreeError::InvalidName(format!(
                "cannot move {} into {}",
                old_path, target_path
            )));
        }

        let new_path = paths::join(&target_path, &name);

        if layout::has_sibling(&self.nodes, &target_path, kind, &name) {
            return Err(TreeError::SiblingCollision(new_path));
        }

        if self.store.contains(&new_path) {
            return Err(TreeError::DuplicatePath(new_path));
        }

        let command = match kind {
            EntryKind::File => EntryCommand::RenameEntry {
                old_path: old_path.clone(),
                new_path: new_path.clone(),
                new_name: name.clone(),
            },
            EntryKind::Folder => EntryCommand::RenameSubtree {
                old_prefix: old_path.clone(),
                new_prefix: new_path.clone(),
                new_name: name.clone(),
                child_paths: self.rebased_descendants(&old_path, &new_path),
            },
        };

        let seq = self.submit(&command).await?;
        command.apply(&mut self.store)?;

        let expansion: ExpansionMap = expansion_map(&self.nodes)
            .into_iter()
            .map(|(path, expanded)| {
                let path = paths::replace_prefix(&path, &old_path, &new_path).unwrap_or(path);
                (path, expanded)
            })
            .collect();
        self.nodes = project(self.store.iter(), &expansion);

        self.interaction.rebase(&old_path, &new_path);
        info!("Moved {} -> {} (#{})", old_path, new_path, seq);
        Ok(new_path)
    }

    /// Replace the content of the file at `path`
    pub async fn write_content(&mut self, path: &str, content: &str) -> TreeResult<()> {
        match self.store.get(path) {
            None => return Err(TreeError::NotFound(path.to_string())),
            Some(entry) if !entry.is_file() => return Err(TreeError::NotAFile(path.to_string())),
            Some(_) => {}
        }

        let seq = self
            .submit(&EntryCommand::UpdateContent {
                path: path.to_string(),
                content: content.to_string(),
            })
            .await?;

        self.store.update_content(path, content)?;
        info!("Updated {} ({} bytes, #{})", path, content.len(), seq);
        Ok(())
    }

    /// `(old, new)` paths of every stored descendant of `old_prefix`
    fn rebased_descendants(&self, old_prefix: &str, new_prefix: &str) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .store
            .descendants_of(old_prefix)
            .filter_map(|entry| {
                paths::replace_prefix(&entry.path, old_prefix, new_prefix)
                    .map(|new| (entry.path.clone(), new))
            })
            .collect();
        pairs.sort();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{engine_with, paths, row};
    use super::*;
    use crate::store::{sample_entries, Entry};

    fn nested() -> Vec<Entry> {
        vec![
            Entry::folder("/a"),
            Entry::file("/a/x"),
            Entry::folder("/a/y"),
            Entry::file("/a/y/q"),
            Entry::folder("/abc"),
            Entry::file("/abc/k"),
        ]
    }

    #[tokio::test]
    async fn test_rename_folder_rewrites_subtree_only() {
        let (persistence, mut engine) = engine_with(nested()).await;
        let a = row(&engine, "/a");

        let new_path = engine.rename(a, "z").await.unwrap();

        assert_eq!(new_path, "/z");
        assert_eq!(paths(&engine), vec!["/abc", "/abc/k", "/z", "/z/y", "/z/y/q", "/z/x"]);

        let store = engine.store();
        assert!(store.contains("/z/y/q"));
        assert!(store.contains("/abc/k"));
        assert!(!store.contains("/a/x"));
        assert_eq!(store.get("/z/y/q").unwrap().parent_path(), "/z/y");

        let node = &engine.ordered_view_nodes()[row(&engine, "/z/y/q")];
        assert_eq!(node.parent_path, "/z/y");
        assert_eq!(node.depth, 3);

        let snapshot = persistence.snapshot();
        assert!(snapshot.contains("/z/x"));
        assert!(!snapshot.contains("/a"));
    }

    #[tokio::test]
    async fn test_rename_folder_keeps_expansion() {
        let (_, mut engine) = engine_with(nested()).await;
        let a = row(&engine, "/a");
        engine.toggle(a);
        let y = row(&engine, "/a/y");

        engine.rename(a, "z").await.unwrap();

        let nodes = engine.ordered_view_nodes();
        assert!(nodes[row(&engine, "/z")].expanded);
        assert!(!nodes[row(&engine, "/z/y")].expanded);
        assert!(!nodes[row(&engine, "/z/x")].hidden);
        assert!(nodes[row(&engine, "/z/y/q")].hidden);
        assert_ne!(y, row(&engine, "/z/y"));
    }

    #[tokio::test]
    async fn test_rename_folder_onto_sparse_subtree_hides_it() {
        let (_, mut engine) = engine_with(vec![Entry::folder("/a"), Entry::file("/b/c.txt")]).await;

        engine.rename(row(&engine, "/a"), "b").await.unwrap();

        assert_eq!(paths(&engine), vec!["/b", "/b/c.txt"]);
        let nodes = engine.ordered_view_nodes();
        assert!(!nodes[0].expanded);
        assert!(nodes[1].hidden);

        let mut expected = nodes.to_vec();
        recompute_hidden(&mut expected);
        assert_eq!(nodes, expected.as_slice());
    }

    #[tokio::test]
    async fn test_rename_file_resorts_siblings() {
        let (persistence, mut engine) = engine_with(sample_entries()).await;
        let css = row(&engine, "/index.css");

        engine.rename(css, "main.css").await.unwrap();

        let order = paths(&engine);
        assert_eq!(&order[order.len() - 2..], &["/index.ts", "/main.css"]);
        assert_eq!(persistence.log().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_rejections() {
        let (persistence, mut engine) = engine_with(sample_entries()).await;
        let before = engine.ordered_view_nodes().to_vec();
        let css = row(&engine, "/index.css");
        let test = row(&engine, "/test");

        assert!(matches!(
            engine.rename(css, "").await,
            Err(TreeError::InvalidName(_))
        ));
        assert!(matches!(
            engine.rename(css, "index.css").await,
            Err(TreeError::InvalidName(_))
        ));
        assert!(matches!(
            engine.rename(css, "index.ts").await,
            Err(TreeError::SiblingCollision(_))
        ));
        assert!(matches!(
            engine.rename(css, "test").await,
            Err(TreeError::DuplicatePath(_))
        ));
        assert!(matches!(
            engine.rename(test, "a/b").await,
            Err(TreeError::InvalidName(_))
        ));
        assert!(matches!(
            engine.rename(test, "test2").await,
            Err(TreeError::SiblingCollision(_))
        ));

        assert_eq!(engine.ordered_view_nodes(), before.as_slice());
        assert!(persistence.log().is_empty());
    }

    #[tokio::test]
    async fn test_rename_rejected_by_persistence() {
        let (persistence, mut engine) = engine_with(nested()).await;
        let before = engine.ordered_view_nodes().to_vec();
        persistence.set_rejecting(true);

        let result = engine.rename(0, "z").await;

        assert!(matches!(result, Err(TreeError::PersistenceRejected(_))));
        assert_eq!(engine.ordered_view_nodes(), before.as_slice());
        assert!(engine.store().contains("/a/y/q"));
    }

    #[tokio::test]
    async fn test_rename_follows_selection() {
        let (_, mut engine) = engine_with(nested()).await;
        let q = row(&engine, "/a/y/q");
        engine.on_node_click(q, false);

        engine.rename(0, "z").await.unwrap();
        assert_eq!(engine.interaction().selected.as_deref(), Some("/z/y/q"));
    }

    #[tokio::test]
    async fn test_delete_folder_removes_block() {
        let (persistence, mut engine) = engine_with(nested()).await;

        let removed = engine.delete(row(&engine, "/a")).await.unwrap();

        assert_eq!(removed.len(), 4);
        assert_eq!(paths(&engine), vec!["/abc", "/abc/k"]);
        assert_eq!(persistence.snapshot().len(), 2);
        assert_eq!(engine.store().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_file() {
        let (_, mut engine) = engine_with(nested()).await;
        let x = row(&engine, "/a/x");
        engine.on_node_click(x, false);

        assert_eq!(engine.delete(x).await.unwrap(), vec!["/a/x".to_string()]);
        assert!(engine.index_of("/a/x").is_none());
        assert!(engine.interaction().selected.is_none());
    }

    #[tokio::test]
    async fn test_delete_rejected_keeps_rows() {
        let (persistence, mut engine) = engine_with(nested()).await;
        let before = engine.ordered_view_nodes().to_vec();
        persistence.set_rejecting(true);

        assert!(engine.delete(0).await.is_err());
        assert_eq!(engine.ordered_view_nodes(), before.as_slice());
    }

    #[tokio::test]
    async fn test_delete_discards_pending_placeholder() {
        let (_, mut engine) = engine_with(nested()).await;
        let a = row(&engine, "/a");
        engine.begin_create(ParentRef::Index(a), EntryKind::File).unwrap();

        engine.delete(a).await.unwrap();

        assert!(engine.pending_create().is_none());
        assert!(engine.ordered_view_nodes().iter().all(|n| !n.is_transient));
        assert_eq!(paths(&engine), vec!["/abc", "/abc/k"]);
    }

    #[tokio::test]
    async fn test_move_folder_under_other_folder() {
        let (persistence, mut engine) = engine_with(nested()).await;
        let a = row(&engine, "/a");
        engine.toggle(a);

        let new_path = engine
            .move_node(a, ParentRef::Index(row(&engine, "/abc")))
            .await
            .unwrap();

        assert_eq!(new_path, "/abc/a");
        assert_eq!(
            paths(&engine),
            vec!["/abc", "/abc/a", "/abc/a/y", "/abc/a/y/q", "/abc/a/x", "/abc/k"]
        );
        assert!(engine.ordered_view_nodes()[row(&engine, "/abc/a")].expanded);
        assert!(persistence.snapshot().contains("/abc/a/y/q"));
    }

    #[tokio::test]
    async fn test_move_file_to_root() {
        let (_, mut engine) = engine_with(nested()).await;

        let new_path = engine
            .move_node(row(&engine, "/a/y/q"), ParentRef::Root)
            .await
            .unwrap();

        assert_eq!(new_path, "/q");
        assert_eq!(paths(&engine).last(), Some(&"/q"));
        assert!(!engine.store().contains("/a/y/q"));
    }

    #[tokio::test]
    async fn test_move_rejections() {
        let (persistence, mut engine) = engine_with(nested()).await;
        let a = row(&engine, "/a");
        let y = row(&engine, "/a/y");
        let x = row(&engine, "/a/x");

        assert!(matches!(
            engine.move_node(a, ParentRef::Index(y)).await,
            Err(TreeError::InvalidName(_))
        ));
        assert!(matches!(
            engine.move_node(a, ParentRef::Index(a)).await,
            Err(TreeError::InvalidName(_))
        ));
        assert!(matches!(
            engine.move_node(x, ParentRef::Index(a)).await,
            Err(TreeError::InvalidName(_))
        ));
        assert!(matches!(
            engine.move_node(a, ParentRef::Index(x)).await,
            Err(TreeError::NotAFolder(_))
        ));
        assert!(persistence.log().is_empty());
    }

    #[tokio::test]
    async fn test_move_collision() {
        let (_, mut engine) = engine_with(vec![
            Entry::folder("/src"),
            Entry::file("/src/lib.rs"),
            Entry::file("/lib.rs"),
        ])
        .await;

        let result = engine
            .move_node(row(&engine, "/lib.rs"), ParentRef::Index(0))
            .await;
        assert!(matches!(result, Err(TreeError::SiblingCollision(_))));
    }

    #[tokio::test]
    async fn test_write_content() {
        let (persistence, mut engine) = engine_with(nested()).await;

        engine.write_content("/a/x", "hello").await.unwrap();

        assert_eq!(
            persistence.snapshot().get("/a/x").unwrap().content.as_deref(),
            Some("hello")
        );
        assert!(matches!(
            engine.write_content("/a", "x").await,
            Err(TreeError::NotAFile(_))
        ));
    }
}
