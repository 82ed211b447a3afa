use anyhow::Context;

use crate::errors::Error;

/// What a [`Node`] refers to on disk.
///
/// Symlinks are reported as themselves, never resolved to their target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
    Symlink,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Directory => write!(f, "directory"),
            NodeKind::File => write!(f, "file"),
            NodeKind::Symlink => write!(f, "symlink"),
        }
    }
}

/// A single entry produced by [`TreeWalk`].
#[derive(Debug)]
pub struct Node {
    pub path: std::path::PathBuf,
    pub metadata: std::fs::Metadata,
}

impl Node {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        let file_type = self.metadata.file_type();
        if file_type.is_dir() {
            NodeKind::Directory
        } else if file_type.is_symlink() {
            NodeKind::Symlink
        } else {
            NodeKind::File
        }
    }
}

/// Lazy pre-order traversal of a directory tree.
///
/// Every directory is yielded strictly before its contents, so a consumer
/// replicating the tree can create each parent before the entries below it.
/// The sequence is finite and not restartable; dropping it mid-walk simply
/// stops the traversal.
///
/// Metadata comes from `symlink_metadata`, so symlinks are yielded as
/// [`NodeKind::Symlink`] nodes and never followed into.
#[derive(Debug)]
pub struct TreeWalk {
    pending: Vec<std::path::PathBuf>,
}

impl TreeWalk {
    #[must_use]
    pub fn new(root: &std::path::Path) -> Self {
        Self {
            pending: vec![root.to_path_buf()],
        }
    }

    /// Produce the next node in pre-order, or `None` once the tree is
    /// exhausted.
    ///
    /// Directory listings are drained and the handle dropped before this
    /// returns, so the walk holds no open descriptors across yields.
    pub async fn next_node(&mut self) -> Result<Option<Node>, Error> {
        let Some(path) = self.pending.pop() else {
            return Ok(None);
        };
        let metadata = tokio::fs::symlink_metadata(&path)
            .await
            .with_context(|| format!("failed reading metadata from {:?}", &path))
            .map_err(Error::io)?;
        if metadata.is_dir() {
            let mut entries = tokio::fs::read_dir(&path)
                .await
                .with_context(|| format!("cannot open directory {path:?} for reading"))
                .map_err(Error::io)?;
            let first_child = self.pending.len();
            while let Some(entry) = entries
                .next_entry()
                .await
                .with_context(|| format!("failed traversing directory {:?}", &path))
                .map_err(Error::io)?
            {
                self.pending.push(entry.path());
            }
            // the stack pops from the back, keep the listing order
            self.pending[first_child..].reverse();
        }
        Ok(Some(Node { path, metadata }))
    }
}

#[cfg(test)]
mod walk_tests {
    use crate::testutils;
    use tracing_test::traced_test;

    use super::*;

    async fn collect(root: &std::path::Path) -> Result<Vec<Node>, Error> {
        let mut walk = TreeWalk::new(root);
        let mut nodes = vec![];
        while let Some(node) = walk.next_node().await? {
            nodes.push(node);
        }
        Ok(nodes)
    }

    #[tokio::test]
    #[traced_test]
    async fn parents_come_before_children() -> Result<(), anyhow::Error> {
        let tmp_dir = testutils::setup_test_dir().await?;
        let root = tmp_dir.join("foo");
        let nodes = collect(&root).await?;
        assert_eq!(nodes[0].path, root);
        let mut seen = std::collections::HashSet::new();
        for node in &nodes {
            if node.path != root {
                let parent = node.path.parent().unwrap();
                assert!(seen.contains(parent), "{:?} yielded before its parent", &node.path);
            }
            seen.insert(node.path.clone());
        }
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn every_entry_yielded_exactly_once() -> Result<(), anyhow::Error> {
        let tmp_dir = testutils::setup_test_dir().await?;
        let nodes = collect(&tmp_dir.join("foo")).await?;
        // foo + 0.txt + bar + 3 files + baz + 4.txt + 5.txt symlink
        assert_eq!(nodes.len(), 9);
        let unique: std::collections::HashSet<_> = nodes.iter().map(|n| n.path.clone()).collect();
        assert_eq!(unique.len(), nodes.len());
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn symlinks_are_not_followed() -> Result<(), anyhow::Error> {
        let tmp_dir = testutils::setup_test_dir().await?;
        let nodes = collect(&tmp_dir.join("foo")).await?;
        let link = nodes
            .iter()
            .find(|n| n.path.file_name().unwrap() == "5.txt")
            .unwrap();
        assert_eq!(link.kind(), NodeKind::Symlink);
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn single_file_root_yields_one_node() -> Result<(), anyhow::Error> {
        let tmp_dir = testutils::create_temp_dir().await?;
        let file_path = tmp_dir.join("only.txt");
        tokio::fs::write(&file_path, "only").await?;
        let nodes = collect(&file_path).await?;
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind(), NodeKind::File);
        Ok(())
    }
}
