use std::os::unix::fs::PermissionsExt;

use anyhow::Context;
use tracing::instrument;

use crate::errors::Error;
use crate::events::EventSink;
use crate::ownership::Ownership;
use crate::walk::{Node, NodeKind, TreeWalk};

/// Mode for the destination root when it has to be created from scratch;
/// the walk overwrites it with the source root's mode right after.
const DEFAULT_DIR_MODE: u32 = 0o755;

/// Read buffer for the chunked file copy. Bounds memory use regardless of
/// file size.
const CHUNK_SIZE: usize = 32 * 1024;

#[derive(Copy, Clone, Debug, Default)]
pub struct Settings {
    pub ownership: Ownership,
}

#[derive(Copy, Clone, Debug, Default, serde::Serialize)]
pub struct Summary {
    pub bytes_copied: u64,
    pub files_copied: usize,
    pub symlinks_created: usize,
    pub directories_created: usize,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            bytes_copied: self.bytes_copied + other.bytes_copied,
            files_copied: self.files_copied + other.files_copied,
            symlinks_created: self.symlinks_created + other.symlinks_created,
            directories_created: self.directories_created + other.directories_created,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bytes copied: {}\n\
            files copied: {}\n\
            symlinks created: {}\n\
            directories created: {}",
            bytesize::ByteSize(self.bytes_copied),
            self.files_copied,
            self.symlinks_created,
            self.directories_created,
        )
    }
}

/// Replicate everything under `src` into `dst`, preserving relative paths
/// and permission bits and applying the ownership override from `settings`
/// to every created entry.
///
/// The walk is sequential and aborts on the first error; entries created
/// before the failure are left on disk. The cancellation token is checked
/// before each node and before each chunk of file content, so cancellation
/// latency is bounded by a single chunk write rather than a subtree.
#[instrument(skip(token, events))]
pub async fn copy(
    src: &std::path::Path,
    dst: &std::path::Path,
    settings: &Settings,
    token: &tokio_util::sync::CancellationToken,
    events: &dyn EventSink,
) -> Result<Summary, Error> {
    tracing::debug!("ensuring the destination root exists");
    match tokio::fs::metadata(dst).await {
        Ok(_) => {}
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            let mut builder = tokio::fs::DirBuilder::new();
            builder.recursive(true);
            builder.mode(DEFAULT_DIR_MODE);
            builder
                .create(dst)
                .await
                .with_context(|| format!("cannot create directory {dst:?}"))
                .map_err(Error::io)?;
        }
        Err(error) => {
            return Err(Error::io(anyhow::Error::new(error).context(format!(
                "failed reading metadata from {:?}",
                &dst
            ))));
        }
    }
    let mut summary = Summary::default();
    let mut walk = TreeWalk::new(src);
    while let Some(node) = walk.next_node().await? {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let dst_path = rebase(src, dst, &node.path)?;
        match copy_node(&node, &dst_path, settings, token, events).await {
            Ok(node_summary) => summary = summary + node_summary,
            Err(error) => {
                events.entry_failed(&node.path, &error);
                return Err(error);
            }
        }
    }
    Ok(summary)
}

/// Re-root `path` from under `src_root` to under `dst_root`.
fn rebase(
    src_root: &std::path::Path,
    dst_root: &std::path::Path,
    path: &std::path::Path,
) -> Result<std::path::PathBuf, Error> {
    let suffix = path
        .strip_prefix(src_root)
        .with_context(|| format!("path {path:?} is not under {src_root:?}"))
        .map_err(Error::io)?;
    Ok(dst_root.join(suffix))
}

async fn copy_node(
    node: &Node,
    dst: &std::path::Path,
    settings: &Settings,
    token: &tokio_util::sync::CancellationToken,
    events: &dyn EventSink,
) -> Result<Summary, Error> {
    let kind = node.kind();
    events.entry_started(kind, &node.path, dst);
    let mut summary = Summary::default();
    match kind {
        NodeKind::Directory => {
            let mut builder = tokio::fs::DirBuilder::new();
            builder.recursive(true);
            builder.mode(node.metadata.permissions().mode() & 0o7777);
            builder
                .create(dst)
                .await
                .with_context(|| format!("cannot create directory {dst:?}"))
                .map_err(Error::io)?;
            summary.directories_created += 1;
        }
        NodeKind::File => {
            summary.bytes_copied += copy_file(&node.path, dst, token).await?;
            summary.files_copied += 1;
        }
        NodeKind::Symlink => {
            let target = tokio::fs::read_link(&node.path)
                .await
                .with_context(|| format!("failed reading symlink {:?}", &node.path))
                .map_err(Error::io)?;
            tokio::fs::symlink(&target, dst)
                .await
                .with_context(|| format!("failed creating symlink {dst:?}"))
                .map_err(Error::io)?;
            summary.symlinks_created += 1;
        }
    }
    // directory creation is subject to umask and file creation uses a fixed
    // default, set the source mode explicitly (symlink modes are not
    // meaningful on Linux)
    if kind != NodeKind::Symlink {
        let mode = node.metadata.permissions().mode() & 0o7777;
        tokio::fs::set_permissions(dst, std::fs::Permissions::from_mode(mode))
            .await
            .with_context(|| format!("cannot set {dst:?} permissions to {mode:o}"))
            .map_err(Error::io)?;
    }
    if settings.ownership.any() {
        settings.ownership.apply(dst).await?;
    }
    events.entry_copied(kind, &node.path, dst);
    Ok(summary)
}

/// Copy the full byte content of `src` to `dst`, creating or truncating
/// `dst`.
///
/// Content moves in [`CHUNK_SIZE`] chunks with a cancellation check before
/// each read; the destination is synced to stable storage before returning
/// so a crash right after the migration cannot lose the tail of the data.
/// Both handles are scoped to this call and released on every exit path.
#[instrument(skip(token))]
async fn copy_file(
    src: &std::path::Path,
    dst: &std::path::Path,
    token: &tokio_util::sync::CancellationToken,
) -> Result<u64, Error> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    let mut reader = tokio::fs::File::open(src)
        .await
        .with_context(|| format!("cannot open {src:?} for reading"))
        .map_err(Error::io)?;
    let mut writer = tokio::fs::File::create(dst)
        .await
        .with_context(|| format!("cannot open {dst:?} for writing"))
        .map_err(Error::io)?;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut bytes_copied = 0u64;
    loop {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let count = reader
            .read(&mut buffer)
            .await
            .with_context(|| format!("failed reading {src:?}"))
            .map_err(Error::io)?;
        if count == 0 {
            break;
        }
        writer
            .write_all(&buffer[..count])
            .await
            .with_context(|| format!("failed writing {dst:?}"))
            .map_err(Error::io)?;
        bytes_copied += count as u64;
    }
    writer
        .sync_all()
        .await
        .with_context(|| format!("failed syncing {dst:?}"))
        .map_err(Error::io)?;
    Ok(bytes_copied)
}
