use anyhow::Context;
use tracing::instrument;

use crate::errors::Error;

/// Report whether `path` is absent or an empty directory.
///
/// Reads at most one directory entry: this is a cheap existence probe, not
/// an audit of the full listing. Read-only, never touches the filesystem.
#[instrument]
pub async fn is_empty(path: &std::path::Path) -> Result<bool, Error> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(error) => {
            return Err(Error::io(anyhow::Error::new(error).context(format!(
                "failed reading metadata from {:?}",
                &path
            ))));
        }
    };
    if !metadata.is_dir() {
        return Err(Error::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    let mut entries = tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("cannot open directory {path:?} for reading"))
        .map_err(Error::io)?;
    let first = entries
        .next_entry()
        .await
        .with_context(|| format!("failed reading directory {path:?}"))
        .map_err(Error::io)?;
    Ok(first.is_none())
}
