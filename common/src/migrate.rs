use tracing::instrument;

use crate::copy;
use crate::errors::Error;
use crate::events::EventSink;
use crate::ownership::Ownership;
use crate::probe;

/// One migration: where to copy from and to, plus the optional ownership
/// override as numeric-ID strings (empty string = leave as is).
#[derive(Clone, Debug)]
pub struct Request {
    pub source: std::path::PathBuf,
    pub destination: std::path::PathBuf,
    pub owner: String,
    pub group: String,
}

/// How a migration run ended.
#[derive(Debug)]
pub enum Outcome {
    /// The source tree was copied into the destination.
    Migrated(copy::Summary),
    /// The destination already holds data; nothing was copied.
    AlreadyMigrated,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Migrated(summary) => write!(f, "{summary}"),
            Outcome::AlreadyMigrated => write!(f, "destination not empty, nothing copied"),
        }
    }
}

/// Run one migration.
///
/// An empty (or absent) source is fatal. A non-empty destination means the
/// data was migrated by an earlier run: the copy is skipped and the run
/// still counts as a success, which makes the whole operation idempotent.
/// There is no rollback: after an error or a cancellation the entries
/// already copied stay on disk, and the next run will find the destination
/// non-empty and refuse to touch it.
#[instrument(skip(token, events))]
pub async fn migrate(
    request: &Request,
    token: &tokio_util::sync::CancellationToken,
    events: &dyn EventSink,
) -> Result<Outcome, Error> {
    let ownership = Ownership::parse(&request.owner, &request.group)?;
    if probe::is_empty(&request.source).await? {
        return Err(Error::SourceEmpty {
            path: request.source.clone(),
        });
    }
    if !probe::is_empty(&request.destination).await? {
        tracing::info!(
            "the destination directory {:?} is not empty, migration is not required",
            &request.destination
        );
        return Ok(Outcome::AlreadyMigrated);
    }
    tracing::info!(
        "copying data from {:?} to {:?}",
        &request.source,
        &request.destination
    );
    let summary = copy::copy(
        &request.source,
        &request.destination,
        &copy::Settings { ownership },
        token,
        events,
    )
    .await?;
    Ok(Outcome::Migrated(summary))
}
