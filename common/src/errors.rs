/// Error type for migration operations.
///
/// Filesystem failures are carried as [`anyhow::Error`] chains so call sites
/// keep their path context; the remaining variants are conditions callers
/// are expected to match on.
///
/// # Logging Convention
/// The Display implementation of the `Io` variant shows the full error
/// chain, so it can be logged with any format specifier:
/// ```ignore
/// tracing::error!("migration failed: {}", &error);
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A stat/open/read/write/chmod/chown/sync call failed.
    #[error("{source:#}")]
    Io {
        #[source]
        source: anyhow::Error,
    },

    /// The path exists but is not a directory.
    #[error("{path:?} exists but is not a directory")]
    NotADirectory { path: std::path::PathBuf },

    /// The source directory is absent or holds no entries.
    #[error("the source directory {path:?} is empty")]
    SourceEmpty { path: std::path::PathBuf },

    /// The owner override is not a valid numeric uid.
    #[error("invalid owner uid: {value:?}")]
    InvalidUserId { value: String },

    /// The group override is not a valid numeric gid.
    #[error("invalid group gid: {value:?}")]
    InvalidGroupId { value: String },

    /// The operation was interrupted through its cancellation token.
    #[error("the operation was cancelled")]
    Cancelled,
}

impl Error {
    #[must_use]
    pub fn io(source: anyhow::Error) -> Self {
        Error::Io { source }
    }
}
