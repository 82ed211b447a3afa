use anyhow::Context;
use tracing::instrument;

use crate::errors::Error;

/// Optional uid/gid override applied to every entry the copier creates.
///
/// Identifiers are supplied as numeric-ID strings; an empty string leaves
/// the corresponding id unchanged.
#[derive(Copy, Clone, Debug, Default)]
pub struct Ownership {
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

impl Ownership {
    /// Parse owner/group numeric-ID strings into an override.
    pub fn parse(owner: &str, group: &str) -> Result<Self, Error> {
        let uid = if owner.is_empty() {
            None
        } else {
            Some(owner.parse::<u32>().map_err(|_| Error::InvalidUserId {
                value: owner.to_string(),
            })?)
        };
        let gid = if group.is_empty() {
            None
        } else {
            Some(group.parse::<u32>().map_err(|_| Error::InvalidGroupId {
                value: group.to_string(),
            })?)
        };
        Ok(Self { uid, gid })
    }

    /// True when applying this override would change anything.
    #[must_use]
    pub fn any(&self) -> bool {
        self.uid.is_some() || self.gid.is_some()
    }

    /// Change the owner and/or group of `path` to the requested ids; unset
    /// ids are passed to the kernel as "no change" sentinels.
    ///
    /// Symlinks are changed themselves, never their targets.
    #[instrument]
    pub async fn apply(&self, path: &std::path::Path) -> Result<(), Error> {
        let ownership = *self;
        let dst = path.to_owned();
        let chown = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let uid = ownership.uid.map(nix::unistd::Uid::from_raw);
            let gid = ownership.gid.map(nix::unistd::Gid::from_raw);
            nix::unistd::fchownat(
                nix::fcntl::AT_FDCWD,
                &dst,
                uid,
                gid,
                nix::fcntl::AtFlags::AT_SYMLINK_NOFOLLOW,
            )
            .with_context(|| {
                format!(
                    "cannot set {:?} owner to {:?} and/or group id to {:?}",
                    &dst, &uid, &gid
                )
            })?;
            Ok(())
        });
        chown
            .await
            .context("chown task failed")
            .map_err(Error::io)?
            .map_err(Error::io)
    }
}
