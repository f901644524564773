//! Scoped temporary directory for converted private keys
//!
//! The directory is created owner-only and removed recursively when the
//! guard is closed or dropped, whichever happens first.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};

use crate::error::{CryptError, CryptResult};

/// An owner-only directory that does not outlive the run
#[derive(Debug)]
pub struct TempKeyDir {
    dir: TempDir,
}

impl TempKeyDir {
    /// Create a fresh directory under the system temp location
    pub fn create() -> CryptResult<Self> {
        let mut builder = Builder::new();
        builder.prefix("ssh-crypt-");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o700));
        }

        let dir = builder.tempdir().map_err(|e| {
            CryptError::Io(format!("Failed to create temporary key directory: {}", e))
        })?;

        tracing::debug!(path = %dir.path().display(), "created temporary key directory");
        Ok(Self { dir })
    }

    /// Location of the directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to a new owner-only file inside the directory
    pub fn write_secret(&self, file_name: &str, contents: &[u8]) -> CryptResult<PathBuf> {
        let path = self.dir.path().join(file_name);

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&path)
            .map_err(|e| CryptError::Io(format!("Failed to create {}: {}", path.display(), e)))?;
        file.write_all(contents)?;
        file.sync_all()?;

        Ok(path)
    }

    /// Remove the directory and everything in it, reporting failures
    pub fn close(self) -> CryptResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            CryptError::Io(format!(
                "Failed to remove temporary key directory {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::debug!(path = %path.display(), "removed temporary key directory");
        Ok(())
    }
}
