//! Staged output files
//!
//! Outputs are written to randomly named temporary files in the destination
//! directory and only renamed into place once everything succeeded.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};

use crate::error::{CryptError, CryptResult};

/// A fully written temporary file waiting to be persisted
pub(crate) struct Staged {
    file: NamedTempFile,
    target: PathBuf,
}

impl Staged {
    /// Write a new temporary file next to `target` using `fill`
    pub fn write<F>(target: &Path, fill: F) -> CryptResult<Self>
    where
        F: FnOnce(&mut dyn Write) -> CryptResult<()>,
    {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut file = Builder::new()
            .prefix(".ssh-crypt-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| {
                CryptError::Io(format!(
                    "Failed to create temporary file in {}: {}",
                    dir.display(),
                    e
                ))
            })?;

        {
            let mut writer = BufWriter::new(file.as_file_mut());
            fill(&mut writer)?;
            writer.flush()?;
        }
        file.as_file().sync_all()?;

        Ok(Self {
            file,
            target: target.to_path_buf(),
        })
    }

    /// Rename the temporary file to its final name
    pub fn persist(self) -> CryptResult<PathBuf> {
        let target = self.target;
        self.file.persist(&target).map_err(|e| {
            CryptError::Io(format!("Failed to write {}: {}", target.display(), e.error))
        })?;
        Ok(target)
    }
}

/// Persist every staged file, or none of them
///
/// Files already renamed into place are removed again if a later one fails.
pub(crate) fn persist_all(staged: Vec<Staged>) -> CryptResult<Vec<PathBuf>> {
    let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());

    for file in staged {
        match file.persist() {
            Ok(path) => written.push(path),
            Err(err) => {
                for path in &written {
                    if let Err(e) = std::fs::remove_file(path) {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "could not remove partial output"
                        );
                    }
                }
                return Err(err);
            }
        }
    }

    Ok(written)
}
