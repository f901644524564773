//! Path management for ssh-crypt
//!
//! Resolves key paths given on the command line and derives every file name
//! a run reads or writes.
//!
//! ## Naming conventions
//!
//! Given an input `name.ext`:
//! - encryption writes `name.ext.enc` and `name.ext.symmetric-key.enc`
//! - decryption of `name.ext.enc` reads `name.ext.symmetric-key.enc` from the
//!   same directory and writes `name.ext`

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{CryptError, CryptResult};

/// Suffix appended to the ciphertext file
pub const CIPHERTEXT_SUFFIX: &str = ".enc";

/// Suffix appended to the armored, asymmetrically encrypted symmetric key
pub const ENCRYPTED_KEY_SUFFIX: &str = ".symmetric-key.enc";

/// Suffix of the PEM file exported next to a converted OpenSSH public key
pub const PEM_SUFFIX: &str = ".pem";

/// Expand a leading `~` to the caller's home directory
///
/// Only the bare `~` and `~/...` forms are expanded; `~user` is left alone.
pub fn expand_tilde(path: impl AsRef<Path>) -> CryptResult<PathBuf> {
    let path = path.as_ref();
    if !path.starts_with("~") {
        return Ok(path.to_path_buf());
    }

    let dirs = directories::BaseDirs::new()
        .ok_or_else(|| CryptError::Config("Could not determine home directory".into()))?;
    Ok(expand_tilde_with(path, dirs.home_dir()))
}

/// Expand a leading `~` against an explicit home directory
pub fn expand_tilde_with(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => home.to_path_buf(),
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Sibling path where an exported PEM public key is written
pub fn public_pem_sibling(key_path: &Path) -> PathBuf {
    append_suffix(key_path, PEM_SUFFIX)
}

/// The set of files involved in one envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    /// Plaintext file (input of encryption, output of decryption)
    pub plaintext: PathBuf,
    /// Armored ciphertext file
    pub ciphertext: PathBuf,
    /// Armored encrypted symmetric key
    pub encrypted_key: PathBuf,
}

impl ArtifactNames {
    /// Derive output names for encrypting `input` into `out_dir`
    pub fn for_plaintext(input: &Path, out_dir: &Path) -> CryptResult<Self> {
        let name = input.file_name().ok_or_else(|| {
            CryptError::Usage(format!("Not a file path: {}", input.display()))
        })?;

        Ok(Self {
            plaintext: input.to_path_buf(),
            ciphertext: out_dir.join(with_suffix(name.into(), CIPHERTEXT_SUFFIX)),
            encrypted_key: out_dir.join(with_suffix(name.into(), ENCRYPTED_KEY_SUFFIX)),
        })
    }

    /// Derive names for decrypting `ciphertext` into `out_dir`
    ///
    /// The encrypted key is looked up next to the ciphertext, not in `out_dir`.
    pub fn for_ciphertext(ciphertext: &Path, out_dir: &Path) -> CryptResult<Self> {
        let name = ciphertext
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                CryptError::Usage(format!("Not a file path: {}", ciphertext.display()))
            })?;

        let stem = name
            .strip_suffix(CIPHERTEXT_SUFFIX)
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| {
                CryptError::Usage(format!(
                    "Encrypted file name must end in '{}': {}",
                    CIPHERTEXT_SUFFIX, name
                ))
            })?;

        let source_dir = ciphertext.parent().unwrap_or_else(|| Path::new(""));

        Ok(Self {
            plaintext: out_dir.join(stem),
            ciphertext: ciphertext.to_path_buf(),
            encrypted_key: source_dir.join(format!("{}{}", stem, ENCRYPTED_KEY_SUFFIX)),
        })
    }
}

fn with_suffix(mut name: OsString, suffix: &str) -> OsString {
    name.push(suffix);
    name
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(with_suffix(path.as_os_str().to_os_string(), suffix))
}
