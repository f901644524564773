//! Run settings for ssh-crypt
//!
//! Everything that influences a run is gathered into [`Settings`] once, in
//! `main`, and passed explicitly into each stage.

use std::path::{Path, PathBuf};

use crate::error::{CryptError, CryptResult};

use super::paths::expand_tilde;

/// Environment variable that skips the passphrase on a converted private key
///
/// Intended for tests and automation only. The temporary PEM copy of the
/// private key is then written unencrypted for the duration of the run.
pub const NO_TEMP_PASSPHRASE_ENV: &str = "SSH_CRYPT_NO_TEMP_PASSPHRASE";

/// What a run does, and with which key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Encrypt for the holder of this public key
    Encrypt(PathBuf),
    /// Decrypt with this private key
    Decrypt(PathBuf),
}

impl Mode {
    /// Path of the key this mode operates with
    pub fn key_path(&self) -> &Path {
        match self {
            Mode::Encrypt(path) | Mode::Decrypt(path) => path,
        }
    }

    /// Build a mode from the two mutually exclusive command line options
    pub fn from_options(encrypt: Option<PathBuf>, decrypt: Option<PathBuf>) -> CryptResult<Self> {
        match (encrypt, decrypt) {
            (Some(key), None) => Ok(Mode::Encrypt(expand_tilde(key)?)),
            (None, Some(key)) => Ok(Mode::Decrypt(expand_tilde(key)?)),
            (Some(_), Some(_)) => Err(CryptError::Usage(
                "Specify either --encrypt or --decrypt, not both".into(),
            )),
            (None, None) => Err(CryptError::Usage(
                "One of --encrypt or --decrypt is required".into(),
            )),
        }
    }
}

/// Settings for a single encryption or decryption run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Encrypt or decrypt, with the key to use
    pub mode: Mode,

    /// File to encrypt, or `.enc` file to decrypt
    pub input: PathBuf,

    /// Directory receiving the output files
    pub output_dir: PathBuf,

    /// Write the converted temporary private key without a passphrase
    pub allow_passphraseless_temp_key: bool,
}

impl Settings {
    /// Create settings writing into the current working directory
    pub fn new(mode: Mode, input: impl Into<PathBuf>) -> CryptResult<Self> {
        let output_dir = std::env::current_dir().map_err(|e| {
            CryptError::Config(format!("Could not determine current directory: {}", e))
        })?;

        Ok(Self {
            mode,
            input: input.into(),
            output_dir,
            allow_passphraseless_temp_key: false,
        })
    }

    /// Write output files into `dir` instead of the current directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Apply toggles read from the process environment
    pub fn with_env(mut self) -> Self {
        if let Ok(value) = std::env::var(NO_TEMP_PASSPHRASE_ENV) {
            self.allow_passphraseless_temp_key = parse_toggle(&value);
        }
        self
    }
}

/// Interpret an environment toggle value
pub fn parse_toggle(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
