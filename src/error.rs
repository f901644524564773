//! Custom error types for ssh-crypt
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Exit status for command line usage errors (sysexits `EX_USAGE`)
pub const EXIT_USAGE: i32 = 64;

/// Exit status for bad input data, keys or ciphertexts (sysexits `EX_DATAERR`)
pub const EXIT_DATA: i32 = 65;

/// Exit status for I/O failures (sysexits `EX_IOERR`)
pub const EXIT_IO: i32 = 74;

/// The main error type for ssh-crypt operations
#[derive(Error, Debug)]
pub enum CryptError {
    /// Contradictory or malformed invocation
    #[error("Usage error: {0}")]
    Usage(String),

    /// The file to encrypt or decrypt does not exist
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The supplied key file does not exist
    #[error("Key file not found: {}", .0.display())]
    KeyNotFound(PathBuf),

    /// The key file could not be parsed
    #[error("Malformed key {}: {reason}", path.display())]
    KeyFormat { path: PathBuf, reason: String },

    /// The key parsed but is not usable for RSA encryption
    #[error("Unsupported key type {algorithm} in {}: only RSA keys can encrypt", path.display())]
    UnsupportedKeyType { path: PathBuf, algorithm: String },

    /// Unlocking or protecting a private key failed
    #[error("Passphrase error: {0}")]
    KeyPassphrase(String),

    /// The encrypted symmetric key that belongs to a ciphertext is absent
    #[error("Encrypted symmetric key not found: {}", .0.display())]
    MissingCompanionKey(PathBuf),

    /// Encryption errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Decryption errors (wrong key, corrupted or tampered data)
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CryptError {
    /// Create a "malformed key" error for the given key file
    pub fn key_format(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::KeyFormat {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Check if this is a usage error
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_) | Self::InputNotFound(_))
    }

    /// Check if this error came from loading or converting key material
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound(_)
                | Self::KeyFormat { .. }
                | Self::UnsupportedKeyType { .. }
                | Self::KeyPassphrase(_)
        )
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::InputNotFound(_) | Self::Config(_) => EXIT_USAGE,
            Self::Io(_) => EXIT_IO,
            _ => EXIT_DATA,
        }
    }
}

impl From<std::io::Error> for CryptError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for ssh-crypt operations
pub type CryptResult<T> = Result<T, CryptError>;
