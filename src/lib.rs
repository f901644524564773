//! ssh-crypt - Encrypt files for the holder of an SSH key
//!
//! This library implements hybrid envelope encryption of files using ordinary
//! SSH RSA keys. Each file is encrypted under a fresh random symmetric key and
//! that key is encrypted to the recipient's public key, so only the holder of
//! the matching private key can recover the file.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Run settings and output file naming
//! - `error`: Custom error types
//! - `keys`: Turning OpenSSH keys into PEM keys, passphrase prompts
//! - `crypto`: Symmetric and asymmetric ciphers, base64 armor
//! - `envelope`: The encrypt and decrypt workflows
//!
//! # Example
//!
//! ```rust,ignore
//! use ssh_crypt::config::{Mode, Settings};
//!
//! let mode = Mode::from_options(None, Some("~/.ssh/id_rsa".into()))?;
//! let settings = Settings::new(mode, "report.pdf.enc")?.with_env();
//! ssh_crypt::envelope::run(&settings)?;
//! ```

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keys;

pub use error::{CryptError, CryptResult};
