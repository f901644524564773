//! Cryptographic functions for ssh-crypt
//!
//! Bulk data is encrypted with AES-256-CBC under a random per-file key, and
//! that key is wrapped with the recipient's RSA key using OAEP. Both outputs
//! are base64 armored and readable by the OpenSSL command line tools.

pub mod armor;
pub mod asymmetric;
pub mod secure_memory;
pub mod symmetric;

use std::io::{Read, Write};
use std::path::Path;

use zeroize::Zeroizing;

use crate::error::CryptResult;

pub use secure_memory::{SecureString, SymmetricKey, SYMMETRIC_KEY_LEN};

/// Cipher operations the envelope needs
///
/// Keys are passed as paths to PEM files; preparing those files is the job
/// of [`crate::keys`].
pub trait CryptoBackend {
    /// Fresh random symmetric key
    fn random_key(&self) -> SymmetricKey;

    /// Encrypt `reader` into armored ciphertext on `writer`
    fn symmetric_encrypt(
        &self,
        key: &SymmetricKey,
        reader: &mut dyn Read,
        writer: &mut dyn Write,
    ) -> CryptResult<u64>;

    /// Decrypt armored ciphertext from `reader` onto `writer`
    fn symmetric_decrypt(
        &self,
        key: &SymmetricKey,
        reader: &mut dyn Read,
        writer: &mut dyn Write,
    ) -> CryptResult<u64>;

    /// Encrypt a short secret to the public key at `public_pem`
    fn asymmetric_encrypt(&self, public_pem: &Path, data: &[u8]) -> CryptResult<Vec<u8>>;

    /// Decrypt a short secret with the private key at `private_pem`
    fn asymmetric_decrypt(
        &self,
        private_pem: &Path,
        passphrase: Option<&[u8]>,
        data: &[u8],
    ) -> CryptResult<Zeroizing<Vec<u8>>>;

    /// Whether loading the private key at `private_pem` needs a passphrase
    fn private_key_needs_passphrase(&self, private_pem: &Path) -> CryptResult<bool>;
}

/// Pure Rust backend built on RustCrypto
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCryptoBackend;

impl CryptoBackend for RustCryptoBackend {
    fn random_key(&self) -> SymmetricKey {
        SymmetricKey::generate()
    }

    fn symmetric_encrypt(
        &self,
        key: &SymmetricKey,
        reader: &mut dyn Read,
        writer: &mut dyn Write,
    ) -> CryptResult<u64> {
        symmetric::encrypt_stream(key, reader, writer)
    }

    fn symmetric_decrypt(
        &self,
        key: &SymmetricKey,
        reader: &mut dyn Read,
        writer: &mut dyn Write,
    ) -> CryptResult<u64> {
        symmetric::decrypt_stream(key, reader, writer)
    }

    fn asymmetric_encrypt(&self, public_pem: &Path, data: &[u8]) -> CryptResult<Vec<u8>> {
        let key = asymmetric::load_public_key(public_pem)?;
        asymmetric::encrypt(&key, data)
    }

    fn asymmetric_decrypt(
        &self,
        private_pem: &Path,
        passphrase: Option<&[u8]>,
        data: &[u8],
    ) -> CryptResult<Zeroizing<Vec<u8>>> {
        let key = asymmetric::load_private_key(private_pem, passphrase)?;
        asymmetric::decrypt(&key, data)
    }

    fn private_key_needs_passphrase(&self, private_pem: &Path) -> CryptResult<bool> {
        asymmetric::is_encrypted_pem(private_pem)
    }
}
