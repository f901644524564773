//! Secure memory handling for sensitive data
//!
//! Provides types that zero memory on drop so that passphrases and the
//! one-time symmetric key do not linger after a run.

use std::fmt;
use std::ops::Deref;

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the one-time symmetric key in bytes (256 bits)
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// A string type that zeros its contents on drop
///
/// Use this for passphrases and other sensitive string data.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    /// Create a new SecureString
    pub fn new(s: impl Into<String>) -> Self {
        Self { inner: s.into() }
    }

    /// Get the string contents
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl Deref for SecureString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// Don't print the contents in Debug output
impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureString")
            .field("len", &self.inner.len())
            .finish()
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// The one-time key that encrypts a single payload
///
/// Generated fresh for every encryption and never written to disk.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; SYMMETRIC_KEY_LEN],
}

impl SymmetricKey {
    /// Generate a key from the operating system's secure random source
    ///
    /// The key is also an `openssl enc -pass file:` password, which ends at
    /// the first newline or NUL. Those bytes are redrawn so all 32 count.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SYMMETRIC_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        for byte in bytes.iter_mut() {
            while is_password_terminator(*byte) {
                let mut fresh = [0u8; 1];
                OsRng.fill_bytes(&mut fresh);
                *byte = fresh[0];
                fresh.zeroize();
            }
        }
        Self { bytes }
    }

    /// Rebuild a key from recovered bytes, if the length is right
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; SYMMETRIC_KEY_LEN] = bytes.try_into().ok()?;
        Some(Self { bytes })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.bytes
    }
}

/// Bytes where OpenSSL stops reading a password file
pub(crate) fn is_password_terminator(byte: u8) -> bool {
    byte == b'\n' || byte == 0
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_string_creation() {
        let s = SecureString::new("test");
        assert_eq!(s.as_str(), "test");
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn test_secure_string_from_string() {
        let s: SecureString = String::from("test").into();
        assert_eq!(s.as_str(), "test");
    }

    #[test]
    fn test_secure_string_debug() {
        let s = SecureString::new("secret");
        let debug = format!("{:?}", s);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("SecureString"));
    }

    #[test]
    fn test_secure_string_display() {
        let s = SecureString::new("secret");
        let display = format!("{}", s);
        assert!(!display.contains("secret"));
        assert!(display.contains("REDACTED"));
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = SymmetricKey::generate();
        let b = SymmetricKey::generate();
        assert_eq!(a.as_bytes().len(), SYMMETRIC_KEY_LEN);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_generated_keys_are_whole_openssl_passwords() {
        for _ in 0..500 {
            let key = SymmetricKey::generate();
            assert!(!key.as_bytes().iter().any(|&b| is_password_terminator(b)));
        }
    }

    #[test]
    fn test_key_from_slice_checks_length() {
        assert!(SymmetricKey::from_slice(&[7u8; 32]).is_some());
        assert!(SymmetricKey::from_slice(&[7u8; 31]).is_none());
        assert!(SymmetricKey::from_slice(&[7u8; 33]).is_none());
    }

    #[test]
    fn test_key_debug_hides_bytes() {
        let key = SymmetricKey::from_slice(&[0xAB; 32]).unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.to_lowercase().contains("ab"));
    }
}
