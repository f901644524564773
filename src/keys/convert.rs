//! OpenSSH to PEM key conversion
//!
//! Performs the same conversions as `ssh-keygen -e -m PKCS8` for public keys
//! and `ssh-keygen -p -m PEM` on a scratch copy for private keys, without
//! touching the original key file.

use std::fs;
use std::path::{Path, PathBuf};

use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use ssh_key::{Mpint, PrivateKey, PublicKey};

use crate::crypto::{asymmetric, SecureString};
use crate::error::{CryptError, CryptResult};

use super::prompt::PassphrasePrompt;
use super::temp_dir::TempKeyDir;

/// Turns native SSH keys into PEM keys the cipher backend can load
pub trait KeyConverter {
    /// Export the public key at `source` as PEM into `target`
    fn convert_public(&self, source: &Path, target: &Path) -> CryptResult<()>;

    /// Write a PEM copy of the private key at `source` into `workdir`
    ///
    /// Unlocking the original may prompt through `prompt`. With `protect`
    /// set, a new passphrase is asked for and the copy is encrypted with it.
    /// Returns the path of the copy and the passphrase protecting it.
    fn convert_private(
        &self,
        source: &Path,
        workdir: &TempKeyDir,
        protect: bool,
        prompt: &dyn PassphrasePrompt,
    ) -> CryptResult<(PathBuf, Option<SecureString>)>;
}

/// Conversion backed by the `ssh-key` and `rsa` crates
#[derive(Debug, Default, Clone, Copy)]
pub struct SshKeyConverter;

impl KeyConverter for SshKeyConverter {
    fn convert_public(&self, source: &Path, target: &Path) -> CryptResult<()> {
        let text = fs::read_to_string(source)
            .map_err(|e| CryptError::Io(format!("Failed to read {}: {}", source.display(), e)))?;

        let key = PublicKey::from_openssh(text.trim())
            .map_err(|e| CryptError::key_format(source, e))?;
        let rsa_key = key
            .key_data()
            .rsa()
            .ok_or_else(|| CryptError::UnsupportedKeyType {
                path: source.to_path_buf(),
                algorithm: key.algorithm().to_string(),
            })?;

        let public = RsaPublicKey::new(
            to_biguint(source, &rsa_key.n)?,
            to_biguint(source, &rsa_key.e)?,
        )
        .map_err(|e| CryptError::key_format(source, e))?;

        let pem = asymmetric::public_key_to_pem(&public)?;
        fs::write(target, pem)
            .map_err(|e| CryptError::Io(format!("Failed to write {}: {}", target.display(), e)))?;

        tracing::debug!(
            from = %source.display(),
            to = %target.display(),
            "exported public key as PEM"
        );
        Ok(())
    }

    fn convert_private(
        &self,
        source: &Path,
        workdir: &TempKeyDir,
        protect: bool,
        prompt: &dyn PassphrasePrompt,
    ) -> CryptResult<(PathBuf, Option<SecureString>)> {
        let text = fs::read_to_string(source)
            .map(zeroize::Zeroizing::new)
            .map_err(|e| CryptError::Io(format!("Failed to read {}: {}", source.display(), e)))?;

        let mut key = PrivateKey::from_openssh(text.trim())
            .map_err(|e| CryptError::key_format(source, e))?;

        if key.is_encrypted() {
            let passphrase =
                prompt.read_passphrase(&format!("Enter passphrase for {}: ", source.display()))?;
            key = key.decrypt(passphrase.as_str()).map_err(|_| {
                CryptError::KeyPassphrase(format!(
                    "Could not unlock {}: incorrect passphrase?",
                    source.display()
                ))
            })?;
        }

        let rsa_key = openssh_to_rsa(source, &key)?;

        let passphrase = if protect {
            Some(prompt.new_passphrase("the temporary key copy")?)
        } else {
            None
        };
        let pem = asymmetric::private_key_to_pem(
            &rsa_key,
            passphrase.as_ref().map(|p| p.as_str().as_bytes()),
        )?;

        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("private_key");
        let target = workdir.write_secret(&format!("{}.pem", file_name), pem.as_bytes())?;

        tracing::debug!(
            from = %source.display(),
            to = %target.display(),
            protected = protect,
            "converted private key to PEM"
        );
        Ok((target, passphrase))
    }
}

/// Rebuild an RSA private key from an unlocked OpenSSH key
fn openssh_to_rsa(source: &Path, key: &PrivateKey) -> CryptResult<RsaPrivateKey> {
    let keypair = key
        .key_data()
        .rsa()
        .ok_or_else(|| CryptError::UnsupportedKeyType {
            path: source.to_path_buf(),
            algorithm: key.algorithm().to_string(),
        })?;

    RsaPrivateKey::from_components(
        to_biguint(source, &keypair.public.n)?,
        to_biguint(source, &keypair.public.e)?,
        to_biguint(source, &keypair.private.d)?,
        vec![
            to_biguint(source, &keypair.private.p)?,
            to_biguint(source, &keypair.private.q)?,
        ],
    )
    .map_err(|e| CryptError::key_format(source, e))
}

fn to_biguint(source: &Path, value: &Mpint) -> CryptResult<BigUint> {
    value
        .as_positive_bytes()
        .map(BigUint::from_bytes_be)
        .ok_or_else(|| CryptError::key_format(source, "negative RSA parameter"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::prompt::testing::ScriptedPrompt;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_public_conversion_matches_ssh_keygen() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("recipient.pem");

        SshKeyConverter
            .convert_public(&fixture("recipient_rsa.pub"), &target)
            .unwrap();

        let ours = asymmetric::load_public_key(&target).unwrap();
        let theirs = asymmetric::load_public_key(&fixture("recipient_rsa_public.pem")).unwrap();
        assert_eq!(ours, theirs);
    }

    #[test]
    fn test_public_conversion_rejects_ed25519() {
        let dir = tempfile::TempDir::new().unwrap();
        let result =
            SshKeyConverter.convert_public(&fixture("ed25519.pub"), &dir.path().join("x.pem"));
        assert!(matches!(result, Err(CryptError::UnsupportedKeyType { .. })));
    }

    #[test]
    fn test_public_conversion_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("junk.pub");
        fs::write(&source, "ssh-rsa not-base64-at-all").unwrap();

        let result = SshKeyConverter.convert_public(&source, &dir.path().join("x.pem"));
        assert!(matches!(result, Err(CryptError::KeyFormat { .. })));
    }

    #[test]
    fn test_private_conversion_matches_ssh_keygen() {
        let workdir = TempKeyDir::create().unwrap();
        let prompt = ScriptedPrompt::new(&[]);

        let (target, passphrase) = SshKeyConverter
            .convert_private(&fixture("recipient_rsa"), &workdir, false, &prompt)
            .unwrap();

        assert!(target.starts_with(workdir.path()));
        assert!(passphrase.is_none());
        let ours = asymmetric::load_private_key(&target, None).unwrap();
        let theirs =
            asymmetric::load_private_key(&fixture("recipient_rsa_pkcs1.pem"), None).unwrap();
        assert_eq!(ours, theirs);
        assert!(prompt.asked.borrow().is_empty());
    }

    #[test]
    fn test_private_conversion_unlocks_and_protects() {
        let workdir = TempKeyDir::create().unwrap();
        // original first, then the new one twice, as ssh-keygen -p asks
        let prompt = ScriptedPrompt::new(&["open sesame", "temporary pass", "temporary pass"]);

        let (target, passphrase) = SshKeyConverter
            .convert_private(&fixture("protected_rsa"), &workdir, true, &prompt)
            .unwrap();

        assert_eq!(passphrase.unwrap().as_str(), "temporary pass");
        assert!(asymmetric::is_encrypted_pem(&target).unwrap());
        assert!(asymmetric::load_private_key(&target, Some(b"temporary pass")).is_ok());
        assert_eq!(prompt.asked.borrow().len(), 3);
    }

    #[test]
    fn test_private_conversion_wrong_passphrase() {
        let workdir = TempKeyDir::create().unwrap();
        let prompt = ScriptedPrompt::new(&["not it"]);

        let result =
            SshKeyConverter.convert_private(&fixture("protected_rsa"), &workdir, false, &prompt);
        assert!(matches!(result, Err(CryptError::KeyPassphrase(_))));
    }

    #[test]
    fn test_private_conversion_rejects_public_key() {
        let workdir = TempKeyDir::create().unwrap();
        let prompt = ScriptedPrompt::new(&[]);

        let source = fixture("recipient_rsa.pub");
        let result = SshKeyConverter.convert_private(&source, &workdir, false, &prompt);
        assert!(matches!(result, Err(CryptError::KeyFormat { .. })));
    }
}
