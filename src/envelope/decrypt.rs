use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use crate::config::ArtifactNames;
use crate::crypto::{armor, CryptoBackend, SymmetricKey, SYMMETRIC_KEY_LEN};
use crate::error::{CryptError, CryptResult};
use crate::keys::{self, KeyConverter, PassphrasePrompt, PreparedKey};

use super::output::{persist_all, Staged};
use super::{Envelope, Outcome};

impl<'a, B, C, P> Envelope<'a, B, C, P>
where
    B: CryptoBackend,
    C: KeyConverter,
    P: PassphrasePrompt,
{
    /// Decrypt `ciphertext` (a `.enc` file) with `private_key`
    ///
    /// The encrypted key is read from beside the ciphertext, and the
    /// plaintext is written into the output directory under the name the
    /// ciphertext had before `.enc` was appended.
    pub fn decrypt_file(&self, ciphertext: &Path, private_key: &Path) -> CryptResult<Outcome> {
        let names = ArtifactNames::for_ciphertext(ciphertext, self.output_dir())?;

        let prepared = keys::prepare_private_key(
            private_key,
            self.settings,
            &self.converter,
            &self.prompt,
        )?;

        if !names.encrypted_key.is_file() {
            return Err(CryptError::MissingCompanionKey(names.encrypted_key));
        }

        let key = self.recover_key(&names.encrypted_key, &prepared)?;
        prepared.release()?;

        tracing::debug!(input = %ciphertext.display(), "decrypting file");
        let mut source = File::open(ciphertext).map(BufReader::new).map_err(|e| {
            CryptError::Io(format!("Failed to open {}: {}", ciphertext.display(), e))
        })?;

        let mut bytes = 0;
        let plaintext = Staged::write(&names.plaintext, |out| {
            bytes = self.backend.symmetric_decrypt(&key, &mut source, out)?;
            Ok(())
        })?;
        drop(key);

        let written = persist_all(vec![plaintext])?;
        tracing::debug!(bytes, path = %names.plaintext.display(), "wrote plaintext");

        Ok(Outcome { written, bytes })
    }

    /// Unwrap the symmetric key stored in `encrypted_key`
    fn recover_key(
        &self,
        encrypted_key: &Path,
        prepared: &PreparedKey,
    ) -> CryptResult<SymmetricKey> {
        let armored = fs::read(encrypted_key).map_err(|e| {
            CryptError::Io(format!("Failed to read {}: {}", encrypted_key.display(), e))
        })?;
        let wrapped = armor::decode(&armored)?;

        let pem = prepared.pem_path();
        let typed;
        let passphrase = match prepared.passphrase() {
            Some(pass) => Some(pass),
            None if self.backend.private_key_needs_passphrase(pem)? => {
                typed = self
                    .prompt
                    .read_passphrase(&format!("Enter passphrase for {}: ", pem.display()))?;
                Some(&typed)
            }
            None => None,
        };
        let passphrase = passphrase.map(|p| p.as_str().as_bytes());

        let secret = self.backend.asymmetric_decrypt(pem, passphrase, &wrapped)?;
        drop(wrapped);

        SymmetricKey::from_slice(&secret).ok_or_else(|| {
            CryptError::Decryption(format!(
                "Recovered key is {} bytes, expected {}",
                secret.len(),
                SYMMETRIC_KEY_LEN
            ))
        })
    }
}
