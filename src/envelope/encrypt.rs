use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use crate::config::ArtifactNames;
use crate::crypto::{armor, CryptoBackend};
use crate::error::{CryptError, CryptResult};
use crate::keys::{self, KeyConverter, PassphrasePrompt};

use super::output::{persist_all, Staged};
use super::{Envelope, Outcome};

impl<'a, B, C, P> Envelope<'a, B, C, P>
where
    B: CryptoBackend,
    C: KeyConverter,
    P: PassphrasePrompt,
{
    /// Encrypt `input` for the holder of `public_key`
    ///
    /// Writes `<name>.enc` and `<name>.symmetric-key.enc` into the output
    /// directory. Either both appear or neither does.
    pub fn encrypt_file(&self, input: &Path, public_key: &Path) -> CryptResult<Outcome> {
        let names = ArtifactNames::for_plaintext(input, self.output_dir())?;

        let recipient = keys::prepare_public_key(public_key, &self.converter)?;
        if recipient.was_converted() {
            tracing::info!(
                pem = %recipient.pem_path().display(),
                "exported recipient public key as PEM"
            );
        }

        let key = self.backend.random_key();

        tracing::debug!(input = %input.display(), "encrypting file");
        let mut source = open_input(input)?;
        let mut bytes = 0;
        let ciphertext = Staged::write(&names.ciphertext, |out| {
            bytes = self.backend.symmetric_encrypt(&key, &mut source, out)?;
            Ok(())
        })?;
        tracing::debug!(bytes, "encrypted file contents");

        let wrapped = self
            .backend
            .asymmetric_encrypt(recipient.pem_path(), key.as_bytes())?;
        drop(key);
        tracing::debug!(len = wrapped.len(), "encrypted symmetric key");

        let armored_key = armor::encode(&wrapped)?;
        let encrypted_key = Staged::write(&names.encrypted_key, |out| {
            Ok(out.write_all(&armored_key)?)
        })?;

        let written = persist_all(vec![ciphertext, encrypted_key])?;
        for path in &written {
            tracing::debug!(path = %path.display(), "wrote");
        }

        Ok(Outcome { written, bytes })
    }
}

fn open_input(path: &Path) -> CryptResult<BufReader<File>> {
    File::open(path).map(BufReader::new).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CryptError::InputNotFound(path.to_path_buf())
        } else {
            CryptError::Io(format!("Failed to open {}: {}", path.display(), e))
        }
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::super::test_support::*;
    use crate::config::Mode;
    use crate::crypto::asymmetric;
    use crate::error::CryptError;

    #[test]
    fn test_outputs_named_after_input() {
        let ws = Workspace::new();
        let key = ws.key("recipient_rsa.pub");
        let input = ws.input("foo.txt", b"some secret text\n");
        let settings = ws.settings(Mode::Encrypt(key.clone()), &input);

        let outcome = envelope(&settings, &[]).encrypt_file(&input, &key).unwrap();

        assert_eq!(
            outcome.written,
            vec![
                ws.dir("out").join("foo.txt.enc"),
                ws.dir("out").join("foo.txt.symmetric-key.enc"),
            ]
        );
        assert_eq!(ws.listing("out"), vec!["foo.txt.enc", "foo.txt.symmetric-key.enc"]);
        // input untouched
        assert_eq!(fs::read(&input).unwrap(), b"some secret text\n");
    }

    #[test]
    fn test_outputs_are_armored() {
        let ws = Workspace::new();
        let key = ws.key("recipient_rsa.pub");
        let input = ws.input("foo.txt", b"hello world\n");
        let settings = ws.settings(Mode::Encrypt(key.clone()), &input);

        envelope(&settings, &[]).encrypt_file(&input, &key).unwrap();

        let ciphertext = fs::read_to_string(ws.dir("out").join("foo.txt.enc")).unwrap();
        assert!(ciphertext.starts_with("U2FsdGVkX1"));
        assert!(ciphertext.ends_with('\n'));

        let wrapped = fs::read_to_string(ws.dir("out").join("foo.txt.symmetric-key.enc")).unwrap();
        assert!(wrapped.lines().all(|l| l.len() <= 64));
        // 4096-bit modulus
        assert_eq!(crate::crypto::armor::decode(wrapped.as_bytes()).unwrap().len(), 512);
    }

    #[test]
    fn test_openssh_key_exported_next_to_it() {
        let ws = Workspace::new();
        let key = ws.key("recipient_rsa.pub");
        let input = ws.input("foo.txt", b"x");
        let settings = ws.settings(Mode::Encrypt(key.clone()), &input);

        envelope(&settings, &[]).encrypt_file(&input, &key).unwrap();

        let sibling = ws.dir("keys").join("recipient_rsa.pub.pem");
        let exported = asymmetric::load_public_key(&sibling).unwrap();
        let expected = asymmetric::load_public_key(&fixture("recipient_rsa_public.pem")).unwrap();
        assert_eq!(exported, expected);
    }

    #[test]
    fn test_pem_key_not_converted() {
        let ws = Workspace::new();
        let key = ws.key("recipient_rsa_public.pem");
        let input = ws.input("foo.txt", b"x");
        let settings = ws.settings(Mode::Encrypt(key.clone()), &input);

        envelope(&settings, &[]).encrypt_file(&input, &key).unwrap();

        assert_eq!(ws.listing("keys"), vec!["recipient_rsa_public.pem"]);
    }

    #[test]
    fn test_each_run_uses_a_fresh_key() {
        let ws = Workspace::new();
        let key = ws.key("recipient_rsa.pub");
        let input = ws.input("foo.txt", b"same plaintext");
        let settings = ws.settings(Mode::Encrypt(key.clone()), &input);
        let env = envelope(&settings, &[]);

        env.encrypt_file(&input, &key).unwrap();
        let first = fs::read(ws.dir("out").join("foo.txt.enc")).unwrap();
        env.encrypt_file(&input, &key).unwrap();
        let second = fs::read(ws.dir("out").join("foo.txt.enc")).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_unsupported_key_leaves_no_output() {
        let ws = Workspace::new();
        let key = ws.key("ed25519.pub");
        let input = ws.input("foo.txt", b"x");
        let settings = ws.settings(Mode::Encrypt(key.clone()), &input);

        let result = envelope(&settings, &[]).encrypt_file(&input, &key);

        assert!(matches!(result, Err(CryptError::UnsupportedKeyType { .. })));
        assert!(ws.listing("out").is_empty());
    }

    #[test]
    fn test_missing_key_leaves_no_output() {
        let ws = Workspace::new();
        let input = ws.input("foo.txt", b"x");
        let key = ws.dir("keys").join("absent.pub");
        let settings = ws.settings(Mode::Encrypt(key.clone()), &input);

        let result = envelope(&settings, &[]).encrypt_file(&input, &key);

        assert!(matches!(result, Err(CryptError::KeyNotFound(_))));
        assert!(ws.listing("out").is_empty());
    }

    #[test]
    fn test_empty_file() {
        let ws = Workspace::new();
        let key = ws.key("recipient_rsa.pub");
        let input = ws.input("empty", b"");
        let settings = ws.settings(Mode::Encrypt(key.clone()), &input);

        let outcome = envelope(&settings, &[]).encrypt_file(&input, &key).unwrap();

        assert_eq!(outcome.bytes, 0);
        assert_eq!(ws.listing("out"), vec!["empty.enc", "empty.symmetric-key.enc"]);
    }
}
