//! Hybrid envelope encryption of files
//!
//! A file is encrypted under a fresh random key, and that key is encrypted to
//! the recipient's RSA public key. Encrypting `name.ext` produces
//! `name.ext.enc` and `name.ext.symmetric-key.enc`; decrypting `name.ext.enc`
//! looks for the key file beside it and restores `name.ext`.
//!
//! # Example
//!
//! ```rust,ignore
//! use ssh_crypt::config::{Mode, Settings};
//!
//! let settings = Settings::new(Mode::Encrypt("~/.ssh/id_rsa.pub".into()), "notes.txt")?;
//! let outcome = ssh_crypt::envelope::run(&settings)?;
//! ```

mod decrypt;
mod encrypt;
mod output;

use std::path::{Path, PathBuf};

use crate::config::{Mode, Settings};
use crate::crypto::{CryptoBackend, RustCryptoBackend};
use crate::error::{CryptError, CryptResult};
use crate::keys::{KeyConverter, PassphrasePrompt, SshKeyConverter, TerminalPrompt};

/// What a completed run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Files written, in the order they were persisted
    pub written: Vec<PathBuf>,
    /// Plaintext bytes processed
    pub bytes: u64,
}

/// Runs envelope operations for one set of settings
pub struct Envelope<'a, B = RustCryptoBackend, C = SshKeyConverter, P = TerminalPrompt> {
    settings: &'a Settings,
    backend: B,
    converter: C,
    prompt: P,
}

impl<'a> Envelope<'a> {
    /// Create an envelope using the built-in backend and the terminal
    pub fn new(settings: &'a Settings) -> Self {
        Self::with_parts(settings, RustCryptoBackend, SshKeyConverter, TerminalPrompt)
    }
}

impl<'a, B, C, P> Envelope<'a, B, C, P>
where
    B: CryptoBackend,
    C: KeyConverter,
    P: PassphrasePrompt,
{
    /// Create an envelope from explicit parts
    pub fn with_parts(settings: &'a Settings, backend: B, converter: C, prompt: P) -> Self {
        Self {
            settings,
            backend,
            converter,
            prompt,
        }
    }

    /// Encrypt or decrypt `settings.input` according to `settings.mode`
    pub fn run(&self) -> CryptResult<Outcome> {
        let input = &self.settings.input;
        if !input.is_file() {
            return Err(CryptError::InputNotFound(input.clone()));
        }

        match &self.settings.mode {
            Mode::Encrypt(public_key) => self.encrypt_file(input, public_key),
            Mode::Decrypt(private_key) => self.decrypt_file(input, private_key),
        }
    }

    fn output_dir(&self) -> &Path {
        &self.settings.output_dir
    }
}

/// Run with the built-in backend, prompting on the terminal
pub fn run(settings: &Settings) -> CryptResult<Outcome> {
    Envelope::new(settings).run()
}

/// Encrypt `input` for the holder of `public_key`
pub fn encrypt_file(settings: &Settings, input: &Path, public_key: &Path) -> CryptResult<Outcome> {
    Envelope::new(settings).encrypt_file(input, public_key)
}

/// Decrypt the `.enc` file `ciphertext` with `private_key`
pub fn decrypt_file(
    settings: &Settings,
    ciphertext: &Path,
    private_key: &Path,
) -> CryptResult<Outcome> {
    Envelope::new(settings).decrypt_file(ciphertext, private_key)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use crate::config::{Mode, Settings};
    use crate::crypto::RustCryptoBackend;
    use crate::keys::prompt::testing::ScriptedPrompt;
    use crate::keys::SshKeyConverter;

    use super::Envelope;

    pub type TestEnvelope<'a> = Envelope<'a, RustCryptoBackend, SshKeyConverter, ScriptedPrompt>;

    /// Scratch area with separate directories for keys, inputs and outputs
    pub struct Workspace {
        pub root: TempDir,
    }

    impl Workspace {
        pub fn new() -> Self {
            let root = TempDir::new().unwrap();
            for sub in ["keys", "in", "out"] {
                fs::create_dir(root.path().join(sub)).unwrap();
            }
            Self { root }
        }

        pub fn dir(&self, sub: &str) -> PathBuf {
            self.root.path().join(sub)
        }

        /// Copy a key fixture into the workspace
        pub fn key(&self, name: &str) -> PathBuf {
            let target = self.dir("keys").join(name);
            fs::copy(fixture(name), &target).unwrap();
            target
        }

        pub fn input(&self, name: &str, contents: &[u8]) -> PathBuf {
            let path = self.dir("in").join(name);
            fs::write(&path, contents).unwrap();
            path
        }

        pub fn settings(&self, mode: Mode, input: &Path) -> Settings {
            let mut settings = Settings::new(mode, input)
                .unwrap()
                .with_output_dir(self.dir("out"));
            settings.allow_passphraseless_temp_key = true;
            settings
        }

        pub fn listing(&self, sub: &str) -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(self.dir(sub))
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
    }

    pub fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    pub fn envelope<'a>(settings: &'a Settings, answers: &[&str]) -> TestEnvelope<'a> {
        Envelope::with_parts(
            settings,
            RustCryptoBackend,
            SshKeyConverter,
            ScriptedPrompt::new(answers),
        )
    }
}
