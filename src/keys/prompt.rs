//! Passphrase prompting
//!
//! Reading passphrases goes through [`PassphrasePrompt`] so the key
//! preparation logic can run without a terminal.

use crate::crypto::SecureString;
use crate::error::{CryptError, CryptResult};

/// Shortest passphrase accepted for a new key copy (same as ssh-keygen)
pub const MIN_PASSPHRASE_LEN: usize = 5;

/// Attempts allowed to enter a matching new passphrase
pub const NEW_PASSPHRASE_ATTEMPTS: usize = 3;

/// Source of passphrases
pub trait PassphrasePrompt {
    /// Ask for a passphrase once, with hidden input
    fn read_passphrase(&self, prompt: &str) -> CryptResult<SecureString>;

    /// Report a problem with the last entry back to the user
    fn notify(&self, message: &str) {
        eprintln!("{}", message);
    }

    /// Ask for a new passphrase and its confirmation
    fn new_passphrase(&self, purpose: &str) -> CryptResult<SecureString> {
        for _ in 0..NEW_PASSPHRASE_ATTEMPTS {
            let first = self.read_passphrase(&format!("Enter new passphrase for {}: ", purpose))?;

            if first.len() < MIN_PASSPHRASE_LEN {
                self.notify(&format!(
                    "Passphrase must be at least {} characters. Please try again.",
                    MIN_PASSPHRASE_LEN
                ));
                continue;
            }

            let second = self.read_passphrase("Confirm passphrase: ")?;

            if first.as_str() != second.as_str() {
                self.notify("Passphrases do not match. Please try again.");
                continue;
            }

            return Ok(first);
        }

        Err(CryptError::KeyPassphrase(
            "Too many failed attempts to set a passphrase".into(),
        ))
    }
}

/// Prompt on the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl PassphrasePrompt for TerminalPrompt {
    fn read_passphrase(&self, prompt: &str) -> CryptResult<SecureString> {
        rpassword::prompt_password(prompt)
            .map(SecureString::from)
            .map_err(|e| CryptError::KeyPassphrase(format!("Failed to read passphrase: {}", e)))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedPrompt;
    use super::*;

    #[test]
    fn test_new_passphrase_confirmed() {
        let prompt = ScriptedPrompt::new(&["swordfish", "swordfish"]);
        let pass = prompt.new_passphrase("the key").unwrap();
        assert_eq!(pass.as_str(), "swordfish");
        assert_eq!(prompt.asked.borrow().len(), 2);
    }

    #[test]
    fn test_new_passphrase_retries_on_mismatch() {
        let prompt = ScriptedPrompt::new(&["swordfish", "swordfush", "swordfish", "swordfish"]);
        let pass = prompt.new_passphrase("the key").unwrap();
        assert_eq!(pass.as_str(), "swordfish");
    }

    #[test]
    fn test_new_passphrase_rejects_short() {
        let prompt = ScriptedPrompt::new(&["abc", "longer one", "longer one"]);
        let pass = prompt.new_passphrase("the key").unwrap();
        assert_eq!(pass.as_str(), "longer one");
    }

    #[test]
    fn test_new_passphrase_gives_up() {
        let prompt = ScriptedPrompt::new(&["a", "b", "c", "d"]);
        let result = prompt.new_passphrase("the key");
        assert!(matches!(result, Err(CryptError::KeyPassphrase(_))));
    }
}
