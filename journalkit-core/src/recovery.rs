//! Recovery codes and the recovery key envelope.
//!
//! At creation time the vault wraps its DEK a second time under a key derived
//! from a randomly generated recovery code. The code is displayed exactly once
//! and never stored; whoever holds it can re-encrypt the DEK under a new
//! password without ever touching the journal content.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::envelope::{unwrap_dek, wrap_dek};
use crate::error::{VaultError, VaultResult};
use crate::kdf::derive_kek;
use crate::provider::CryptoProvider;
use crate::record::VaultRecord;
use crate::types::{Dek, Iv, Salt};

/// Characters a recovery code may contain. Visually ambiguous characters
/// (`I`, `O`, `0`, `1`) are excluded.
pub const RECOVERY_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of dash-separated groups in a recovery code.
pub const RECOVERY_GROUPS: usize = 4;

/// Characters per group.
pub const RECOVERY_GROUP_LEN: usize = 4;

const RECOVERY_CODE_LEN: usize = RECOVERY_GROUPS * RECOVERY_GROUP_LEN;

/// A vault recovery code in canonical `XXXX-XXXX-XXXX-XXXX` form.
///
/// The canonical dash-grouped string is the exact KDF input, so parsing
/// normalizes case and separators before any key derivation happens. The
/// code is a secret: `Debug` redacts it and memory is zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RecoveryCode(String);

impl RecoveryCode {
    /// Generates a fresh random recovery code.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to produce random bytes.
    pub fn generate(provider: &dyn CryptoProvider) -> VaultResult<Self> {
        let mut raw = [0u8; RECOVERY_CODE_LEN];
        provider.fill_random(&mut raw)?;

        // 256 is a multiple of the alphabet size, so per-byte indexing
        // introduces no modulo bias.
        let chars: Vec<u8> = raw
            .iter()
            .map(|b| RECOVERY_ALPHABET[*b as usize % RECOVERY_ALPHABET.len()])
            .collect();
        raw.zeroize();

        let mut code = String::with_capacity(RECOVERY_CODE_LEN + RECOVERY_GROUPS - 1);
        for (i, c) in chars.iter().enumerate() {
            if i > 0 && i % RECOVERY_GROUP_LEN == 0 {
                code.push('-');
            }
            code.push(char::from(*c));
        }

        Ok(Self(code))
    }

    /// Parses user input into a canonical recovery code.
    ///
    /// Lowercase letters are accepted, and dashes and whitespace are ignored,
    /// so `"abcd efgh-jklm-npqr"` parses to `"ABCD-EFGH-JKLM-NPQR"`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Authentication`] if the input is not a valid
    /// code. The error is deliberately indistinguishable from a wrong code.
    pub fn parse(input: &str) -> VaultResult<Self> {
        let mut stripped: String = input
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();

        let valid = stripped.len() == RECOVERY_CODE_LEN
            && stripped
                .bytes()
                .all(|b| RECOVERY_ALPHABET.contains(&b));
        if !valid {
            stripped.zeroize();
            return Err(VaultError::Authentication);
        }

        let mut code = String::with_capacity(RECOVERY_CODE_LEN + RECOVERY_GROUPS - 1);
        for (i, c) in stripped.chars().enumerate() {
            if i > 0 && i % RECOVERY_GROUP_LEN == 0 {
                code.push('-');
            }
            code.push(c);
        }
        stripped.zeroize();

        Ok(Self(code))
    }

    /// Returns the canonical dash-grouped form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for RecoveryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RecoveryCode").field(&"[REDACTED]").finish()
    }
}

impl std::fmt::Display for RecoveryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The recovery half of the key material in a vault record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryEnvelope {
    /// Salt for deriving the recovery KEK.
    pub recovery_salt: Salt,
    /// The DEK wrapped under the recovery KEK.
    pub recovery_wrapped_key: Vec<u8>,
    /// IV used for the recovery wrap.
    pub recovery_key_iv: Iv,
}

/// Generates a recovery code and wraps the DEK under it.
///
/// # Errors
///
/// Returns an error if randomness or encryption fails.
pub fn create_recovery(
    dek: &Dek,
    provider: &dyn CryptoProvider,
) -> VaultResult<(RecoveryCode, RecoveryEnvelope)> {
    let code = RecoveryCode::generate(provider)?;
    let recovery_salt = Salt::generate(provider)?;
    let recovery_kek = derive_kek(code.as_str(), &recovery_salt);
    let (recovery_wrapped_key, recovery_key_iv) = wrap_dek(&recovery_kek, dek, provider)?;

    Ok((
        code,
        RecoveryEnvelope {
            recovery_salt,
            recovery_wrapped_key,
            recovery_key_iv,
        },
    ))
}

/// Rebuilds the password envelope of a record using the recovery code.
///
/// Unwraps the DEK via the recovery envelope, then rewraps it under a KEK
/// derived from `new_password` and a freshly generated salt. Only the
/// password envelope fields (`salt`, `wrapped_key`, `key_iv`) change; the
/// recovery envelope and the encrypted content are carried over byte for
/// byte, so recovery cost is independent of journal size.
///
/// # Returns
///
/// The updated record and the recovered DEK.
///
/// # Errors
///
/// - [`VaultError::Authentication`] if the code does not unwrap the DEK
/// - [`VaultError::InvalidRecord`] if the unwrapped payload is malformed
/// - Other errors if randomness or encryption fails
pub fn recover(
    code: &RecoveryCode,
    record: &VaultRecord,
    new_password: &str,
    provider: &dyn CryptoProvider,
) -> VaultResult<(VaultRecord, Dek)> {
    let recovery_kek = derive_kek(code.as_str(), &record.recovery_salt);
    let dek = unwrap_dek(
        &recovery_kek,
        &record.recovery_wrapped_key,
        &record.recovery_key_iv,
    )?;

    let salt = Salt::generate(provider)?;
    let kek = derive_kek(new_password, &salt);
    let (wrapped_key, key_iv) = wrap_dek(&kek, &dek, provider)?;

    let mut updated = record.clone();
    updated.salt = salt;
    updated.wrapped_key = wrapped_key;
    updated.key_iv = key_iv;

    Ok((updated, dek))
}
