//! Envelope (key-wrapping) operations.
//!
//! The DEK never touches storage in the clear: it is wrapped (encrypted)
//! under a KEK using the same AEAD engine as content encryption, restricted
//! to fixed-size key payloads. Two envelopes over the same DEK coexist in a
//! vault record, one for the password path and one for the recovery path,
//! which is what makes password reset possible without re-encrypting content.

use zeroize::{Zeroize, Zeroizing};

use crate::cipher::{self, LABEL_KEY_WRAP};
use crate::error::{VaultError, VaultResult};
use crate::provider::CryptoProvider;
use crate::types::{Dek, Iv, Kek, KEY_SIZE};

/// Generates a fresh random Data-Encryption-Key.
///
/// Called exactly once at vault creation. Ordinary operations (unlock, save,
/// recover, rotation) reuse the existing DEK; only an explicit re-key of the
/// whole vault would generate a new one.
///
/// # Errors
///
/// Returns an error if the randomness source fails.
pub fn generate_dek(provider: &dyn CryptoProvider) -> VaultResult<Dek> {
    let mut bytes = [0u8; KEY_SIZE];
    provider.fill_random(&mut bytes)?;
    let dek = Dek::from_bytes(bytes);
    bytes.zeroize();
    Ok(dek)
}

/// Wraps a DEK under a KEK.
///
/// # Returns
///
/// A tuple of (wrapped key blob with auth tag, nonce).
///
/// # Errors
///
/// Returns an error if the randomness source or cipher backend fails.
pub fn wrap_dek(kek: &Kek, dek: &Dek, provider: &dyn CryptoProvider) -> VaultResult<(Vec<u8>, Iv)> {
    cipher::encrypt(kek.as_bytes(), LABEL_KEY_WRAP, dek.as_bytes(), provider)
}

/// Unwraps a DEK previously wrapped with [`wrap_dek`].
///
/// # Errors
///
/// Returns [`VaultError::Authentication`] if the KEK is wrong or the wrapped
/// blob fails verification; which of the two happened is not revealed. A
/// verified payload of the wrong width is reported as a corrupt record.
pub fn unwrap_dek(kek: &Kek, wrapped: &[u8], iv: &Iv) -> VaultResult<Dek> {
    let bytes = Zeroizing::new(cipher::decrypt(kek.as_bytes(), LABEL_KEY_WRAP, iv, wrapped)?);

    if bytes.len() != KEY_SIZE {
        return Err(VaultError::invalid_record(format!(
            "wrapped key payload: expected {KEY_SIZE} bytes, got {}",
            bytes.len()
        )));
    }

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&bytes);
    let dek = Dek::from_bytes(key);
    key.zeroize();
    Ok(dek)
}
