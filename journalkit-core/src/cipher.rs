//! Authenticated encryption for vault contents and key wrapping.
//!
//! AES-256-GCM with 96-bit nonces. Nonces are drawn internally from the
//! injected [`CryptoProvider`] on every encryption; callers never supply
//! their own. Each call site binds a domain-separation label as associated
//! data so ciphertexts from one role can never be replayed in another.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::error::{VaultError, VaultResult};
use crate::provider::CryptoProvider;
use crate::types::{Iv, IV_SIZE, KEY_SIZE};

/// Size of the GCM authentication tag appended to every ciphertext.
pub const TAG_SIZE: usize = 16;

/// Associated-data label for journal content encryption.
pub const LABEL_CONTENT: &[u8] = b"journal:content";

/// Associated-data label for DEK wrap/unwrap operations.
pub const LABEL_KEY_WRAP: &[u8] = b"journal:key-wrap";

/// Encrypts plaintext under `key` with a freshly drawn nonce.
///
/// # Arguments
///
/// * `key` - Raw 256-bit key (KEK for wraps, DEK for content)
/// * `label` - Domain separation label bound as associated data
/// * `plaintext` - Data to encrypt
/// * `provider` - Randomness source for the nonce
///
/// # Returns
///
/// A tuple of (ciphertext with auth tag, nonce).
///
/// # Errors
///
/// Returns an error if the randomness source fails or the cipher backend
/// rejects the input.
///
/// # Panics
///
/// This function will not panic - the `expect` is for a condition that cannot
/// fail (key length is always 32 bytes by construction).
pub fn encrypt(
    key: &[u8; KEY_SIZE],
    label: &[u8],
    plaintext: &[u8],
    provider: &dyn CryptoProvider,
) -> VaultResult<(Vec<u8>, Iv)> {
    let cipher = Aes256Gcm::new_from_slice(key).expect("key length is always 32");

    let mut iv_bytes = [0u8; IV_SIZE];
    provider.fill_random(&mut iv_bytes)?;
    let nonce = Nonce::from_slice(&iv_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: label })
        .map_err(|_| VaultError::crypto("AES-256-GCM encryption failed"))?;

    Ok((ciphertext, Iv::new(iv_bytes)))
}

/// Decrypts ciphertext produced by [`encrypt`].
///
/// Fails closed: a wrong key, a wrong label, a wrong nonce, or any modified
/// ciphertext byte all surface as the same [`VaultError::Authentication`],
/// and no partial plaintext is ever returned.
///
/// # Arguments
///
/// * `key` - Raw 256-bit key (must match encryption)
/// * `label` - Domain separation label (must match encryption)
/// * `iv` - The nonce recorded at encryption time
/// * `ciphertext` - Data to decrypt (includes auth tag)
///
/// # Errors
///
/// Returns [`VaultError::Authentication`] on any verification failure.
///
/// # Panics
///
/// This function will not panic - the `expect` is for a condition that cannot
/// fail (key length is always 32 bytes by construction).
pub fn decrypt(
    key: &[u8; KEY_SIZE],
    label: &[u8],
    iv: &Iv,
    ciphertext: &[u8],
) -> VaultResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).expect("key length is always 32");

    let nonce = Nonce::from_slice(iv.as_bytes());

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad: label })
        .map_err(|_| VaultError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CountingCryptoProvider, OsCryptoProvider};

    fn test_key(fill: u8) -> [u8; KEY_SIZE] {
        [fill; KEY_SIZE]
    }

    #[test]
    fn roundtrip() {
        let key = test_key(0x5A);
        let plaintext = b"a page of secret journal text";

        let (ciphertext, iv) =
            encrypt(&key, LABEL_CONTENT, plaintext, &OsCryptoProvider::new()).unwrap();
        assert_ne!(&ciphertext[..plaintext.len()], plaintext);
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);

        let decrypted = decrypt(&key, LABEL_CONTENT, &iv, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let key = test_key(0x01);
        let (ciphertext, iv) = encrypt(&key, LABEL_CONTENT, b"", &OsCryptoProvider::new()).unwrap();
        assert_eq!(ciphertext.len(), TAG_SIZE);
        assert_eq!(decrypt(&key, LABEL_CONTENT, &iv, &ciphertext).unwrap(), b"");
    }

    #[test]
    fn fresh_nonce_per_call() {
        let key = test_key(0x5A);
        let provider = CountingCryptoProvider::new();

        let (_, iv1) = encrypt(&key, LABEL_CONTENT, b"same", &provider).unwrap();
        let (_, iv2) = encrypt(&key, LABEL_CONTENT, b"same", &provider).unwrap();
        assert_ne!(iv1, iv2);
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        let key = test_key(0x5A);
        let (mut ciphertext, iv) =
            encrypt(&key, LABEL_CONTENT, b"secret data", &OsCryptoProvider::new()).unwrap();

        ciphertext[0] ^= 0x01;
        assert!(matches!(
            decrypt(&key, LABEL_CONTENT, &iv, &ciphertext),
            Err(VaultError::Authentication)
        ));
    }

    #[test]
    fn tampered_tag_rejected() {
        let key = test_key(0x5A);
        let (mut ciphertext, iv) =
            encrypt(&key, LABEL_CONTENT, b"secret data", &OsCryptoProvider::new()).unwrap();

        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x80;
        assert!(matches!(
            decrypt(&key, LABEL_CONTENT, &iv, &ciphertext),
            Err(VaultError::Authentication)
        ));
    }

    #[test]
    fn wrong_key_rejected() {
        let (ciphertext, iv) = encrypt(
            &test_key(0x5A),
            LABEL_CONTENT,
            b"secret data",
            &OsCryptoProvider::new(),
        )
        .unwrap();

        assert!(matches!(
            decrypt(&test_key(0x5B), LABEL_CONTENT, &iv, &ciphertext),
            Err(VaultError::Authentication)
        ));
    }

    #[test]
    fn wrong_label_rejected() {
        let key = test_key(0x5A);
        let (ciphertext, iv) =
            encrypt(&key, LABEL_KEY_WRAP, &[0x42; KEY_SIZE], &OsCryptoProvider::new()).unwrap();

        // A wrapped key must not open as content.
        assert!(matches!(
            decrypt(&key, LABEL_CONTENT, &iv, &ciphertext),
            Err(VaultError::Authentication)
        ));
    }

    #[test]
    fn wrong_iv_rejected() {
        let key = test_key(0x5A);
        let (ciphertext, _) =
            encrypt(&key, LABEL_CONTENT, b"secret data", &OsCryptoProvider::new()).unwrap();

        let wrong_iv = Iv::new([0xFF; IV_SIZE]);
        assert!(matches!(
            decrypt(&key, LABEL_CONTENT, &wrong_iv, &ciphertext),
            Err(VaultError::Authentication)
        ));
    }
}
