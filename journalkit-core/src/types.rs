//! Core type definitions for the journal vault.
//!
//! Fixed-width newtypes for the values that appear in a vault record (salts,
//! nonces) and for key material (KEK, DEK). Record-visible values serialize as
//! lowercase hex strings; key material never serializes at all.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::provider::CryptoProvider;
use crate::VaultResult;

/// Size of a vault salt in bytes (128 bits).
pub const SALT_SIZE: usize = 16;

/// Size of an AEAD nonce in bytes (96 bits).
pub const IV_SIZE: usize = 12;

/// Size of a symmetric key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

// Record-visible values

/// A 16-byte key-derivation salt.
///
/// Generated once (at vault creation, or when an envelope is re-keyed) and
/// stored in the clear inside the vault record. A salt is bound to the
/// envelope it was created for; replacing it orphans the wrapped key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt(pub [u8; SALT_SIZE]);

impl Salt {
    /// Creates a `Salt` from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generates a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns an error if the randomness source fails.
    pub fn generate(provider: &dyn CryptoProvider) -> VaultResult<Self> {
        let mut bytes = [0u8; SALT_SIZE];
        provider.fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Returns the raw bytes of the salt.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }

    /// Converts the salt to a hexadecimal string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creates a `Salt` from a hexadecimal string.
    ///
    /// # Errors
    /// Returns an error if the string is not valid hex or not exactly 16 bytes.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; SALT_SIZE] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", self.to_hex())
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Salt {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Salt {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A 12-byte AEAD nonce.
///
/// Every encryption draws a fresh one; the value used for the most recent
/// encryption of each record field is stored alongside its ciphertext.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Iv(pub [u8; IV_SIZE]);

impl Iv {
    /// Creates an `Iv` from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; IV_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes of the nonce.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }

    /// Converts the nonce to a hexadecimal string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creates an `Iv` from a hexadecimal string.
    ///
    /// # Errors
    /// Returns an error if the string is not valid hex or not exactly 12 bytes.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; IV_SIZE] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Iv({})", self.to_hex())
    }
}

impl fmt::Display for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Iv {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Iv {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Iv {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// Key material

/// Key-Encryption-Key (256-bit).
///
/// Derived from a password or recovery code plus a salt, used only to wrap
/// and unwrap the DEK. Never stored; re-derived on every unlock.
///
/// # Security
///
/// - Zeroized on drop.
/// - Never logged or serialized; `Debug` is redacted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Kek([u8; KEY_SIZE]);

impl Kek {
    /// Creates a KEK from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns a reference to the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Kek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kek").field("key", &"[REDACTED]").finish()
    }
}

/// Data-Encryption-Key (256-bit).
///
/// The single random key that encrypts journal content. Generated once at
/// vault creation; its identity is constant for the vault's lifetime. It is
/// persisted only in wrapped form and exists unwrapped only in memory while a
/// session is unlocked.
///
/// # Security
///
/// - Zeroized on drop.
/// - Never logged or serialized; `Debug` is redacted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Dek([u8; KEY_SIZE]);

impl Dek {
    /// Creates a DEK from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns a reference to the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Dek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dek").field("key", &"[REDACTED]").finish()
    }
}
