//! Password hardening for the journal vault.
//!
//! Turns a human password (or a canonical recovery code) plus a stored salt
//! into a Key-Encryption-Key. The derivation is deliberately slow: the
//! iteration count is the vault's only defense against offline brute force.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::types::{Kek, Salt, KEY_SIZE};

/// PBKDF2 iteration count for all KEK derivations.
///
/// Fixed for the life of the record format: a record wrapped at one count can
/// only be unwrapped at the same count, since the KEK is re-derived rather
/// than stored.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derives a Key-Encryption-Key from a password and salt.
///
/// PBKDF2-HMAC-SHA256 with [`PBKDF2_ITERATIONS`] rounds and a 256-bit output.
/// Deterministic: the same password and salt always produce the same KEK.
/// An empty password is accepted here; rejecting weak passwords is caller
/// policy.
#[must_use]
pub fn derive_kek(password: &str, salt: &Salt) -> Kek {
    let mut out = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut out,
    );
    Kek::from_bytes(out)
}
