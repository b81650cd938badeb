//! Randomness capability for the vault.
//!
//! Every component that needs entropy (nonce draws, DEK and salt generation,
//! recovery-code sampling) receives a [`CryptoProvider`] explicitly instead of
//! reaching for an ambient global. Key derivation is deterministic and takes
//! no provider.

use crate::error::{VaultError, VaultResult};

/// Source of cryptographically secure random bytes.
///
/// Implementations MUST draw from a CSPRNG; the vault's nonce-uniqueness and
/// key-unpredictability guarantees rest on it. The trait is object-safe so
/// components can hold `&dyn CryptoProvider`.
pub trait CryptoProvider: Send + Sync {
    /// Fills `dest` with random bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying randomness source fails.
    fn fill_random(&self, dest: &mut [u8]) -> VaultResult<()>;
}

/// Operating-system randomness source.
///
/// Backed by the platform CSPRNG via `getrandom`. This is the provider every
/// production caller should use.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsCryptoProvider;

impl OsCryptoProvider {
    /// Creates a new OS-backed provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CryptoProvider for OsCryptoProvider {
    fn fill_random(&self, dest: &mut [u8]) -> VaultResult<()> {
        getrandom::getrandom(dest)
            .map_err(|e| VaultError::crypto(format!("system rng failed: {e}")))
    }
}

/// Deterministic provider producing a counting byte pattern.
///
/// **FOR TESTING ONLY**: output is fully predictable. Each call continues the
/// byte sequence where the previous call stopped, so consecutive draws are
/// distinct but reproducible across runs.
#[derive(Debug, Default)]
pub struct CountingCryptoProvider {
    next: std::sync::atomic::AtomicU8,
}

impl CountingCryptoProvider {
    /// Creates a provider whose first byte is zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider whose first byte is `start`.
    #[must_use]
    pub fn starting_at(start: u8) -> Self {
        Self {
            next: std::sync::atomic::AtomicU8::new(start),
        }
    }
}

impl CryptoProvider for CountingCryptoProvider {
    fn fill_random(&self, dest: &mut [u8]) -> VaultResult<()> {
        for byte in dest.iter_mut() {
            *byte = self
                .next
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        Ok(())
    }
}
