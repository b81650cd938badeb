//! Password-protected, envelope-encrypted journal vault.
//!
//! A vault stores one opaque content blob encrypted under a random
//! data-encryption key (DEK). The DEK is wrapped twice: under a key derived
//! from the user's password and under a key derived from a one-time recovery
//! code, so the password can be reset without re-encrypting any content. All
//! persisted state lives in a single [`VaultRecord`] blob behind the
//! [`VaultStore`] seam; randomness comes from an injected [`CryptoProvider`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use journalkit_core::{JournalVault, MemoryVaultStore, OsCryptoProvider};
//!
//! # fn main() -> journalkit_core::VaultResult<()> {
//! let mut vault = JournalVault::new(
//!     Arc::new(MemoryVaultStore::new()),
//!     Arc::new(OsCryptoProvider::new()),
//! );
//!
//! let recovery_code = vault.create("correct horse battery staple")?;
//! vault.save(b"first entry")?;
//! vault.lock();
//!
//! vault.unlock("correct horse battery staple")?;
//! assert_eq!(vault.current_content()?, b"first entry");
//! # let _ = recovery_code;
//! # Ok(())
//! # }
//! ```

mod error;
pub use error::*;

mod provider;
pub use provider::*;

mod record;
pub use record::*;

mod recovery;
pub use recovery::*;

mod session;
pub use session::*;

mod store;
pub use store::*;

mod types;
pub use types::*;

// private modules
mod cipher;
mod envelope;
mod kdf;

pub use kdf::PBKDF2_ITERATIONS;
