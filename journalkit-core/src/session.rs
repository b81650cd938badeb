//! The vault session controller.
//!
//! [`JournalVault`] ties the key derivation, envelope, cipher, recovery and
//! storage layers together into the stateful lock/unlock lifecycle. The
//! unwrapped DEK and the decrypted journal plaintext live only inside an open
//! session and are zeroized when the vault locks or an unlock attempt fails.
//!
//! Persistence is the final step of every mutating operation, so a failure at
//! any earlier step leaves the stored record exactly as it was.

use std::cell::Cell;
use std::sync::Arc;

use strum::Display;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::cipher::{decrypt, encrypt, LABEL_CONTENT};
use crate::envelope::{generate_dek, unwrap_dek, wrap_dek};
use crate::error::{VaultError, VaultResult};
use crate::kdf::derive_kek;
use crate::provider::CryptoProvider;
use crate::record::{load_record, save_record, VaultRecord, RECORD_VERSION, VAULT_RECORD_KEY};
use crate::recovery::{self, RecoveryCode};
use crate::store::VaultStore;
use crate::types::{Dek, Salt};

/// Placeholder payload encrypted at vault creation, before the first save.
pub const INITIAL_PAYLOAD: &[u8] = b"JOURNAL INITIALIZED // READY";

/// Lock state of a vault session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum VaultStatus {
    /// No session is open; the DEK exists only in wrapped form.
    Locked,
    /// An unlock or recover operation is deriving keys and decrypting.
    Decrypting,
    /// A session is open; the DEK and plaintext are held in memory.
    Unlocked,
    /// A mutating operation is encrypting and persisting.
    Encrypting,
    /// The last unlock or recover attempt failed. Transient: reported once,
    /// after which the session returns to [`VaultStatus::Locked`].
    Error,
}

/// Key material and plaintext cache of an unlocked vault.
///
/// Dropping the session zeroizes both fields.
struct OpenSession {
    dek: Dek,
    content: Zeroizing<Vec<u8>>,
}

/// Collapses record-decode failures into the uniform authentication error.
///
/// A caller cannot tell a tampered record from a wrong password; both surface
/// as [`VaultError::Authentication`]. Version mismatches pass through, since
/// the version field is plaintext metadata.
fn fold_to_authentication(err: VaultError) -> VaultError {
    match err {
        VaultError::InvalidRecord { .. } => VaultError::Authentication,
        other => other,
    }
}

/// Stateful controller for one encrypted journal vault.
///
/// Exactly one controller is assumed active against a given record at a time;
/// there is no multi-writer coordination. Operations run synchronously, with
/// [`VaultStatus::Decrypting`] and [`VaultStatus::Encrypting`] set for their
/// duration.
pub struct JournalVault<S, C> {
    store: Arc<S>,
    crypto: Arc<C>,
    session: Option<OpenSession>,
    status: Cell<VaultStatus>,
}

impl<S, C> std::fmt::Debug for JournalVault<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalVault")
            .field("status", &self.status.get())
            .field("session_open", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: VaultStore, C: CryptoProvider> JournalVault<S, C> {
    /// Creates a locked controller over the given store and crypto provider.
    #[must_use]
    pub fn new(store: Arc<S>, crypto: Arc<C>) -> Self {
        Self {
            store,
            crypto,
            session: None,
            status: Cell::new(VaultStatus::Locked),
        }
    }

    /// Reports the current session status.
    ///
    /// Observing a transient [`VaultStatus::Error`] resets the session to
    /// [`VaultStatus::Locked`]; the error state is reported exactly once.
    #[must_use]
    pub fn status(&self) -> VaultStatus {
        let current = self.status.get();
        if current == VaultStatus::Error {
            self.status.set(VaultStatus::Locked);
        }
        current
    }

    /// Checks whether a vault record exists in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store probe fails.
    pub fn record_exists(&self) -> VaultResult<bool> {
        self.store.exists(VAULT_RECORD_KEY)
    }

    /// Creates a new vault protected by `password` and opens a session on it.
    ///
    /// Generates the DEK and both key envelopes, encrypts an initial
    /// placeholder payload, and persists the complete record. The returned
    /// recovery code is shown to the caller exactly once and is never stored.
    ///
    /// # Errors
    ///
    /// - [`VaultError::RecordExists`] if a vault record is already present
    /// - [`VaultError::State`] if a session is already open
    /// - [`VaultError::Storage`] if persisting the record fails; nothing is
    ///   written in that case
    pub fn create(&mut self, password: &str) -> VaultResult<RecoveryCode> {
        self.require_status(VaultStatus::Locked, "create")?;
        if self.record_exists()? {
            return Err(VaultError::RecordExists);
        }

        self.status.set(VaultStatus::Encrypting);
        match self.create_inner(password) {
            Ok(code) => {
                self.status.set(VaultStatus::Unlocked);
                info!("vault created");
                Ok(code)
            }
            Err(err) => {
                self.session = None;
                self.status.set(VaultStatus::Locked);
                Err(err)
            }
        }
    }

    fn create_inner(&mut self, password: &str) -> VaultResult<RecoveryCode> {
        let dek = generate_dek(self.crypto.as_ref())?;
        let salt = Salt::generate(self.crypto.as_ref())?;
        let kek = derive_kek(password, &salt);
        let (wrapped_key, key_iv) = wrap_dek(&kek, &dek, self.crypto.as_ref())?;

        let (code, envelope) = recovery::create_recovery(&dek, self.crypto.as_ref())?;

        let (encrypted_content, content_iv) = encrypt(
            dek.as_bytes(),
            LABEL_CONTENT,
            INITIAL_PAYLOAD,
            self.crypto.as_ref(),
        )?;

        let record = VaultRecord {
            version: RECORD_VERSION,
            salt,
            wrapped_key,
            key_iv,
            recovery_salt: envelope.recovery_salt,
            recovery_wrapped_key: envelope.recovery_wrapped_key,
            recovery_key_iv: envelope.recovery_key_iv,
            encrypted_content,
            content_iv,
        };
        save_record(self.store.as_ref(), &record)?;

        self.session = Some(OpenSession {
            dek,
            content: Zeroizing::new(INITIAL_PAYLOAD.to_vec()),
        });
        Ok(code)
    }

    /// Unlocks the vault with `password`, decrypting the journal content.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Authentication`] on a wrong password or a tampered
    ///   record; the reason is deliberately not distinguishable
    /// - [`VaultError::RecordNotFound`] if no vault has been created
    /// - [`VaultError::State`] if a session is already open
    ///
    /// On failure the session enters the transient error state and all key
    /// material from the attempt is zeroized.
    pub fn unlock(&mut self, password: &str) -> VaultResult<()> {
        self.require_status(VaultStatus::Locked, "unlock")?;

        self.status.set(VaultStatus::Decrypting);
        match self.unlock_inner(password) {
            Ok(()) => {
                self.status.set(VaultStatus::Unlocked);
                info!("vault unlocked");
                Ok(())
            }
            Err(err) => {
                self.session = None;
                self.status.set(VaultStatus::Error);
                let err = fold_to_authentication(err);
                warn!("vault unlock failed: {err}");
                Err(err)
            }
        }
    }

    fn unlock_inner(&mut self, password: &str) -> VaultResult<()> {
        let record = load_record(self.store.as_ref())?.ok_or(VaultError::RecordNotFound)?;

        let kek = derive_kek(password, &record.salt);
        let dek = unwrap_dek(&kek, &record.wrapped_key, &record.key_iv)?;
        let content = decrypt(
            dek.as_bytes(),
            LABEL_CONTENT,
            &record.content_iv,
            &record.encrypted_content,
        )?;

        self.session = Some(OpenSession {
            dek,
            content: Zeroizing::new(content),
        });
        Ok(())
    }

    /// Re-encrypts and persists new journal content.
    ///
    /// Uses the in-memory DEK with a freshly drawn IV; only the content
    /// fields of the record change. The in-memory plaintext cache is updated
    /// after the write succeeds.
    ///
    /// # Errors
    ///
    /// - [`VaultError::State`] unless the session is unlocked
    /// - [`VaultError::Storage`] if the write fails; the previously persisted
    ///   record remains intact and the session stays usable
    pub fn save(&mut self, plaintext: &[u8]) -> VaultResult<()> {
        self.require_status(VaultStatus::Unlocked, "save")?;

        self.status.set(VaultStatus::Encrypting);
        let outcome = self.save_encrypted(plaintext);
        self.status.set(VaultStatus::Unlocked);

        match outcome {
            Ok(()) => {
                if let Some(session) = self.session.as_mut() {
                    session.content = Zeroizing::new(plaintext.to_vec());
                }
                debug!("journal content saved");
                Ok(())
            }
            Err(err) => Err(fold_to_authentication(err)),
        }
    }

    fn save_encrypted(&self, plaintext: &[u8]) -> VaultResult<()> {
        let session = self.open_session("save")?;
        let record = load_record(self.store.as_ref())?.ok_or(VaultError::RecordNotFound)?;

        let (encrypted_content, content_iv) = encrypt(
            session.dek.as_bytes(),
            LABEL_CONTENT,
            plaintext,
            self.crypto.as_ref(),
        )?;

        let mut updated = record;
        updated.encrypted_content = encrypted_content;
        updated.content_iv = content_iv;
        save_record(self.store.as_ref(), &updated)
    }

    /// Locks the vault, zeroizing the DEK and plaintext cache.
    ///
    /// Always succeeds and is idempotent; there are no persistence side
    /// effects.
    pub fn lock(&mut self) {
        if self.session.take().is_some() {
            debug!("vault locked");
        }
        self.status.set(VaultStatus::Locked);
    }

    /// Resets the vault password using the recovery code.
    ///
    /// Unwraps the DEK through the recovery envelope, verifies it against the
    /// stored content, rewraps it under `new_password` with a fresh salt, and
    /// persists the rebuilt record. Content and recovery fields are carried
    /// over unchanged. On success the session is left unlocked.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Authentication`] on a wrong or rotated-away code
    /// - [`VaultError::RecordNotFound`] if no vault has been created
    /// - [`VaultError::State`] if a session is already open
    ///
    /// On failure the persisted record is unmodified and the session enters
    /// the transient error state.
    pub fn recover(&mut self, code: &str, new_password: &str) -> VaultResult<()> {
        self.require_status(VaultStatus::Locked, "recover")?;

        self.status.set(VaultStatus::Decrypting);
        match self.recover_inner(code, new_password) {
            Ok(()) => {
                self.status.set(VaultStatus::Unlocked);
                info!("vault password envelope rebuilt from recovery code");
                Ok(())
            }
            Err(err) => {
                self.session = None;
                self.status.set(VaultStatus::Error);
                let err = fold_to_authentication(err);
                warn!("vault recovery failed: {err}");
                Err(err)
            }
        }
    }

    fn recover_inner(&mut self, code: &str, new_password: &str) -> VaultResult<()> {
        let record = load_record(self.store.as_ref())?.ok_or(VaultError::RecordNotFound)?;
        let code = RecoveryCode::parse(code)?;
        let (updated, dek) = recovery::recover(&code, &record, new_password, self.crypto.as_ref())?;

        // Prove the recovered DEK opens the content before writing anything.
        let content = decrypt(
            dek.as_bytes(),
            LABEL_CONTENT,
            &updated.content_iv,
            &updated.encrypted_content,
        )?;

        save_record(self.store.as_ref(), &updated)?;

        self.session = Some(OpenSession {
            dek,
            content: Zeroizing::new(content),
        });
        Ok(())
    }

    /// Returns the decrypted journal content of the open session.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::State`] unless the session is unlocked.
    pub fn current_content(&self) -> VaultResult<&[u8]> {
        self.require_status(VaultStatus::Unlocked, "read content")?;
        let session = self.open_session("read content")?;
        Ok(session.content.as_slice())
    }

    /// Rewraps the DEK under a new password.
    ///
    /// Requires an unlocked session and re-verifies `current_password`
    /// against the persisted envelope before touching anything. Only the
    /// password envelope fields change; content, recovery envelope and the
    /// DEK itself stay as they are.
    ///
    /// # Errors
    ///
    /// - [`VaultError::State`] unless the session is unlocked
    /// - [`VaultError::Authentication`] if `current_password` is wrong
    pub fn change_password(
        &mut self,
        current_password: &str,
        new_password: &str,
    ) -> VaultResult<()> {
        self.require_status(VaultStatus::Unlocked, "change password")?;

        self.status.set(VaultStatus::Encrypting);
        let outcome = self.change_password_inner(current_password, new_password);
        self.status.set(VaultStatus::Unlocked);

        match outcome {
            Ok(()) => {
                info!("vault password changed");
                Ok(())
            }
            Err(err) => Err(fold_to_authentication(err)),
        }
    }

    fn change_password_inner(&self, current_password: &str, new_password: &str) -> VaultResult<()> {
        let record = load_record(self.store.as_ref())?.ok_or(VaultError::RecordNotFound)?;

        let current_kek = derive_kek(current_password, &record.salt);
        let dek = unwrap_dek(&current_kek, &record.wrapped_key, &record.key_iv)?;

        let salt = Salt::generate(self.crypto.as_ref())?;
        let kek = derive_kek(new_password, &salt);
        let (wrapped_key, key_iv) = wrap_dek(&kek, &dek, self.crypto.as_ref())?;

        let mut updated = record;
        updated.salt = salt;
        updated.wrapped_key = wrapped_key;
        updated.key_iv = key_iv;
        save_record(self.store.as_ref(), &updated)
    }

    /// Issues a new recovery code, invalidating the previous one.
    ///
    /// Requires an unlocked session and re-verifies `password`. Only the
    /// recovery envelope fields change. The returned code is shown once and
    /// never stored, like the one issued at creation.
    ///
    /// # Errors
    ///
    /// - [`VaultError::State`] unless the session is unlocked
    /// - [`VaultError::Authentication`] if `password` is wrong
    pub fn rotate_recovery(&mut self, password: &str) -> VaultResult<RecoveryCode> {
        self.require_status(VaultStatus::Unlocked, "rotate recovery")?;

        self.status.set(VaultStatus::Encrypting);
        let outcome = self.rotate_recovery_inner(password);
        self.status.set(VaultStatus::Unlocked);

        match outcome {
            Ok(code) => {
                info!("vault recovery code rotated");
                Ok(code)
            }
            Err(err) => Err(fold_to_authentication(err)),
        }
    }

    fn rotate_recovery_inner(&self, password: &str) -> VaultResult<RecoveryCode> {
        let record = load_record(self.store.as_ref())?.ok_or(VaultError::RecordNotFound)?;

        let kek = derive_kek(password, &record.salt);
        let dek = unwrap_dek(&kek, &record.wrapped_key, &record.key_iv)?;

        let (code, envelope) = recovery::create_recovery(&dek, self.crypto.as_ref())?;

        let mut updated = record;
        updated.recovery_salt = envelope.recovery_salt;
        updated.recovery_wrapped_key = envelope.recovery_wrapped_key;
        updated.recovery_key_iv = envelope.recovery_key_iv;
        save_record(self.store.as_ref(), &updated)?;

        Ok(code)
    }

    /// Verifies the session is in `expected` state before an operation.
    ///
    /// Starting an operation counts as observing a pending error state, so a
    /// retry directly after a failed unlock proceeds from `Locked`.
    fn require_status(&self, expected: VaultStatus, operation: &'static str) -> VaultResult<()> {
        let mut current = self.status.get();
        if current == VaultStatus::Error {
            self.status.set(VaultStatus::Locked);
            current = VaultStatus::Locked;
        }

        if current == expected {
            Ok(())
        } else {
            Err(VaultError::state(operation, current))
        }
    }

    fn open_session(&self, operation: &'static str) -> VaultResult<&OpenSession> {
        self.session
            .as_ref()
            .ok_or_else(|| VaultError::state(operation, self.status.get()))
    }
}
