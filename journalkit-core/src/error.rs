//! Error types for the journal vault.
//!
//! All fallible operations in this crate return [`VaultResult`]. Failures that
//! could reveal *why* an unlock or recovery attempt was rejected are collapsed
//! into the single [`VaultError::Authentication`] variant before they reach a
//! caller.

use thiserror::Error;

use crate::session::VaultStatus;

/// Convenience alias for vault operation results.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Wrong password, wrong recovery code, or tampered/corrupted ciphertext.
    ///
    /// These conditions are intentionally indistinguishable: the message
    /// carries no detail about which derivation, unwrap, or decrypt step
    /// rejected the attempt.
    #[error("invalid key or data corruption")]
    Authentication,

    /// No vault record exists where one was required (`unlock`, `recover`).
    #[error("no vault record exists")]
    RecordNotFound,

    /// A vault record already exists where none was expected (`create`).
    #[error("a vault record already exists")]
    RecordExists,

    /// An operation was invoked in an incompatible session state.
    #[error("cannot {operation} while the session is {status}")]
    State {
        /// The operation that was attempted.
        operation: &'static str,
        /// The session status at the time of the attempt.
        status: VaultStatus,
    },

    /// The underlying blob store failed.
    #[error("storage failure during {context}")]
    Storage {
        /// Context describing the storage operation.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding a vault record for persistence failed.
    #[error("serialization failed: {context}")]
    Serialization {
        /// Context describing what was being encoded.
        context: String,
    },

    /// A persisted vault record could not be decoded.
    ///
    /// Session-level unlock/recover paths fold this into
    /// [`VaultError::Authentication`] so callers cannot distinguish a mangled
    /// record from a wrong key.
    #[error("invalid vault record: {context}")]
    InvalidRecord {
        /// Description of the decode failure.
        context: String,
    },

    /// The persisted record uses a format version this build does not know.
    #[error("unsupported vault record version: {found}")]
    UnsupportedVersion {
        /// The version number found in the record.
        found: u32,
    },

    /// The platform randomness source or cipher backend failed.
    #[error("crypto failure: {context}")]
    Crypto {
        /// Description of the failure.
        context: String,
    },
}

impl VaultError {
    /// Creates a storage error with context.
    pub fn storage<S: Into<String>>(context: S, source: std::io::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// Creates a serialization error.
    pub fn serialization<S: Into<String>>(context: S) -> Self {
        Self::Serialization {
            context: context.into(),
        }
    }

    /// Creates an invalid record error.
    pub fn invalid_record<S: Into<String>>(context: S) -> Self {
        Self::InvalidRecord {
            context: context.into(),
        }
    }

    /// Creates a crypto failure error.
    pub fn crypto<S: Into<String>>(context: S) -> Self {
        Self::Crypto {
            context: context.into(),
        }
    }

    /// Creates a state error for an operation attempted in the wrong status.
    #[must_use]
    pub const fn state(operation: &'static str, status: VaultStatus) -> Self {
        Self::State { operation, status }
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            context: "unspecified".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_message_carries_no_detail() {
        let err = VaultError::Authentication;
        assert_eq!(format!("{err}"), "invalid key or data corruption");
    }

    #[test]
    fn state_error_names_operation_and_status() {
        let err = VaultError::state("save", VaultStatus::Locked);
        assert_eq!(format!("{err}"), "cannot save while the session is locked");
    }

    #[test]
    fn storage_error_exposes_io_source() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = VaultError::storage("record write", io);
        assert!(format!("{err}").contains("record write"));
        assert!(err.source().is_some());
    }
}
