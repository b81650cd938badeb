//! The persisted vault record.
//!
//! Everything the vault needs to survive a restart lives in one JSON blob:
//! both key envelopes (password and recovery), their salts and IVs, and the
//! encrypted journal content. The blob is written and replaced as a unit via
//! [`VaultStore::write_atomic`], so readers never observe a record whose
//! envelopes and content disagree.

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::store::VaultStore;
use crate::types::{Iv, Salt};

/// Current on-disk record format version.
pub const RECORD_VERSION: u32 = 1;

/// Storage key under which the vault record is persisted.
pub const VAULT_RECORD_KEY: &str = "journal_vault.json";

/// Serializes binary fields as lowercase hex strings.
mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(&encoded).map_err(serde::de::Error::custom)
    }
}

fn default_version() -> u32 {
    RECORD_VERSION
}

/// The single persisted unit of vault state.
///
/// All binary fields are hex-encoded strings in the JSON form, with camelCase
/// field names. `salt` never changes after creation except through recovery,
/// which replaces the password envelope wholesale. `content_iv` is the only
/// field that rotates on an ordinary save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    /// Record format version. Absent in records written before versioning
    /// was introduced, which are treated as version 1.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Salt for deriving the password KEK.
    pub salt: Salt,
    /// The DEK encrypted under the password KEK, with auth tag appended.
    #[serde(with = "hex_vec")]
    pub wrapped_key: Vec<u8>,
    /// IV used when wrapping the DEK under the password KEK.
    pub key_iv: Iv,
    /// Salt for deriving the recovery KEK.
    pub recovery_salt: Salt,
    /// The DEK encrypted under the recovery KEK, with auth tag appended.
    #[serde(with = "hex_vec")]
    pub recovery_wrapped_key: Vec<u8>,
    /// IV used when wrapping the DEK under the recovery KEK.
    pub recovery_key_iv: Iv,
    /// The journal content encrypted under the DEK, with auth tag appended.
    #[serde(with = "hex_vec")]
    pub encrypted_content: Vec<u8>,
    /// IV used for the current `encrypted_content`.
    pub content_iv: Iv,
}

/// Encodes a record to its JSON byte form.
///
/// # Errors
///
/// Returns [`VaultError::Serialization`] if JSON encoding fails.
pub fn encode_record(record: &VaultRecord) -> VaultResult<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| {
        VaultError::serialization(format!("encoding vault record: {e}"))
    })
}

/// Decodes a record from its JSON byte form.
///
/// # Errors
///
/// - [`VaultError::InvalidRecord`] if the bytes are not a well-formed record
/// - [`VaultError::UnsupportedVersion`] if the record was written by a newer
///   format revision
pub fn decode_record(bytes: &[u8]) -> VaultResult<VaultRecord> {
    let record: VaultRecord = serde_json::from_slice(bytes)
        .map_err(|e| VaultError::invalid_record(format!("malformed record JSON: {e}")))?;

    if record.version != RECORD_VERSION {
        return Err(VaultError::UnsupportedVersion {
            found: record.version,
        });
    }

    Ok(record)
}

/// Loads the vault record from a store, if one exists.
///
/// # Errors
///
/// Returns storage errors from the read, or decoding errors from
/// [`decode_record`].
pub fn load_record(store: &dyn VaultStore) -> VaultResult<Option<VaultRecord>> {
    match store.read(VAULT_RECORD_KEY)? {
        Some(bytes) => Ok(Some(decode_record(&bytes)?)),
        None => Ok(None),
    }
}

/// Encodes and atomically persists the vault record.
///
/// # Errors
///
/// Returns serialization errors from encoding, or storage errors from the
/// write.
pub fn save_record(store: &dyn VaultStore, record: &VaultRecord) -> VaultResult<()> {
    let bytes = encode_record(record)?;
    store.write_atomic(VAULT_RECORD_KEY, &bytes)
}
