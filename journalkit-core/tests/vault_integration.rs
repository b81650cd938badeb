use std::collections::HashSet;
use std::sync::Arc;

use journalkit_core::{
    decode_record, encode_record, FsVaultStore, JournalVault, MemoryVaultStore, OsCryptoProvider,
    VaultError, VaultRecord, VaultStore, VAULT_RECORD_KEY,
};
use test_case::test_case;

type TestVault = JournalVault<MemoryVaultStore, OsCryptoProvider>;

fn new_vault() -> (TestVault, Arc<MemoryVaultStore>) {
    let store = Arc::new(MemoryVaultStore::new());
    let vault = JournalVault::new(store.clone(), Arc::new(OsCryptoProvider::new()));
    (vault, store)
}

fn stored_record(store: &MemoryVaultStore) -> VaultRecord {
    let bytes = store
        .read(VAULT_RECORD_KEY)
        .expect("read record")
        .expect("record present");
    decode_record(&bytes).expect("decode record")
}

fn overwrite_record(store: &MemoryVaultStore, record: &VaultRecord) {
    let bytes = encode_record(record).expect("encode record");
    store
        .write_atomic(VAULT_RECORD_KEY, &bytes)
        .expect("write record");
}

#[test]
fn test_vault_scenario_end_to_end() {
    let (mut vault, _store) = new_vault();

    let code = vault.create("alpha123").expect("create vault");
    vault.save(b"hello").expect("save content");
    vault.lock();

    vault.unlock("alpha123").expect("unlock with password");
    assert_eq!(vault.current_content().expect("content"), b"hello");
    vault.lock();

    vault.recover(code.as_str(), "beta456").expect("recover");
    assert_eq!(vault.current_content().expect("content"), b"hello");
    vault.lock();

    vault.unlock("beta456").expect("unlock with new password");
    assert_eq!(vault.current_content().expect("content"), b"hello");
    vault.lock();

    let err = vault.unlock("alpha123").unwrap_err();
    assert!(matches!(err, VaultError::Authentication));
}

#[test]
fn test_round_trip_payloads() {
    let binary: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let payloads: Vec<&[u8]> = vec![b"", b"x", b"hello world", &binary];

    for payload in payloads {
        let (mut vault, _store) = new_vault();
        vault.create("alpha123").expect("create vault");
        vault.save(payload).expect("save content");
        vault.lock();

        vault.unlock("alpha123").expect("unlock");
        assert_eq!(
            vault.current_content().expect("content"),
            payload,
            "payload of {} bytes did not round-trip",
            payload.len()
        );
    }
}

#[test]
fn test_wrong_password_variants_all_rejected() {
    let (mut vault, _store) = new_vault();
    vault.create("alpha123").expect("create vault");
    vault.save(b"hello").expect("save content");
    vault.lock();

    for wrong in ["alpha124", "Alpha123", "alpha123 ", "", "beta456"] {
        let err = vault.unlock(wrong).unwrap_err();
        assert!(
            matches!(err, VaultError::Authentication),
            "password {wrong:?} was not rejected with an authentication error"
        );
    }

    vault.unlock("alpha123").expect("correct password still works");
    assert_eq!(vault.current_content().expect("content"), b"hello");
}

#[test]
fn test_fresh_content_iv_on_every_save() {
    let (mut vault, store) = new_vault();
    vault.create("alpha123").expect("create vault");

    let mut seen = HashSet::new();
    assert!(seen.insert(stored_record(&store).content_iv.0));

    for i in 0..32u32 {
        vault.save(format!("entry {i}").as_bytes()).expect("save");
        let record = stored_record(&store);
        assert!(
            seen.insert(record.content_iv.0),
            "content IV repeated on save {i}"
        );
    }
}

#[test]
fn test_same_plaintext_saves_produce_distinct_ciphertext() {
    let (mut vault, store) = new_vault();
    vault.create("alpha123").expect("create vault");

    vault.save(b"same words").expect("first save");
    let first = stored_record(&store);
    vault.save(b"same words").expect("second save");
    let second = stored_record(&store);

    assert_ne!(first.content_iv, second.content_iv);
    assert_ne!(first.encrypted_content, second.encrypted_content);
}

#[test]
fn test_saves_leave_salts_and_envelopes_untouched() {
    let (mut vault, store) = new_vault();
    vault.create("alpha123").expect("create vault");
    let baseline = stored_record(&store);

    for i in 0..8u32 {
        vault.save(format!("entry {i}").as_bytes()).expect("save");
    }
    let after = stored_record(&store);

    assert_eq!(after.salt, baseline.salt);
    assert_eq!(after.wrapped_key, baseline.wrapped_key);
    assert_eq!(after.key_iv, baseline.key_iv);
    assert_eq!(after.recovery_salt, baseline.recovery_salt);
    assert_eq!(after.recovery_wrapped_key, baseline.recovery_wrapped_key);
    assert_eq!(after.recovery_key_iv, baseline.recovery_key_iv);
    assert_ne!(after.encrypted_content, baseline.encrypted_content);
}

#[test]
fn test_recover_rewrites_only_the_password_envelope() {
    let (mut vault, store) = new_vault();
    let code = vault.create("alpha123").expect("create vault");
    vault.save(b"hello").expect("save content");
    vault.lock();
    let before = stored_record(&store);

    vault.recover(code.as_str(), "beta456").expect("recover");
    let after = stored_record(&store);

    assert_ne!(after.salt, before.salt);
    assert_ne!(after.wrapped_key, before.wrapped_key);
    assert_eq!(after.recovery_salt, before.recovery_salt);
    assert_eq!(after.recovery_wrapped_key, before.recovery_wrapped_key);
    assert_eq!(after.recovery_key_iv, before.recovery_key_iv);
    assert_eq!(after.encrypted_content, before.encrypted_content);
    assert_eq!(after.content_iv, before.content_iv);
}

#[test]
fn test_recovery_code_remains_valid_after_password_reset() {
    let (mut vault, _store) = new_vault();
    let code = vault.create("alpha123").expect("create vault");
    vault.save(b"hello").expect("save content");
    vault.lock();

    vault.recover(code.as_str(), "beta456").expect("first recover");
    vault.lock();
    vault
        .recover(code.as_str(), "gamma789")
        .expect("second recover with the same code");
    vault.lock();

    vault.unlock("gamma789").expect("latest password works");
    assert_eq!(vault.current_content().expect("content"), b"hello");
}

#[test]
fn test_failed_unlock_never_touches_the_record() {
    let (mut vault, store) = new_vault();
    vault.create("alpha123").expect("create vault");
    vault.lock();
    let before = store
        .read(VAULT_RECORD_KEY)
        .expect("read")
        .expect("present");

    vault.unlock("wrong").unwrap_err();
    vault.unlock("also wrong").unwrap_err();

    let after = store
        .read(VAULT_RECORD_KEY)
        .expect("read")
        .expect("present");
    assert_eq!(before, after);
}

#[test_case(|record: &mut VaultRecord| record.wrapped_key[0] ^= 0x01 ; "wrapped key")]
#[test_case(|record: &mut VaultRecord| record.key_iv.0[0] ^= 0x01 ; "key iv")]
#[test_case(|record: &mut VaultRecord| record.salt.0[0] ^= 0x01 ; "kdf salt")]
#[test_case(|record: &mut VaultRecord| record.encrypted_content[0] ^= 0x01 ; "content first byte")]
#[test_case(|record: &mut VaultRecord| {
    let last = record.encrypted_content.len() - 1;
    record.encrypted_content[last] ^= 0x80;
} ; "content auth tag")]
#[test_case(|record: &mut VaultRecord| record.content_iv.0[11] ^= 0x01 ; "content iv")]
fn test_unlock_detects_tampering(mutate: fn(&mut VaultRecord)) {
    let (mut vault, store) = new_vault();
    vault.create("alpha123").expect("create vault");
    vault.save(b"hello").expect("save content");
    vault.lock();

    let mut record = stored_record(&store);
    mutate(&mut record);
    overwrite_record(&store, &record);

    let err = vault.unlock("alpha123").unwrap_err();
    assert!(matches!(err, VaultError::Authentication));
}

#[test_case(|record: &mut VaultRecord| record.recovery_wrapped_key[0] ^= 0x01 ; "recovery wrapped key")]
#[test_case(|record: &mut VaultRecord| record.recovery_key_iv.0[0] ^= 0x01 ; "recovery key iv")]
#[test_case(|record: &mut VaultRecord| record.recovery_salt.0[0] ^= 0x01 ; "recovery salt")]
fn test_recover_detects_tampering(mutate: fn(&mut VaultRecord)) {
    let (mut vault, store) = new_vault();
    let code = vault.create("alpha123").expect("create vault");
    vault.lock();

    let mut record = stored_record(&store);
    mutate(&mut record);
    overwrite_record(&store, &record);

    let err = vault.recover(code.as_str(), "beta456").unwrap_err();
    assert!(matches!(err, VaultError::Authentication));
}

#[test]
fn test_fs_store_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FsVaultStore::new(dir.path()).expect("store"));
    let mut vault = JournalVault::new(store.clone(), Arc::new(OsCryptoProvider::new()));

    let code = vault.create("alpha123").expect("create vault");
    vault.save(b"persisted on disk").expect("save content");
    drop(vault);

    // A fresh controller over the same directory sees the persisted vault.
    let mut vault = JournalVault::new(store, Arc::new(OsCryptoProvider::new()));
    vault.unlock("alpha123").expect("unlock");
    assert_eq!(
        vault.current_content().expect("content"),
        b"persisted on disk"
    );
    vault.lock();

    vault.recover(code.as_str(), "gamma789").expect("recover");
    assert_eq!(
        vault.current_content().expect("content"),
        b"persisted on disk"
    );
}
