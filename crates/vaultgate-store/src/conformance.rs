//! Behavior every RecordStore must share, run against each backend.

use std::collections::BTreeMap;

use vaultgate_core::{
    AccessGrant, AuditAction, AuditDraft, AuditEntry, AuthTag, Blake3Hash, ContentId,
    ContentObject, Iv, PrincipalId, SigningKeypair,
};

use crate::error::StoreError;
use crate::traits::{InsertResult, RecordStore, RevokeOutcome};

pub(crate) fn content(id: &str) -> ContentObject {
    ContentObject {
        content_id: ContentId::new(id),
        iv: Iv::from_bytes([1; 12]),
        auth_tag: AuthTag::from_bytes([2; 16]),
        content_hash: Blake3Hash::hash(id.as_bytes()),
        owner: PrincipalId::new("alice"),
        created_at: 1_000,
    }
}

pub(crate) fn grant(content_id: &str, principal: &str, issued_at: i64) -> AccessGrant {
    AccessGrant::issue(
        ContentId::new(content_id),
        PrincipalId::new(principal),
        vec![0xa1, 0x01, 0x02],
        issued_at,
        Some(issued_at + 300_000),
    )
}

pub(crate) fn chain(signer: &SigningKeypair, content_ids: &[&str]) -> Vec<AuditEntry> {
    let mut out: Vec<AuditEntry> = Vec::new();
    for (i, cid) in content_ids.iter().enumerate() {
        let entry = AuditDraft::new(AuditAction::Grant, ContentId::new(*cid))
            .principal(PrincipalId::new("bob"))
            .meta("n", i.to_string())
            .seal(out.last(), 1_000 + i as i64, signer);
        out.push(entry);
    }
    out
}

pub(crate) async fn content_is_write_once<S: RecordStore>(store: &S) {
    let original = content("b3-one");
    assert_eq!(store.insert_content(&original).await.unwrap(), InsertResult::Inserted);

    let mut replacement = original.clone();
    replacement.owner = PrincipalId::new("mallory");
    assert_eq!(
        store.insert_content(&replacement).await.unwrap(),
        InsertResult::AlreadyExists
    );

    let stored = store.get_content(&original.content_id).await.unwrap().unwrap();
    assert_eq!(stored, original);
    assert!(store.get_content(&"b3-missing".into()).await.unwrap().is_none());
}

pub(crate) async fn grant_upsert_replaces_revoked<S: RecordStore>(store: &S) {
    let first = grant("b3-c", "bob", 1_000);
    store.put_grant(&first).await.unwrap();
    store
        .revoke_grant(&first.content_id, &first.principal_id, 2_000)
        .await
        .unwrap();

    let second = grant("b3-c", "bob", 3_000);
    store.put_grant(&second).await.unwrap();

    let stored = store
        .get_grant(&second.content_id, &second.principal_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, second);
    assert!(!stored.revoked);
}

pub(crate) async fn revoke_outcomes<S: RecordStore>(store: &S) {
    let g = grant("b3-c", "bob", 1_000);
    let (cid, pid) = (g.content_id.clone(), g.principal_id.clone());

    assert_eq!(
        store.revoke_grant(&cid, &pid, 1_500).await.unwrap(),
        RevokeOutcome::NotFound
    );

    store.put_grant(&g).await.unwrap();
    assert_eq!(
        store.revoke_grant(&cid, &pid, 2_000).await.unwrap(),
        RevokeOutcome::Revoked
    );
    assert_eq!(
        store.revoke_grant(&cid, &pid, 3_000).await.unwrap(),
        RevokeOutcome::AlreadyRevoked
    );

    // the first revocation time is kept
    let stored = store.get_grant(&cid, &pid).await.unwrap().unwrap();
    assert!(stored.revoked);
    assert_eq!(stored.revoked_at, Some(2_000));
}

pub(crate) async fn audit_append_and_filter<S: RecordStore>(store: &S) {
    let signer = SigningKeypair::from_seed(&[5; 32]);
    let entries = chain(&signer, &["b3-a", "b3-b", "b3-a"]);
    for e in &entries {
        store.append_audit(e).await.unwrap();
    }

    assert_eq!(store.audit_entries(None).await.unwrap(), entries);
    assert_eq!(store.last_audit_entry().await.unwrap(), entries.last().cloned());

    let only_a = store.audit_entries(Some(&"b3-a".into())).await.unwrap();
    let seqs: Vec<u64> = only_a.iter().map(|e| e.seq()).collect();
    assert_eq!(seqs, vec![1, 3]);

    assert!(store
        .audit_entries(Some(&"b3-none".into()))
        .await
        .unwrap()
        .is_empty());
}

pub(crate) async fn audit_rejects_taken_seq<S: RecordStore>(store: &S) {
    let signer = SigningKeypair::from_seed(&[6; 32]);
    let entries = chain(&signer, &["b3-a"]);
    store.append_audit(&entries[0]).await.unwrap();

    let mut metadata = BTreeMap::new();
    metadata.insert("forged".to_string(), "yes".to_string());
    let mut duplicate = entries[0].clone();
    duplicate.header.metadata = metadata;

    let err = store.append_audit(&duplicate).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { seq: 1 }));
    assert_eq!(store.audit_entries(None).await.unwrap().len(), 1);
}

pub(crate) async fn grants_listed_by_principal<S: RecordStore>(store: &S) {
    for p in ["carol", "bob", "dave"] {
        store.put_grant(&grant("b3-c", p, 1_000)).await.unwrap();
    }
    store.put_grant(&grant("b3-other", "erin", 1_000)).await.unwrap();

    let listed = store.grants_for_content(&"b3-c".into()).await.unwrap();
    let names: Vec<&str> = listed.iter().map(|g| g.principal_id.as_str()).collect();
    assert_eq!(names, vec!["bob", "carol", "dave"]);
}
