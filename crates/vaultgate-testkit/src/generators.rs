//! Proptest generators for property-based testing.

use proptest::prelude::*;

use vaultgate::core::{AuditAction, AuditDraft, ContentId, PrincipalId, Role, SigningKeypair};
use vaultgate::perms::{ContentKey, PrincipalSecret};

/// Generate a deterministic audit signing keypair.
pub fn signing_keypair() -> impl Strategy<Value = SigningKeypair> {
    any::<[u8; 32]>().prop_map(|seed| SigningKeypair::from_seed(&seed))
}

/// Generate a content key.
pub fn content_key() -> impl Strategy<Value = ContentKey> {
    any::<[u8; 32]>().prop_map(ContentKey::from_bytes)
}

/// Generate a principal secret.
pub fn principal_secret() -> impl Strategy<Value = PrincipalSecret> {
    any::<[u8; 32]>().prop_map(PrincipalSecret::from_bytes)
}

/// Generate plaintext of at most `max_len` bytes.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a principal id.
pub fn principal_id() -> impl Strategy<Value = PrincipalId> {
    "[a-z][a-z0-9._-]{0,23}".prop_map(PrincipalId::new)
}

/// Generate a content id in the `b3-<hex>` form.
pub fn content_id() -> impl Strategy<Value = ContentId> {
    any::<[u8; 32]>().prop_map(|b| ContentId::new(format!("b3-{}", hex::encode(b))))
}

/// Generate a role that may hold grants.
pub fn grantable_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Owner), Just(Role::Keyholder), Just(Role::Admin)]
}

/// Generate a TTL in minutes, `None` for permanent.
pub fn ttl_minutes() -> impl Strategy<Value = Option<u32>> {
    prop_oneof![Just(None), (1u32..=7 * 24 * 60).prop_map(Some)]
}

/// Generate an audit action.
pub fn audit_action() -> impl Strategy<Value = AuditAction> {
    prop_oneof![
        Just(AuditAction::Upload),
        Just(AuditAction::Grant),
        Just(AuditAction::Revoke),
        Just(AuditAction::AccessDenied),
        Just(AuditAction::AccessOk),
    ]
}

/// Generate an unsealed audit entry.
pub fn audit_draft() -> impl Strategy<Value = AuditDraft> {
    (
        audit_action(),
        content_id(),
        prop::option::of(principal_id()),
        prop::collection::btree_map("[a-z_]{1,12}", "[ -~]{0,32}", 0..4),
    )
        .prop_map(|(action, cid, pid, meta)| {
            let mut draft = AuditDraft::new(action, cid);
            if let Some(pid) = pid {
                draft = draft.principal(pid);
            }
            meta.into_iter().fold(draft, |d, (k, v)| d.meta(k, v))
        })
}

/// A share/revoke operation against one content object.
#[derive(Debug, Clone)]
pub enum GrantOp {
    Share { recipient: usize, ttl: Option<u32> },
    Revoke { recipient: usize },
    AdvanceMinutes(u32),
}

/// Generate a sequence of grant operations over `recipients` principals.
pub fn grant_ops(recipients: usize, max_ops: usize) -> impl Strategy<Value = Vec<GrantOp>> {
    let recipients = recipients.max(1);
    let op = prop_oneof![
        3 => (0..recipients, ttl_minutes()).prop_map(|(recipient, ttl)| GrantOp::Share { recipient, ttl }),
        2 => (0..recipients).prop_map(|recipient| GrantOp::Revoke { recipient }),
        1 => (1u32..=120).prop_map(GrantOp::AdvanceMinutes),
    ];
    prop::collection::vec(op, 1..=max_ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultgate::core::verify_audit_chain;
    use vaultgate::perms::{ContentCipher, KeyWrapper};

    proptest! {
        #[test]
        fn test_wrap_roundtrip(key in content_key(), secret in principal_secret()) {
            let wrapped = KeyWrapper::wrap(&key, &secret.public_key()).unwrap();
            let unwrapped = KeyWrapper::unwrap(&wrapped, &secret).unwrap();
            prop_assert_eq!(unwrapped.as_bytes(), key.as_bytes());
        }

        #[test]
        fn test_cipher_roundtrip(key in content_key(), data in plaintext(4096)) {
            let sealed = ContentCipher::encrypt(data.clone(), &key).unwrap();
            let opened = ContentCipher::decrypt(&sealed.ciphertext, &key, &sealed.iv, &sealed.tag).unwrap();
            prop_assert_eq!(&opened[..], &data[..]);
        }

        #[test]
        fn test_sealed_drafts_form_valid_chain(
            signer in signing_keypair(),
            drafts in prop::collection::vec(audit_draft(), 1..16),
            start in 0i64..1_000_000,
        ) {
            let mut entries: Vec<vaultgate::core::AuditEntry> = Vec::new();
            for (i, draft) in drafts.into_iter().enumerate() {
                let entry = draft.seal(entries.last(), start + i as i64, &signer);
                entries.push(entry);
            }
            prop_assert!(verify_audit_chain(&entries, &signer.public_key()).is_ok());
        }
    }
}
