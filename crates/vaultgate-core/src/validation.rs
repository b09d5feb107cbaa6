//! Audit ledger verification.

use crate::audit::AuditEntry;
use crate::canonical::signed_message;
use crate::crypto::Ed25519PublicKey;
use crate::error::AuditChainError;

/// Verify a single entry's signature.
pub fn verify_entry(entry: &AuditEntry, signer: &Ed25519PublicKey) -> Result<(), AuditChainError> {
    signer
        .verify(&signed_message(&entry.header), &entry.signature)
        .map_err(|_| AuditChainError::SignatureFailed {
            seq: entry.header.seq,
        })
}

/// Verify a complete ledger export, in append order.
///
/// Checks, per entry:
/// - Sequence starts at 1 and has no gaps
/// - `prev_hash` matches the hash of the preceding entry
/// - Timestamps never decrease
/// - The signature verifies under `signer`
///
/// An empty ledger is valid.
pub fn verify_audit_chain(
    entries: &[AuditEntry],
    signer: &Ed25519PublicKey,
) -> Result<(), AuditChainError> {
    let mut prev: Option<&AuditEntry> = None;

    for entry in entries {
        let header = &entry.header;

        match prev {
            None => {
                if header.seq != 1 {
                    return Err(AuditChainError::BadStart(header.seq));
                }
                if header.prev_hash.is_some() {
                    return Err(AuditChainError::BrokenLink { seq: header.seq });
                }
            }
            Some(last) => {
                let expected = last.header.seq + 1;
                if header.seq != expected {
                    return Err(AuditChainError::SequenceGap {
                        expected,
                        got: header.seq,
                    });
                }
                if header.prev_hash != Some(last.hash()) {
                    return Err(AuditChainError::BrokenLink { seq: header.seq });
                }
                if header.timestamp < last.header.timestamp {
                    return Err(AuditChainError::TimestampRegressed { seq: header.seq });
                }
            }
        }

        verify_entry(entry, signer)?;
        prev = Some(entry);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditAction, AuditDraft};
    use crate::crypto::SigningKeypair;
    use proptest::prelude::*;

    fn build_chain(signer: &SigningKeypair, times: &[i64]) -> Vec<AuditEntry> {
        let mut out: Vec<AuditEntry> = Vec::new();
        for (i, t) in times.iter().enumerate() {
            let entry = AuditDraft::new(AuditAction::AccessOk, "b3-c".into())
                .meta("i", i.to_string())
                .seal(out.last(), *t, signer);
            out.push(entry);
        }
        out
    }

    #[test]
    fn test_valid_chain() {
        let signer = SigningKeypair::generate();
        let chain = build_chain(&signer, &[10, 20, 20, 30]);
        verify_audit_chain(&chain, &signer.public_key()).unwrap();
    }

    #[test]
    fn test_empty_chain_is_valid() {
        let signer = SigningKeypair::generate();
        verify_audit_chain(&[], &signer.public_key()).unwrap();
    }

    #[test]
    fn test_missing_first_entry() {
        let signer = SigningKeypair::generate();
        let chain = build_chain(&signer, &[1, 2, 3]);
        assert_eq!(
            verify_audit_chain(&chain[1..], &signer.public_key()),
            Err(AuditChainError::BadStart(2))
        );
    }

    #[test]
    fn test_deleted_middle_entry() {
        let signer = SigningKeypair::generate();
        let mut chain = build_chain(&signer, &[1, 2, 3]);
        chain.remove(1);
        assert_eq!(
            verify_audit_chain(&chain, &signer.public_key()),
            Err(AuditChainError::SequenceGap { expected: 2, got: 3 })
        );
    }

    #[test]
    fn test_edited_metadata_breaks_signature() {
        let signer = SigningKeypair::generate();
        let mut chain = build_chain(&signer, &[1, 2]);
        chain[1].header.metadata.insert("i".into(), "forged".into());
        assert_eq!(
            verify_audit_chain(&chain, &signer.public_key()),
            Err(AuditChainError::SignatureFailed { seq: 2 })
        );
    }

    #[test]
    fn test_edited_earlier_entry_breaks_link() {
        let signer = SigningKeypair::generate();
        let mut chain = build_chain(&signer, &[1, 2]);
        // re-sign a modified first entry; the second still points at the old one
        chain[0] = AuditDraft::new(AuditAction::Upload, "b3-other".into()).seal(None, 1, &signer);
        assert_eq!(
            verify_audit_chain(&chain, &signer.public_key()),
            Err(AuditChainError::BrokenLink { seq: 2 })
        );
    }

    #[test]
    fn test_wrong_signer() {
        let signer = SigningKeypair::generate();
        let chain = build_chain(&signer, &[1]);
        let other = SigningKeypair::generate();
        assert_eq!(
            verify_audit_chain(&chain, &other.public_key()),
            Err(AuditChainError::SignatureFailed { seq: 1 })
        );
    }

    proptest! {
        #[test]
        fn prop_sealed_chains_verify(times in proptest::collection::vec(-1_000i64..1_000_000, 0..20)) {
            let signer = SigningKeypair::from_seed(&[9u8; 32]);
            let chain = build_chain(&signer, &times);
            prop_assert!(verify_audit_chain(&chain, &signer.public_key()).is_ok());
            for pair in chain.windows(2) {
                prop_assert!(pair[0].timestamp() <= pair[1].timestamp());
            }
        }
    }
}
