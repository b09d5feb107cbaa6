//! Audit ledger entries.
//!
//! Every grant, revoke, upload and access decision produces one signed,
//! hash-linked entry. Entries are append-only and never rewritten.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::canonical::{canonical_header_bytes, signed_message};
use crate::crypto::{Blake3Hash, Ed25519Signature, SigningKeypair};
use crate::error::CoreError;
use crate::types::{ContentId, PrincipalId};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum AuditAction {
    Upload = 1,
    Grant = 2,
    Revoke = 3,
    AccessDenied = 4,
    AccessOk = 5,
}

impl AuditAction {
    /// Convert to u16 wire value.
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Convert from u16 wire value.
    pub fn from_u16(value: u16) -> Result<Self, CoreError> {
        match value {
            1 => Ok(AuditAction::Upload),
            2 => Ok(AuditAction::Grant),
            3 => Ok(AuditAction::Revoke),
            4 => Ok(AuditAction::AccessDenied),
            5 => Ok(AuditAction::AccessOk),
            other => Err(CoreError::UnknownAction(other)),
        }
    }

    /// Upper-case name as shown in exported trails.
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Upload => "UPLOAD",
            AuditAction::Grant => "GRANT",
            AuditAction::Revoke => "REVOKE",
            AuditAction::AccessDenied => "ACCESS_DENIED",
            AuditAction::AccessOk => "ACCESS_OK",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed part of an audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditHeader {
    /// Position in the ledger, starting at 1.
    pub seq: u64,
    /// Unix millis, never less than the previous entry's.
    pub timestamp: i64,
    pub action: AuditAction,
    pub content_id: ContentId,
    pub principal_id: Option<PrincipalId>,
    pub metadata: BTreeMap<String, String>,
    /// Hash of the previous entry; `None` only for seq 1.
    pub prev_hash: Option<Blake3Hash>,
}

/// A sealed ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub header: AuditHeader,
    pub signature: Ed25519Signature,
}

impl AuditEntry {
    /// Hash that the next entry links to: `blake3(canonical_header || signature)`.
    pub fn hash(&self) -> Blake3Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&canonical_header_bytes(&self.header));
        hasher.update(self.signature.as_bytes());
        Blake3Hash::from_bytes(*hasher.finalize().as_bytes())
    }

    pub fn seq(&self) -> u64 {
        self.header.seq
    }

    pub fn action(&self) -> AuditAction {
        self.header.action
    }

    pub fn content_id(&self) -> &ContentId {
        &self.header.content_id
    }

    pub fn principal_id(&self) -> Option<&PrincipalId> {
        self.header.principal_id.as_ref()
    }

    pub fn timestamp(&self) -> i64 {
        self.header.timestamp
    }

    /// Look up a metadata value.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.header.metadata.get(key).map(String::as_str)
    }
}

/// An entry that has not yet been placed in the ledger.
///
/// The audit log fills in seq, timestamp and prev_hash when it seals the
/// draft under its append lock.
#[derive(Debug, Clone)]
pub struct AuditDraft {
    action: AuditAction,
    content_id: ContentId,
    principal_id: Option<PrincipalId>,
    metadata: BTreeMap<String, String>,
}

impl AuditDraft {
    pub fn new(action: AuditAction, content_id: ContentId) -> Self {
        Self {
            action,
            content_id,
            principal_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the principal the action concerns.
    pub fn principal(mut self, principal_id: PrincipalId) -> Self {
        self.principal_id = Some(principal_id);
        self
    }

    /// Add a metadata field.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    /// Place the draft after `prev` and sign it.
    pub fn seal(self, prev: Option<&AuditEntry>, now: i64, signer: &SigningKeypair) -> AuditEntry {
        let (seq, timestamp, prev_hash) = match prev {
            Some(last) => (
                last.seq() + 1,
                now.max(last.timestamp()),
                Some(last.hash()),
            ),
            None => (1, now, None),
        };

        let header = AuditHeader {
            seq,
            timestamp,
            action: self.action,
            content_id: self.content_id,
            principal_id: self.principal_id,
            metadata: self.metadata,
            prev_hash,
        };
        let signature = signer.sign(&signed_message(&header));

        AuditEntry { header, signature }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_codes_roundtrip() {
        for action in [
            AuditAction::Upload,
            AuditAction::Grant,
            AuditAction::Revoke,
            AuditAction::AccessDenied,
            AuditAction::AccessOk,
        ] {
            assert_eq!(AuditAction::from_u16(action.to_u16()).unwrap(), action);
        }
        assert!(AuditAction::from_u16(99).is_err());
    }

    #[test]
    fn test_seal_links_to_previous() {
        let signer = SigningKeypair::from_seed(&[7u8; 32]);
        let first = AuditDraft::new(AuditAction::Upload, "b3-x".into()).seal(None, 100, &signer);
        let second = AuditDraft::new(AuditAction::Grant, "b3-x".into())
            .principal("bob".into())
            .meta("grant_id", "abc")
            .seal(Some(&first), 200, &signer);

        assert_eq!(first.seq(), 1);
        assert!(first.header.prev_hash.is_none());
        assert_eq!(second.seq(), 2);
        assert_eq!(second.header.prev_hash, Some(first.hash()));
        assert_eq!(second.meta("grant_id"), Some("abc"));
    }

    #[test]
    fn test_seal_clamps_timestamp_to_previous() {
        let signer = SigningKeypair::generate();
        let first = AuditDraft::new(AuditAction::Upload, "b3-x".into()).seal(None, 500, &signer);
        // clock stepped backwards
        let second =
            AuditDraft::new(AuditAction::AccessOk, "b3-x".into()).seal(Some(&first), 400, &signer);
        assert_eq!(second.timestamp(), 500);
    }

    #[test]
    fn test_hash_covers_metadata() {
        let signer = SigningKeypair::from_seed(&[1u8; 32]);
        let a = AuditDraft::new(AuditAction::Revoke, "b3-x".into())
            .meta("effect", "revoked")
            .seal(None, 1, &signer);
        let b = AuditDraft::new(AuditAction::Revoke, "b3-x".into())
            .meta("effect", "noop")
            .seal(None, 1, &signer);
        assert_ne!(a.hash(), b.hash());
    }
}
