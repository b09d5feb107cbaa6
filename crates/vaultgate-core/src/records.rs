//! Persisted records: content metadata and access grants.

use serde::{Deserialize, Serialize};

use crate::crypto::Blake3Hash;
use crate::types::{AuthTag, ContentId, GrantId, Iv, PrincipalId};

/// Milliseconds in one minute.
pub const MINUTE_MS: i64 = 60_000;

/// Metadata for one encrypted content object.
///
/// Write-once. The ciphertext itself lives in the external content store;
/// this record holds what is needed to decrypt and check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentObject {
    pub content_id: ContentId,
    pub iv: Iv,
    pub auth_tag: AuthTag,
    /// Blake3 of the plaintext, checked after decryption.
    pub content_hash: Blake3Hash,
    pub owner: PrincipalId,
    /// Registration time (Unix millis).
    pub created_at: i64,
}

/// Derived state of a grant at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantState {
    Active,
    Expired,
    Revoked,
}

/// A principal's right to decrypt one content object.
///
/// At most one per `(content_id, principal_id)`; issuing a new grant for the
/// pair replaces the old one, revoked or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub grant_id: GrantId,
    pub content_id: ContentId,
    pub principal_id: PrincipalId,
    /// Content key wrapped to the principal's public key (CBOR).
    pub wrapped_key: Vec<u8>,
    pub issued_at: i64,
    /// `None` means permanent.
    pub expires_at: Option<i64>,
    pub revoked: bool,
    pub revoked_at: Option<i64>,
}

impl AccessGrant {
    /// Create a fresh, unrevoked grant.
    pub fn issue(
        content_id: ContentId,
        principal_id: PrincipalId,
        wrapped_key: Vec<u8>,
        issued_at: i64,
        expires_at: Option<i64>,
    ) -> Self {
        let grant_id = GrantId::derive(&content_id, &principal_id, issued_at, &wrapped_key);
        Self {
            grant_id,
            content_id,
            principal_id,
            wrapped_key,
            issued_at,
            expires_at,
            revoked: false,
            revoked_at: None,
        }
    }

    /// State of this grant at `now`. Revocation takes precedence over expiry.
    pub fn state(&self, now: i64) -> GrantState {
        if self.revoked {
            GrantState::Revoked
        } else if self.expires_at.is_some_and(|t| now >= t) {
            GrantState::Expired
        } else {
            GrantState::Active
        }
    }

    /// Whether the grant authorizes access at `now`.
    pub fn is_valid(&self, now: i64) -> bool {
        self.state(now) == GrantState::Active
    }
}

/// Expiry timestamp for a grant issued at `now` with an optional TTL.
///
/// Returns `None` (permanent) when no TTL is given.
pub fn expiry_from_ttl(now: i64, ttl_minutes: Option<u32>) -> Option<i64> {
    ttl_minutes.map(|m| now.saturating_add(i64::from(m).saturating_mul(MINUTE_MS)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(expires_at: Option<i64>) -> AccessGrant {
        AccessGrant::issue("b3-c".into(), "bob".into(), vec![1, 2, 3], 1_000, expires_at)
    }

    #[test]
    fn test_permanent_grant_never_expires() {
        let g = grant(None);
        assert!(g.is_valid(i64::MAX));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let g = grant(Some(5_000));
        assert!(g.is_valid(4_999));
        assert_eq!(g.state(5_000), GrantState::Expired);
        assert_eq!(g.state(5_001), GrantState::Expired);
    }

    #[test]
    fn test_revoked_wins_over_expired() {
        let mut g = grant(Some(5_000));
        g.revoked = true;
        g.revoked_at = Some(2_000);
        assert_eq!(g.state(10_000), GrantState::Revoked);
        assert!(!g.is_valid(1_500));
    }

    #[test]
    fn test_expiry_from_ttl() {
        assert_eq!(expiry_from_ttl(1_000, None), None);
        assert_eq!(expiry_from_ttl(1_000, Some(5)), Some(1_000 + 5 * MINUTE_MS));
    }
}
