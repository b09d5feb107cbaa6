//! RecordStore trait: the abstract interface for metadata persistence.
//!
//! The kernel never touches a database directly. Content metadata, grants
//! and the audit ledger all go through this trait, with SQLite as the
//! primary implementation and an in-memory one for tests.

use async_trait::async_trait;
use vaultgate_core::{AccessGrant, AuditEntry, ContentId, ContentObject, PrincipalId};

use crate::error::Result;

/// Result of inserting a content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Record was inserted.
    Inserted,
    /// A record with this content id already exists; nothing was written.
    AlreadyExists,
}

/// What a revoke call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// An unrevoked grant was marked revoked.
    Revoked,
    /// The grant was already revoked; unchanged.
    AlreadyRevoked,
    /// No grant exists for the pair.
    NotFound,
}

impl RevokeOutcome {
    /// Whether this call changed state.
    pub fn changed(self) -> bool {
        matches!(self, RevokeOutcome::Revoked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RevokeOutcome::Revoked => "revoked",
            RevokeOutcome::AlreadyRevoked => "already_revoked",
            RevokeOutcome::NotFound => "not_found",
        }
    }
}

/// Async interface for record persistence.
///
/// # Atomicity
///
/// `insert_content`, `put_grant`, `revoke_grant` and `append_audit` are each
/// a single critical section. Concurrent grant and revoke on the same pair
/// serialize; the later call wins.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Content
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert content metadata. Write-once: an existing id is never replaced.
    async fn insert_content(&self, content: &ContentObject) -> Result<InsertResult>;

    /// Get content metadata by id.
    async fn get_content(&self, content_id: &ContentId) -> Result<Option<ContentObject>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace the grant for `(grant.content_id, grant.principal_id)`.
    async fn put_grant(&self, grant: &AccessGrant) -> Result<()>;

    /// Get the grant for a pair, in whatever state it is in.
    async fn get_grant(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
    ) -> Result<Option<AccessGrant>>;

    /// Mark a grant revoked at `at`.
    async fn revoke_grant(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
        at: i64,
    ) -> Result<RevokeOutcome>;

    /// All grants on a content object, ordered by principal id.
    async fn grants_for_content(&self, content_id: &ContentId) -> Result<Vec<AccessGrant>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Audit ledger
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a sealed entry.
    ///
    /// The entry's seq must be exactly one past the current last entry.
    /// A taken seq returns [`StoreError::Conflict`](crate::StoreError::Conflict).
    async fn append_audit(&self, entry: &AuditEntry) -> Result<()>;

    /// The most recent entry, if any.
    async fn last_audit_entry(&self) -> Result<Option<AuditEntry>>;

    /// Entries in append order, optionally restricted to one content id.
    async fn audit_entries(&self, content_id: Option<&ContentId>) -> Result<Vec<AuditEntry>>;
}
