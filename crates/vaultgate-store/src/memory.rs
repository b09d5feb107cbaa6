//! In-memory implementation of the RecordStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use vaultgate_core::{AccessGrant, AuditEntry, ContentId, ContentObject, PrincipalId};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, RecordStore, RevokeOutcome};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; every
/// mutation happens under one write guard.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    contents: HashMap<ContentId, ContentObject>,

    grants: HashMap<(ContentId, PrincipalId), AccessGrant>,

    /// Audit arena; entry with seq `n` lives at index `n - 1`.
    audit: Vec<AuditEntry>,

    /// Content id -> arena indices, in append order.
    audit_by_content: HashMap<ContentId, Vec<usize>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_content(&self, content: &ContentObject) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.contents.contains_key(&content.content_id) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner
            .contents
            .insert(content.content_id.clone(), content.clone());

        Ok(InsertResult::Inserted)
    }

    async fn get_content(&self, content_id: &ContentId) -> Result<Option<ContentObject>> {
        Ok(self.read()?.contents.get(content_id).cloned())
    }

    async fn put_grant(&self, grant: &AccessGrant) -> Result<()> {
        let mut inner = self.write()?;
        inner.grants.insert(
            (grant.content_id.clone(), grant.principal_id.clone()),
            grant.clone(),
        );
        Ok(())
    }

    async fn get_grant(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
    ) -> Result<Option<AccessGrant>> {
        let inner = self.read()?;
        Ok(inner
            .grants
            .get(&(content_id.clone(), principal_id.clone()))
            .cloned())
    }

    async fn revoke_grant(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
        at: i64,
    ) -> Result<RevokeOutcome> {
        let mut inner = self.write()?;

        let Some(grant) = inner
            .grants
            .get_mut(&(content_id.clone(), principal_id.clone()))
        else {
            return Ok(RevokeOutcome::NotFound);
        };

        if grant.revoked {
            return Ok(RevokeOutcome::AlreadyRevoked);
        }
        grant.revoked = true;
        grant.revoked_at = Some(at);

        Ok(RevokeOutcome::Revoked)
    }

    async fn grants_for_content(&self, content_id: &ContentId) -> Result<Vec<AccessGrant>> {
        let inner = self.read()?;
        let mut grants: Vec<AccessGrant> = inner
            .grants
            .values()
            .filter(|g| &g.content_id == content_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| a.principal_id.cmp(&b.principal_id));
        Ok(grants)
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        let mut inner = self.write()?;

        let next = inner.audit.len() as u64 + 1;
        let seq = entry.seq();
        if seq < next {
            return Err(StoreError::Conflict { seq });
        }
        if seq > next {
            return Err(StoreError::InvalidData(format!(
                "audit seq {seq} skips ahead of {next}"
            )));
        }

        let index = inner.audit.len();
        inner.audit.push(entry.clone());
        inner
            .audit_by_content
            .entry(entry.content_id().clone())
            .or_default()
            .push(index);

        Ok(())
    }

    async fn last_audit_entry(&self) -> Result<Option<AuditEntry>> {
        Ok(self.read()?.audit.last().cloned())
    }

    async fn audit_entries(&self, content_id: Option<&ContentId>) -> Result<Vec<AuditEntry>> {
        let inner = self.read()?;
        let entries = match content_id {
            None => inner.audit.clone(),
            Some(id) => inner
                .audit_by_content
                .get(id)
                .map(|indices| indices.iter().map(|&i| inner.audit[i].clone()).collect())
                .unwrap_or_default(),
        };
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance;

    #[tokio::test]
    async fn test_content_is_write_once() {
        conformance::content_is_write_once(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_grant_upsert_replaces_revoked() {
        conformance::grant_upsert_replaces_revoked(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_revoke_outcomes() {
        conformance::revoke_outcomes(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_audit_append_and_filter() {
        conformance::audit_append_and_filter(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_audit_rejects_taken_seq() {
        conformance::audit_rejects_taken_seq(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_grants_listed_by_principal() {
        conformance::grants_listed_by_principal(&MemoryStore::new()).await;
    }
}
