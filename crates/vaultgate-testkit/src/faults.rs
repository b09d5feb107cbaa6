//! Fault injection wrappers around the in-memory stores.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use vaultgate::core::{AccessGrant, AuditEntry, ContentId, ContentObject, PrincipalId};
use vaultgate::store::{InsertResult, MemoryStore, RecordStore, RevokeOutcome, StoreError};
use vaultgate::{ContentStore, ContentStoreError, MemoryContentStore};

/// Content store that fails transiently a set number of times per operation.
pub struct FlakyContentStore {
    inner: MemoryContentStore,
    put_failures: AtomicU32,
    get_failures: AtomicU32,
    put_calls: AtomicU32,
    get_calls: AtomicU32,
}

impl FlakyContentStore {
    /// Fail the first `put_failures` puts and `get_failures` gets.
    pub fn new(put_failures: u32, get_failures: u32) -> Self {
        Self {
            inner: MemoryContentStore::new(),
            put_failures: AtomicU32::new(put_failures),
            get_failures: AtomicU32::new(get_failures),
            put_calls: AtomicU32::new(0),
            get_calls: AtomicU32::new(0),
        }
    }

    /// Never succeeds.
    pub fn unreachable() -> Self {
        Self::new(u32::MAX, u32::MAX)
    }

    /// Fail the next `n` gets.
    pub fn fail_gets(&self, n: u32) {
        self.get_failures.store(n, Ordering::SeqCst);
    }

    pub fn put_calls(&self) -> u32 {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryContentStore {
        &self.inner
    }

    fn take_failure(budget: &AtomicU32) -> bool {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ContentStore for FlakyContentStore {
    async fn put(&self, data: Bytes) -> Result<ContentId, ContentStoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.put_failures) {
            return Err(ContentStoreError::Transient("connection reset".into()));
        }
        self.inner.put(data).await
    }

    async fn get(&self, id: &ContentId) -> Result<Bytes, ContentStoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.get_failures) {
            return Err(ContentStoreError::Transient("gateway timeout".into()));
        }
        self.inner.get(id).await
    }
}

/// How [`UnavailableAuditStore`] treats audit appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuditFault {
    /// Appends go through.
    Healthy = 0,
    /// Appends fail immediately.
    Failing = 1,
    /// Appends hang for an hour.
    Stalled = 2,
}

/// Record store whose audit ledger can be switched off.
///
/// Content and grant records always go through to the wrapped
/// [`MemoryStore`].
pub struct UnavailableAuditStore {
    inner: MemoryStore,
    fault: AtomicU8,
}

impl UnavailableAuditStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fault: AtomicU8::new(AuditFault::Healthy as u8),
        }
    }

    pub fn set_fault(&self, fault: AuditFault) {
        self.fault.store(fault as u8, Ordering::SeqCst);
    }

    pub fn fault(&self) -> AuditFault {
        match self.fault.load(Ordering::SeqCst) {
            1 => AuditFault::Failing,
            2 => AuditFault::Stalled,
            _ => AuditFault::Healthy,
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl Default for UnavailableAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for UnavailableAuditStore {
    async fn insert_content(&self, content: &ContentObject) -> vaultgate::store::Result<InsertResult> {
        self.inner.insert_content(content).await
    }

    async fn get_content(&self, content_id: &ContentId) -> vaultgate::store::Result<Option<ContentObject>> {
        self.inner.get_content(content_id).await
    }

    async fn put_grant(&self, grant: &AccessGrant) -> vaultgate::store::Result<()> {
        self.inner.put_grant(grant).await
    }

    async fn get_grant(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
    ) -> vaultgate::store::Result<Option<AccessGrant>> {
        self.inner.get_grant(content_id, principal_id).await
    }

    async fn revoke_grant(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
        at: i64,
    ) -> vaultgate::store::Result<RevokeOutcome> {
        self.inner.revoke_grant(content_id, principal_id, at).await
    }

    async fn grants_for_content(&self, content_id: &ContentId) -> vaultgate::store::Result<Vec<AccessGrant>> {
        self.inner.grants_for_content(content_id).await
    }

    async fn append_audit(&self, entry: &AuditEntry) -> vaultgate::store::Result<()> {
        match self.fault() {
            AuditFault::Healthy => self.inner.append_audit(entry).await,
            AuditFault::Failing => Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "audit ledger offline",
            ))),
            AuditFault::Stalled => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                self.inner.append_audit(entry).await
            }
        }
    }

    async fn last_audit_entry(&self) -> vaultgate::store::Result<Option<AuditEntry>> {
        self.inner.last_audit_entry().await
    }

    async fn audit_entries(&self, content_id: Option<&ContentId>) -> vaultgate::store::Result<Vec<AuditEntry>> {
        self.inner.audit_entries(content_id).await
    }
}

/// Record store whose grant writes can be slowed down or refused.
///
/// A slowed write commits immediately and acknowledges after the delay,
/// which widens the window between a registry change and its audit entry.
pub struct GrantFaultStore {
    inner: MemoryStore,
    ack_delay_ms: AtomicU64,
    failing: AtomicBool,
}

impl GrantFaultStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            ack_delay_ms: AtomicU64::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Delay the acknowledgement of every later grant write.
    pub fn set_ack_delay(&self, delay: Duration) {
        self.ack_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Refuse grant writes until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl Default for GrantFaultStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for GrantFaultStore {
    async fn insert_content(&self, content: &ContentObject) -> vaultgate::store::Result<InsertResult> {
        self.inner.insert_content(content).await
    }

    async fn get_content(&self, content_id: &ContentId) -> vaultgate::store::Result<Option<ContentObject>> {
        self.inner.get_content(content_id).await
    }

    async fn put_grant(&self, grant: &AccessGrant) -> vaultgate::store::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "grant table offline",
            )));
        }
        self.inner.put_grant(grant).await?;
        let delay = self.ack_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(())
    }

    async fn get_grant(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
    ) -> vaultgate::store::Result<Option<AccessGrant>> {
        self.inner.get_grant(content_id, principal_id).await
    }

    async fn revoke_grant(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
        at: i64,
    ) -> vaultgate::store::Result<RevokeOutcome> {
        self.inner.revoke_grant(content_id, principal_id, at).await
    }

    async fn grants_for_content(&self, content_id: &ContentId) -> vaultgate::store::Result<Vec<AccessGrant>> {
        self.inner.grants_for_content(content_id).await
    }

    async fn append_audit(&self, entry: &AuditEntry) -> vaultgate::store::Result<()> {
        self.inner.append_audit(entry).await
    }

    async fn last_audit_entry(&self) -> vaultgate::store::Result<Option<AuditEntry>> {
        self.inner.last_audit_entry().await
    }

    async fn audit_entries(&self, content_id: Option<&ContentId>) -> vaultgate::store::Result<Vec<AuditEntry>> {
        self.inner.audit_entries(content_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flaky_store_recovers_after_budget() {
        let store = FlakyContentStore::new(2, 0);
        assert!(store.put(Bytes::from_static(b"a")).await.unwrap_err().is_transient());
        assert!(store.put(Bytes::from_static(b"a")).await.is_err());
        let id = store.put(Bytes::from_static(b"a")).await.unwrap();
        assert_eq!(store.put_calls(), 3);
        assert_eq!(store.get(&id).await.unwrap(), Bytes::from_static(b"a"));
    }

    #[tokio::test]
    async fn test_audit_fault_only_affects_audit() {
        let store = UnavailableAuditStore::new();
        store.set_fault(AuditFault::Failing);
        assert_eq!(store.fault(), AuditFault::Failing);
        assert!(store.get_content(&"b3-x".into()).await.unwrap().is_none());
        assert!(store.last_audit_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refused_grant_write_leaves_no_row() {
        let store = GrantFaultStore::new();
        store.set_failing(true);
        let grant = AccessGrant::issue("b3-x".into(), "bob".into(), vec![1], 0, None);
        assert!(store.put_grant(&grant).await.is_err());
        assert!(store.get_grant(&"b3-x".into(), &"bob".into()).await.unwrap().is_none());

        store.set_failing(false);
        store.put_grant(&grant).await.unwrap();
        assert!(store.inner().get_grant(&"b3-x".into(), &"bob".into()).await.unwrap().is_some());
    }
}
