//! The signed, hash-linked audit ledger.
//!
//! Every entry is sealed against the current tail and appended under a
//! single lock, so sequence numbers have no gaps and timestamps never go
//! backwards even if the clock does.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use vaultgate_core::{
    verify_audit_chain, AuditDraft, AuditEntry, Clock, ContentId, Ed25519PublicKey, SigningKeypair,
};
use vaultgate_store::RecordStore;

use crate::error::{KernelError, Result};

/// Append-only audit log backed by a [`RecordStore`].
pub struct AuditLog<S: RecordStore> {
    store: Arc<S>,
    signer: Arc<SigningKeypair>,
    clock: Arc<dyn Clock>,
    append_lock: Arc<Mutex<()>>,
    timeout: Duration,
}

impl<S: RecordStore> AuditLog<S> {
    pub fn new(
        store: Arc<S>,
        signer: SigningKeypair,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            signer: Arc::new(signer),
            clock,
            append_lock: Arc::new(Mutex::new(())),
            timeout,
        }
    }

    /// Key that verifies every entry in this log.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.signer.public_key()
    }

    /// Seal and append one entry.
    ///
    /// Any store failure, or not finishing within the configured timeout,
    /// is reported as [`KernelError::AuditUnavailable`].
    ///
    /// The write runs as its own task holding the append lock. A timeout
    /// stops the wait, not the write: the entry may still land afterwards,
    /// and later appends queue behind it instead of racing it for a
    /// sequence number.
    pub async fn append(&self, draft: AuditDraft) -> Result<AuditEntry> {
        let action = draft.action();
        let store = self.store.clone();
        let signer = self.signer.clone();
        let clock = self.clock.clone();
        let lock = self.append_lock.clone();

        let write = tokio::spawn(async move {
            let _guard = lock.lock_owned().await;
            let last = store.last_audit_entry().await?;
            let entry = draft.seal(last.as_ref(), clock.now_millis(), &signer);
            store.append_audit(&entry).await?;
            Ok::<_, vaultgate_store::StoreError>(entry)
        });

        match tokio::time::timeout(self.timeout, write).await {
            Ok(Ok(Ok(entry))) => {
                tracing::debug!(
                    seq = entry.seq(),
                    action = %entry.action(),
                    content_id = %entry.content_id(),
                    "audit entry appended"
                );
                Ok(entry)
            }
            Ok(Ok(Err(e))) => {
                tracing::error!(action = %action, error = %e, "audit append failed");
                Err(KernelError::AuditUnavailable(e.to_string()))
            }
            Ok(Err(e)) => {
                tracing::error!(action = %action, error = %e, "audit append task failed");
                Err(KernelError::AuditUnavailable(e.to_string()))
            }
            Err(_) => {
                tracing::error!(action = %action, timeout_ms = self.timeout.as_millis() as u64, "audit append timed out");
                Err(KernelError::AuditUnavailable("append timed out".into()))
            }
        }
    }

    /// Entries in append order, optionally for one content object.
    pub async fn query(&self, content_id: Option<&ContentId>) -> Result<Vec<AuditEntry>> {
        Ok(self.store.audit_entries(content_id).await?)
    }

    /// Verify the whole ledger. Returns the number of entries checked.
    pub async fn verify(&self) -> Result<usize> {
        let entries = self.store.audit_entries(None).await?;
        verify_audit_chain(&entries, &self.public_key())?;
        Ok(entries.len())
    }
}
