//! The Kernel: the boundary API of Vaultgate.
//!
//! The Kernel wires the cipher, key wrapper, registry, audit log and gate
//! together. Callers see upload, share, revoke and retrieve; everything
//! in between is recorded in the audit ledger.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use zeroize::Zeroizing;

use vaultgate_core::{
    AccessGrant, AuditAction, AuditDraft, AuditEntry, Blake3Hash, Clock, ContentId,
    Ed25519PublicKey, GrantId, PrincipalId, Role, SigningKeypair, SystemClock,
};
use vaultgate_perms::{ContentCipher, ContentKey, KeyWrapper, Principal, PrincipalSecret};
use vaultgate_store::{RecordStore, RevokeOutcome};

use crate::audit::AuditLog;
use crate::content_store::ContentStore;
use crate::error::{KernelError, Result};
use crate::gate::AccessGate;
use crate::notify::{Notification, NotificationQueue};
use crate::registry::{AccessRegistry, GrantStatus};
use crate::retry::RetryPolicy;
use crate::share::ShareCoordinator;

/// Configuration for the Kernel.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Retry budget for content-store calls.
    pub retry: RetryPolicy,
    /// Upper bound on a single audit append.
    pub audit_timeout: Duration,
    /// Check the plaintext hash after decryption.
    pub verify_content_hash: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            audit_timeout: Duration::from_secs(5),
            verify_content_hash: true,
        }
    }
}

impl KernelConfig {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_audit_timeout(mut self, timeout: Duration) -> Self {
        self.audit_timeout = timeout;
        self
    }

    pub fn with_content_hash_check(mut self, enabled: bool) -> Self {
        self.verify_content_hash = enabled;
        self
    }
}

/// Result of a successful upload.
///
/// `content_key` is handed back once so the owner can share without going
/// through [`Kernel::recover_content_key`]. The kernel keeps no copy.
#[derive(Debug)]
pub struct UploadReceipt {
    pub content_id: ContentId,
    pub content_key: ContentKey,
    pub content_hash: Blake3Hash,
    pub owner_grant: AccessGrant,
}

/// Builder for [`Kernel`].
pub struct KernelBuilder<S: RecordStore> {
    signer: SigningKeypair,
    store: S,
    content: Arc<dyn ContentStore>,
    clock: Arc<dyn Clock>,
    notifications: Option<NotificationQueue>,
    config: KernelConfig,
}

impl<S: RecordStore> KernelBuilder<S> {
    pub fn config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the wall clock, e.g. with a `ManualClock` in tests.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Queue notifications here after each committed operation.
    pub fn notifications(mut self, queue: NotificationQueue) -> Self {
        self.notifications = Some(queue);
        self
    }

    pub fn build(self) -> Kernel<S> {
        let store = Arc::new(self.store);
        let registry = AccessRegistry::new(store.clone(), self.clock.clone());
        let audit = AuditLog::new(
            store.clone(),
            self.signer,
            self.clock,
            self.config.audit_timeout,
        );
        Kernel {
            store,
            registry,
            audit,
            content: self.content,
            notifications: self.notifications,
            config: self.config,
        }
    }
}

/// The main Kernel struct.
///
/// Provides:
/// - Uploading content as ciphertext with an owner self-grant
/// - Sharing and revoking access per principal
/// - Gated retrieval with plaintext integrity checks
/// - A signed, verifiable audit trail
pub struct Kernel<S: RecordStore> {
    store: Arc<S>,
    registry: AccessRegistry<S>,
    audit: AuditLog<S>,
    content: Arc<dyn ContentStore>,
    notifications: Option<NotificationQueue>,
    config: KernelConfig,
}

impl<S: RecordStore> Kernel<S> {
    /// Start building a kernel that signs audit entries with `signer`.
    pub fn builder(
        signer: SigningKeypair,
        store: S,
        content: Arc<dyn ContentStore>,
    ) -> KernelBuilder<S> {
        KernelBuilder {
            signer,
            store,
            content,
            clock: Arc::new(SystemClock),
            notifications: None,
            config: KernelConfig::default(),
        }
    }

    /// Key that verifies this kernel's audit entries.
    pub fn audit_public_key(&self) -> Ed25519PublicKey {
        self.audit.public_key()
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    fn gate(&self) -> AccessGate<'_, S> {
        AccessGate::new(&self.registry, &self.audit)
    }

    fn coordinator(&self) -> ShareCoordinator<'_, S> {
        ShareCoordinator::new(&self.registry, &self.audit, self.notifications.as_ref())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Content Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt `plaintext`, store the ciphertext and register it.
    ///
    /// Metadata is registered only after the content store confirms the put.
    /// The owner receives a permanent self-grant before the UPLOAD entry is
    /// written; if that append fails the content stays reachable through
    /// [`recover_content_key`](Self::recover_content_key).
    ///
    /// If the self-grant itself fails, the content row is left registered
    /// without any grant and the content key is dropped with the error. The
    /// ciphertext is then unreadable; upload again to get a fresh object.
    ///
    /// The plaintext buffer is zeroized on every return path.
    pub async fn upload(&self, owner: &Principal, plaintext: Vec<u8>) -> Result<UploadReceipt> {
        let mut plaintext = Zeroizing::new(plaintext);
        if !owner.role.can_upload() {
            return Err(KernelError::NotAuthorized(format!(
                "{} principals cannot upload",
                owner.role
            )));
        }
        let owner_key = owner.public_key.as_ref().ok_or_else(|| {
            KernelError::InvalidGrant(format!("{} has no public key", owner.id))
        })?;

        let size = plaintext.len();
        let content_hash = Blake3Hash::hash(&plaintext);
        let content_key = ContentCipher::generate_key();
        let sealed = ContentCipher::encrypt(std::mem::take(&mut *plaintext), &content_key)?;

        let ciphertext = Bytes::from(sealed.ciphertext);
        let content_store = &self.content;
        let content_id = self
            .config
            .retry
            .run("put", move || content_store.put(ciphertext.clone()))
            .await?;

        let content = self
            .registry
            .register_content(
                content_id.clone(),
                sealed.iv,
                sealed.tag,
                content_hash,
                owner.id.clone(),
            )
            .await?;

        let wrapped = KeyWrapper::wrap(&content_key, owner_key)?.to_bytes()?;
        let owner_grant = {
            let _pair = self.registry.lock_pair(&content_id, &owner.id).await;
            self.registry
                .grant(&content_id, &owner.id, wrapped, None)
                .await
                .map_err(|e| {
                    tracing::warn!(
                        content_id = %content_id,
                        owner = %owner.id,
                        error = %e,
                        "owner grant failed; content registered without access"
                    );
                    e
                })?
        };

        self.audit
            .append(
                AuditDraft::new(AuditAction::Upload, content_id.clone())
                    .principal(owner.id.clone())
                    .meta("size", size.to_string())
                    .meta("owner_grant", owner_grant.grant_id.to_hex()),
            )
            .await?;

        tracing::info!(
            content_id = %content_id,
            owner = %owner.id,
            size,
            created_at = content.created_at,
            "content uploaded"
        );

        Ok(UploadReceipt {
            content_id,
            content_key,
            content_hash,
            owner_grant,
        })
    }

    /// Give `recipient` access to a content object.
    ///
    /// `ttl_minutes` of `None` makes the grant permanent.
    pub async fn share(
        &self,
        content_id: &ContentId,
        content_key: &ContentKey,
        recipient: &Principal,
        ttl_minutes: Option<u32>,
    ) -> Result<GrantId> {
        let grant = self
            .coordinator()
            .share_content(content_id, content_key, recipient, ttl_minutes)
            .await?;
        Ok(grant.grant_id)
    }

    /// Revoke a principal's access. Idempotent.
    pub async fn revoke(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
    ) -> Result<RevokeOutcome> {
        self.coordinator().revoke_access(content_id, principal_id).await
    }

    /// Decrypt a content object for `caller`.
    ///
    /// `caller_secret` is used for the unwrap only and never stored.
    pub async fn retrieve(
        &self,
        content_id: &ContentId,
        caller: &Principal,
        caller_secret: &PrincipalSecret,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let grant = self.gate().authorize(content_id, caller).await?;
        let content = self.registry.content(content_id).await?;
        let content_key = KeyWrapper::unwrap_bytes(&grant.wrapped_key, caller_secret)?;

        let content_store = &self.content;
        let ciphertext = self
            .config
            .retry
            .run("get", move || content_store.get(content_id))
            .await?;

        let plaintext =
            ContentCipher::decrypt(&ciphertext, &content_key, &content.iv, &content.auth_tag)?;

        if self.config.verify_content_hash && Blake3Hash::hash(&plaintext) != content.content_hash {
            tracing::warn!(content_id = %content_id, "plaintext hash mismatch");
            return Err(KernelError::Integrity);
        }

        if caller.id != content.owner {
            if let Some(queue) = &self.notifications {
                queue.enqueue(Notification::ContentAccessed {
                    content_id: content_id.clone(),
                    owner: content.owner.clone(),
                    accessed_by: caller.id.clone(),
                });
            }
        }

        tracing::debug!(content_id = %content_id, principal_id = %caller.id, "content retrieved");
        Ok(plaintext)
    }

    /// Recover the raw content key through the owner's self-grant.
    ///
    /// Only the content's owner may call this. The read is gated and audited
    /// like any other.
    pub async fn recover_content_key(
        &self,
        content_id: &ContentId,
        owner: &Principal,
        owner_secret: &PrincipalSecret,
    ) -> Result<ContentKey> {
        let grant = self.gate().authorize(content_id, owner).await?;
        let content = self.registry.content(content_id).await?;
        if content.owner != owner.id {
            return Err(KernelError::NotAuthorized(format!(
                "{} does not own {}",
                owner.id, content_id
            )));
        }
        Ok(KeyWrapper::unwrap_bytes(&grant.wrapped_key, owner_secret)?)
    }

    /// Every grant on a content object with its current state.
    ///
    /// Visible to the content's owner and to admins.
    pub async fn grants(&self, content_id: &ContentId, caller: &Principal) -> Result<Vec<GrantStatus>> {
        let content = self.registry.content(content_id).await?;
        let allowed = match caller.role {
            Role::Admin => true,
            Role::Owner | Role::Keyholder => caller.id == content.owner,
            Role::Anonymous => false,
        };
        if !allowed {
            return Err(KernelError::NotAuthorized(format!(
                "{} may not list grants on {}",
                caller.id, content_id
            )));
        }
        self.registry.grants(content_id).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Audit Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Audit entries in append order, optionally for one content object.
    pub async fn audit_trail(&self, content_id: Option<&ContentId>) -> Result<Vec<AuditEntry>> {
        self.audit.query(content_id).await
    }

    /// Verify the full audit ledger. Returns the number of entries checked.
    pub async fn verify_audit_trail(&self) -> Result<usize> {
        self.audit.verify().await
    }
}
