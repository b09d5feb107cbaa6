//! Share and revoke, each paired with its audit entry.

use vaultgate_core::{AccessGrant, AuditAction, AuditDraft, ContentId, PrincipalId};
use vaultgate_perms::{ContentKey, KeyWrapper, Principal};
use vaultgate_store::{RecordStore, RevokeOutcome};

use crate::audit::AuditLog;
use crate::error::{KernelError, Result};
use crate::notify::{Notification, NotificationQueue};
use crate::registry::AccessRegistry;

/// Coordinates registry writes with the audit ledger.
///
/// The registry write always happens first. If it fails nothing is audited;
/// if the audit append fails afterwards the registry change stands and the
/// caller gets [`KernelError::AuditUnavailable`]. Both steps run under the
/// pair lock, so concurrent calls on one pair reach the ledger in commit
/// order.
pub struct ShareCoordinator<'a, S: RecordStore> {
    registry: &'a AccessRegistry<S>,
    audit: &'a AuditLog<S>,
    notifications: Option<&'a NotificationQueue>,
}

impl<'a, S: RecordStore> ShareCoordinator<'a, S> {
    pub fn new(
        registry: &'a AccessRegistry<S>,
        audit: &'a AuditLog<S>,
        notifications: Option<&'a NotificationQueue>,
    ) -> Self {
        Self {
            registry,
            audit,
            notifications,
        }
    }

    /// Wrap `content_key` for `recipient` and record the grant.
    pub async fn share_content(
        &self,
        content_id: &ContentId,
        content_key: &ContentKey,
        recipient: &Principal,
        ttl_minutes: Option<u32>,
    ) -> Result<AccessGrant> {
        if !recipient.role.can_hold_grant() {
            return Err(KernelError::NotAuthorized(format!(
                "{} principals cannot receive grants",
                recipient.role
            )));
        }
        let public_key = recipient.public_key.as_ref().ok_or_else(|| {
            KernelError::InvalidGrant(format!("{} has no public key", recipient.id))
        })?;

        let wrapped = KeyWrapper::wrap(content_key, public_key)?.to_bytes()?;
        let _pair = self.registry.lock_pair(content_id, &recipient.id).await;
        let grant = self
            .registry
            .grant(content_id, &recipient.id, wrapped, ttl_minutes)
            .await?;

        let expires = grant
            .expires_at
            .map_or_else(|| "permanent".to_string(), |t| t.to_string());
        let audited = self
            .audit
            .append(
                AuditDraft::new(AuditAction::Grant, content_id.clone())
                    .principal(recipient.id.clone())
                    .meta("grant_id", grant.grant_id.to_hex())
                    .meta("expires_at", expires),
            )
            .await;

        self.notify(Notification::GrantIssued {
            content_id: content_id.clone(),
            principal_id: recipient.id.clone(),
            grant_id: grant.grant_id,
            expires_at: grant.expires_at,
        });

        audited?;
        tracing::info!(
            content_id = %content_id,
            principal_id = %recipient.id,
            grant_id = %grant.grant_id,
            "content shared"
        );
        Ok(grant)
    }

    /// Revoke a principal's grant. Every call is audited, even a no-op.
    pub async fn revoke_access(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
    ) -> Result<RevokeOutcome> {
        let _pair = self.registry.lock_pair(content_id, principal_id).await;
        let outcome = self.registry.revoke(content_id, principal_id).await?;

        let effect = if outcome.changed() { "revoked" } else { "noop" };
        let audited = self
            .audit
            .append(
                AuditDraft::new(AuditAction::Revoke, content_id.clone())
                    .principal(principal_id.clone())
                    .meta("effect", effect)
                    .meta("outcome", outcome.as_str()),
            )
            .await;

        if outcome.changed() {
            self.notify(Notification::GrantRevoked {
                content_id: content_id.clone(),
                principal_id: principal_id.clone(),
            });
        }

        audited?;
        tracing::info!(
            content_id = %content_id,
            principal_id = %principal_id,
            outcome = outcome.as_str(),
            "access revoked"
        );
        Ok(outcome)
    }

    fn notify(&self, notification: Notification) {
        if let Some(queue) = self.notifications {
            queue.enqueue(notification);
        }
    }
}
