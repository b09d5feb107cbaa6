//! The access gate: every read goes through [`AccessGate::authorize`].

use vaultgate_core::{AccessGrant, AuditAction, AuditDraft, ContentId, Role};
use vaultgate_perms::Principal;
use vaultgate_store::RecordStore;

use crate::audit::AuditLog;
use crate::error::{KernelError, Result};
use crate::registry::AccessRegistry;

/// Decides whether a principal may read a content object and records the
/// decision.
///
/// Denials are audited before the error is returned. If the audit append
/// fails the gate fails closed with [`KernelError::AuditUnavailable`].
pub struct AccessGate<'a, S: RecordStore> {
    registry: &'a AccessRegistry<S>,
    audit: &'a AuditLog<S>,
}

impl<'a, S: RecordStore> AccessGate<'a, S> {
    pub fn new(registry: &'a AccessRegistry<S>, audit: &'a AuditLog<S>) -> Self {
        Self { registry, audit }
    }

    /// Return the caller's valid grant, or [`KernelError::AccessDenied`].
    ///
    /// The decision and its audit entry are made under the pair lock, so a
    /// concurrent revoke is recorded either before or after this read.
    pub async fn authorize(&self, content_id: &ContentId, caller: &Principal) -> Result<AccessGrant> {
        let (grant, _pair) = match caller.role {
            Role::Anonymous => (None, None),
            Role::Owner | Role::Keyholder | Role::Admin => {
                let pair = self.registry.lock_pair(content_id, &caller.id).await;
                (self.registry.lookup(content_id, &caller.id).await?, Some(pair))
            }
        };

        match grant {
            Some(grant) => {
                self.audit
                    .append(
                        AuditDraft::new(AuditAction::AccessOk, content_id.clone())
                            .principal(caller.id.clone())
                            .meta("grant_id", grant.grant_id.to_hex()),
                    )
                    .await?;
                Ok(grant)
            }
            None => {
                let reason = if caller.is_anonymous() { "anonymous" } else { "no_valid_grant" };
                let mut draft =
                    AuditDraft::new(AuditAction::AccessDenied, content_id.clone()).meta("reason", reason);
                if !caller.is_anonymous() {
                    draft = draft.principal(caller.id.clone());
                }
                self.audit.append(draft).await?;

                tracing::info!(
                    content_id = %content_id,
                    principal_id = %caller.id,
                    role = %caller.role,
                    reason,
                    "access denied"
                );
                Err(KernelError::AccessDenied)
            }
        }
    }
}
