//! Error types for the Kernel.

use thiserror::Error;

use vaultgate_core::{AuditChainError, ContentId};
use vaultgate_perms::PermsError;
use vaultgate_store::StoreError;

/// Errors that can occur during Kernel operations.
///
/// Cryptographic failures ([`Integrity`](Self::Integrity),
/// [`Wrap`](Self::Wrap)) and policy failures
/// ([`AccessDenied`](Self::AccessDenied), [`NotAuthorized`](Self::NotAuthorized))
/// are separate variants so callers can tell them apart.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Ciphertext, tag or plaintext hash failed verification.
    #[error("content failed integrity check")]
    Integrity,

    /// The caller's key could not open the wrapped content key.
    #[error("key unwrap failed: {0}")]
    Wrap(String),

    /// No valid grant for this caller.
    #[error("access denied")]
    AccessDenied,

    /// Content id is already registered.
    #[error("content already registered: {0}")]
    DuplicateContent(ContentId),

    /// Content id is not registered.
    #[error("content not found: {0}")]
    ContentNotFound(ContentId),

    /// Content store failed permanently or the retry budget ran out.
    ///
    /// Transient failures never surface on their own; they are retried
    /// until they succeed or end up here.
    #[error("content store failed after {attempts} attempt(s): {reason}")]
    StorageFatal { attempts: u32, reason: String },

    /// The audit ledger could not be written.
    #[error("audit log unavailable: {0}")]
    AuditUnavailable(String),

    /// Caller's role does not allow this operation.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Grant parameters were rejected.
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// Encryption or encoding failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Exported audit ledger failed verification.
    #[error("audit chain invalid: {0}")]
    AuditChain(#[from] AuditChainError),

    /// Record store error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<PermsError> for KernelError {
    fn from(e: PermsError) -> Self {
        match e {
            PermsError::Integrity => KernelError::Integrity,
            PermsError::Wrap(msg) => KernelError::Wrap(msg),
            PermsError::Encryption(msg) | PermsError::Serialization(msg) => {
                KernelError::Encryption(msg)
            }
        }
    }
}

/// Result type for Kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
