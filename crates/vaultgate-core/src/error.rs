//! Error types for Vaultgate core.

use thiserror::Error;

/// Errors from audit action decoding and signature checks.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("unknown audit action code: {0}")]
    UnknownAction(u16),
}

/// Ways an exported audit ledger can fail verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditChainError {
    #[error("ledger does not start at seq 1 (first seq is {0})")]
    BadStart(u64),

    #[error("sequence gap: expected {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },

    #[error("prev_hash link broken at seq {seq}")]
    BrokenLink { seq: u64 },

    #[error("timestamp went backwards at seq {seq}")]
    TimestampRegressed { seq: u64 },

    #[error("signature verification failed at seq {seq}")]
    SignatureFailed { seq: u64 },
}
