//! Error types for the permissions crate.

use thiserror::Error;

/// Errors from content encryption and key wrapping.
///
/// [`PermsError::Integrity`] and [`PermsError::Wrap`] stay distinct all the
/// way to the boundary so callers can tell a tampered blob from a key that
/// does not open.
#[derive(Debug, Error)]
pub enum PermsError {
    /// Ciphertext or tag failed authentication.
    #[error("content failed integrity check")]
    Integrity,

    /// A wrapped key could not be opened or produced.
    #[error("key wrap error: {0}")]
    Wrap(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for permissions operations.
pub type Result<T> = std::result::Result<T, PermsError>;
