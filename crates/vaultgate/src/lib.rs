//! # Vaultgate
//!
//! Envelope encryption and access control for stored content, with a
//! signed audit trail.
//!
//! ## Overview
//!
//! Vaultgate keeps content confidential in an untrusted content store:
//!
//! - **Upload**: content is encrypted under a fresh per-object key; only the
//!   ciphertext leaves the kernel
//! - **Share**: the content key is wrapped to a recipient's X25519 public key
//!   and recorded as a grant, optionally with a TTL
//! - **Revoke**: a grant is marked revoked; revocation is idempotent
//! - **Retrieve**: the access gate checks for a valid grant, the caller's
//!   secret unwraps the key, and the plaintext is decrypted and checked
//! - **Audit**: every grant, revoke and access decision is appended to a
//!   hash-linked, Ed25519-signed ledger
//!
//! ## Key Concepts
//!
//! - **Grant**: at most one per (content, principal); re-granting replaces it.
//! - **Expiry**: a grant with `expires_at = T` is valid strictly before `T`.
//! - **Fail closed**: if a decision cannot be audited, access is refused.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultgate::{Kernel, MemoryContentStore};
//! use vaultgate::core::{Role, SigningKeypair};
//! use vaultgate::perms::{KeyPairIssuer, Principal};
//! use vaultgate::store::SqliteStore;
//!
//! async fn example() -> vaultgate::Result<()> {
//!     let store = SqliteStore::open("vaultgate.db")?;
//!     let kernel = Kernel::builder(
//!         SigningKeypair::generate(),
//!         store,
//!         Arc::new(MemoryContentStore::new()),
//!     )
//!     .build();
//!
//!     let alice_keys = KeyPairIssuer::generate_key_pair();
//!     let alice = Principal::new("alice", Role::Owner, alice_keys.public);
//!     let bob_keys = KeyPairIssuer::generate_key_pair();
//!     let bob = Principal::new("bob", Role::Keyholder, bob_keys.public);
//!
//!     let upload = kernel.upload(&alice, b"quarterly report".to_vec()).await?;
//!     kernel
//!         .share(&upload.content_id, &upload.content_key, &bob, Some(60))
//!         .await?;
//!
//!     let plaintext = kernel
//!         .retrieve(&upload.content_id, &bob, &bob_keys.secret)
//!         .await?;
//!     assert_eq!(&plaintext[..], b"quarterly report");
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `vaultgate::core` - Identifiers, records, audit entries, clocks
//! - `vaultgate::perms` - Content cipher, key issuance and wrapping
//! - `vaultgate::store` - Record storage abstraction and SQLite

pub mod audit;
pub mod content_store;
pub mod error;
pub mod gate;
pub mod kernel;
pub mod notify;
pub mod registry;
pub mod retry;
pub mod share;

// Re-export component crates
pub use vaultgate_core as core;
pub use vaultgate_perms as perms;
pub use vaultgate_store as store;

// Re-export main types for convenience
pub use audit::AuditLog;
pub use content_store::{ContentStore, ContentStoreError, MemoryContentStore};
pub use error::{KernelError, Result};
pub use gate::AccessGate;
pub use kernel::{Kernel, KernelBuilder, KernelConfig, UploadReceipt};
pub use notify::{spawn_dispatcher, Notification, NotificationQueue, Notifier};
pub use registry::{AccessRegistry, GrantStatus, PairGuard};
pub use retry::{Backoff, RetryPolicy};
pub use share::ShareCoordinator;

// Re-export commonly used types
pub use vaultgate_core::{
    AccessGrant, AuditAction, AuditEntry, ContentId, GrantId, GrantState, PrincipalId, Role,
};
pub use vaultgate_perms::{ContentKey, Principal, PrincipalSecret};
pub use vaultgate_store::RevokeOutcome;
