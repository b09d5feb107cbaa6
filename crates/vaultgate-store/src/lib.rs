//! # Vaultgate Store
//!
//! Storage abstraction for Vaultgate. Provides a trait-based interface for
//! content metadata, access grants and the audit ledger, with SQLite and
//! in-memory implementations.
//!
//! ## Key Types
//!
//! - [`RecordStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of registering content metadata
//! - [`RevokeOutcome`] - What a revoke call did
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vaultgate_store::{RecordStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("vault.db").unwrap();
//!     let trail = store.audit_entries(None).await.unwrap();
//!     println!("{} audit entries", trail.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Write-once content**: a second insert for an id returns `AlreadyExists`
//! - **Upsert grants**: one row per (content, principal); re-grant replaces it
//! - **Soft revoke**: revocation flips a flag and keeps the row
//! - **Append-only ledger**: audit seqs are contiguous and never reused

#[cfg(test)]
mod conformance;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, RecordStore, RevokeOutcome};
