//! # Vaultgate Testkit
//!
//! Testing utilities for Vaultgate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a kernel on a manual clock with deterministic audit signing
//! - **Faults**: content and record stores that fail on demand
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use vaultgate::core::Role;
//! use vaultgate_testkit::{Party, TestFixture};
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let alice = Party::new("alice", Role::Owner);
//!     let upload = fixture.kernel.upload(&alice.principal, b"hello".to_vec()).await.unwrap();
//!     fixture.advance_minutes(10);
//! }
//! ```
//!
//! ## Fault Injection
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultgate_testkit::faults::FlakyContentStore;
//! use vaultgate_testkit::fixtures::{fast_config, TestFixture};
//! use vaultgate::store::MemoryStore;
//!
//! // The first two puts time out, the third succeeds.
//! let fixture = TestFixture::build(
//!     MemoryStore::new(),
//!     Arc::new(FlakyContentStore::new(2, 0)),
//!     fast_config(),
//!     None,
//! );
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use vaultgate_testkit::generators::{content_key, plaintext};
//!
//! proptest! {
//!     #[test]
//!     fn roundtrip(key in content_key(), data in plaintext(1024)) {
//!         // ...
//!     }
//! }
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;

pub use faults::{AuditFault, FlakyContentStore, GrantFaultStore, UnavailableAuditStore};
pub use fixtures::{fast_config, multi_party, Party, RecordingNotifier, TestFixture};
pub use generators::{grant_ops, GrantOp};
