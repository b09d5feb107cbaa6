//! # Vaultgate Core
//!
//! Data model for Vaultgate: identifiers, roles, grant records, and the
//! signed audit ledger.
//!
//! This crate contains no I/O and no key-wrapping cryptography. It is pure
//! computation over the records the rest of the workspace persists.
//!
//! ## Key Types
//!
//! - [`ContentObject`] - Metadata for one encrypted blob in the content store
//! - [`AccessGrant`] - A principal's wrapped copy of a content key, with expiry
//! - [`Role`] - Closed set of caller roles checked at every authorization point
//! - [`AuditEntry`] - One signed, hash-linked ledger entry
//!
//! ## Audit Ledger
//!
//! Entry headers are encoded as deterministic CBOR (see [`canonical`]), signed
//! with Ed25519 and linked by Blake3. [`verify_audit_chain`] checks an export.

pub mod audit;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod records;
pub mod role;
pub mod time;
pub mod types;
pub mod validation;

pub use audit::{AuditAction, AuditDraft, AuditEntry, AuditHeader};
pub use canonical::canonical_header_bytes;
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, SigningKeypair};
pub use error::{AuditChainError, CoreError};
pub use records::{expiry_from_ttl, AccessGrant, ContentObject, GrantState, MINUTE_MS};
pub use role::Role;
pub use time::{Clock, ManualClock, SystemClock};
pub use types::{AuthTag, ContentId, GrantId, Iv, PrincipalId, IV_LEN, TAG_LEN};
pub use validation::{verify_audit_chain, verify_entry};
