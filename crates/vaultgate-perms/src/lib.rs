//! # Vaultgate Permissions
//!
//! Envelope encryption primitives.
//!
//! ## Overview
//!
//! Content is encrypted once under a random content key. The content key is
//! then wrapped separately for each principal allowed to read it, so sharing
//! and revoking never touch the ciphertext.
//!
//! ## Key Concepts
//!
//! - **ContentCipher**: ChaCha20-Poly1305 with a detached tag over the blob
//! - **KeyPairIssuer**: X25519 keypairs for principals; secrets go to the caller
//! - **KeyWrapper**: ephemeral-static X25519 wrapping of a content key
//! - **Principal**: identity, role and public key of a caller or recipient
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vaultgate_perms::{ContentCipher, KeyPairIssuer, KeyWrapper};
//!
//! let bob = KeyPairIssuer::generate_key_pair();
//! let key = ContentCipher::generate_key();
//! let sealed = ContentCipher::encrypt(b"report".to_vec(), &key).unwrap();
//!
//! let wrapped = KeyWrapper::wrap(&key, &bob.public).unwrap();
//! let opened = KeyWrapper::unwrap(&wrapped, &bob.secret).unwrap();
//! let plain = ContentCipher::decrypt(&sealed.ciphertext, &opened, &sealed.iv, &sealed.tag).unwrap();
//! assert_eq!(plain.as_slice(), b"report");
//! ```

pub mod cipher;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod principal;
pub mod wrap;

pub use cipher::{ContentCipher, ContentKey, SealedContent, CONTENT_KEY_LEN};
pub use crypto::{PrincipalSecret, X25519PublicKey};
pub use error::{PermsError, Result};
pub use keys::{IssuedKeyPair, KeyPairIssuer};
pub use principal::Principal;
pub use wrap::{KeyWrapper, WrappedKey};
