//! Per-recipient key wrapping.
//!
//! A content key is wrapped for a recipient with ephemeral-static X25519:
//! the sender generates a one-time keypair, agrees a shared secret with the
//! recipient's public key, derives a wrapping key with Blake3, and seals the
//! content key with ChaCha20-Poly1305. Only the holder of the recipient's
//! secret can reverse it.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::cipher::ContentKey;
use crate::crypto::{EphemeralKeyPair, PrincipalSecret, SharedKey, X25519PublicKey};
use crate::error::{PermsError, Result};

/// Blake3 context for deriving wrapping keys.
const WRAP_KDF_CONTEXT: &str = "vaultgate-perms-v1 key wrap";

/// A content key sealed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Sender's one-time public key.
    pub ephemeral_public: X25519PublicKey,
    pub nonce: [u8; 12],
    /// Encrypted content key with appended tag.
    pub ciphertext: Vec<u8>,
}

impl WrappedKey {
    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| PermsError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// Malformed input is a wrap failure: the grant cannot be opened.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| PermsError::Wrap(format!("malformed wrapped key: {e}")))
    }
}

/// Wraps and unwraps content keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyWrapper;

impl KeyWrapper {
    /// Wrap `content_key` so only `recipient` can recover it.
    ///
    /// Randomized: wrapping the same key twice gives different output.
    pub fn wrap(content_key: &ContentKey, recipient: &X25519PublicKey) -> Result<WrappedKey> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let shared = ephemeral.diffie_hellman(recipient);
        if !shared.was_contributory() {
            return Err(PermsError::Wrap("recipient public key is a low-order point".into()));
        }
        let wrap_key = derive_wrap_key(&shared, &ephemeral_public, recipient);

        let mut nonce = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = ChaCha20Poly1305::new(Key::from_slice(&wrap_key[..]))
            .encrypt(Nonce::from_slice(&nonce), content_key.as_bytes().as_slice())
            .map_err(|e| PermsError::Encryption(e.to_string()))?;

        Ok(WrappedKey {
            ephemeral_public,
            nonce,
            ciphertext,
        })
    }

    /// Recover the content key with the recipient's secret.
    ///
    /// Fails with [`PermsError::Wrap`] for a mismatched keypair, a forged
    /// ephemeral key, or a modified ciphertext.
    pub fn unwrap(wrapped: &WrappedKey, secret: &PrincipalSecret) -> Result<ContentKey> {
        let shared = secret.diffie_hellman(&wrapped.ephemeral_public);
        if !shared.was_contributory() {
            return Err(PermsError::Wrap("ephemeral public key is a low-order point".into()));
        }
        let wrap_key = derive_wrap_key(&shared, &wrapped.ephemeral_public, &secret.public_key());

        let key_bytes = Zeroizing::new(
            ChaCha20Poly1305::new(Key::from_slice(&wrap_key[..]))
                .decrypt(Nonce::from_slice(&wrapped.nonce), wrapped.ciphertext.as_slice())
                .map_err(|_| PermsError::Wrap("key unwrap failed".into()))?,
        );

        ContentKey::try_from(key_bytes.as_slice())
    }

    /// Convenience: parse CBOR bytes and unwrap.
    pub fn unwrap_bytes(wrapped: &[u8], secret: &PrincipalSecret) -> Result<ContentKey> {
        Self::unwrap(&WrappedKey::from_bytes(wrapped)?, secret)
    }
}

/// Derive the symmetric wrapping key, bound to both public keys.
fn derive_wrap_key(
    shared: &SharedKey,
    ephemeral_public: &X25519PublicKey,
    recipient_public: &X25519PublicKey,
) -> Zeroizing<[u8; 32]> {
    let mut hasher = blake3::Hasher::new_derive_key(WRAP_KDF_CONTEXT);
    hasher.update(shared.as_bytes());
    hasher.update(ephemeral_public.as_bytes());
    hasher.update(recipient_public.as_bytes());
    Zeroizing::new(*hasher.finalize().as_bytes())
}
