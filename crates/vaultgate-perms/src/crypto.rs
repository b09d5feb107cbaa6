//! X25519 key material for principals.

use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// An X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub(crate) fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

impl fmt::Debug for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519Pub({})", &hex::encode(self.0)[..16])
    }
}

/// A principal's X25519 private key.
///
/// Owned by the principal alone. Nothing in this workspace persists it; the
/// kernel only borrows it for the duration of an unwrap. Erased on drop.
pub struct PrincipalSecret(StaticSecret);

impl PrincipalSecret {
    /// Rebuild from the 32 secret bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        let bytes = Zeroizing::new(bytes);
        Self(StaticSecret::from(*bytes))
    }

    /// Export the secret bytes, e.g. for the principal's own key storage.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.to_bytes())
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(PublicKey::from(&self.0))
    }

    pub(crate) fn diffie_hellman(&self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.0.diffie_hellman(&peer_public.to_dalek());
        SharedKey {
            bytes: *shared.as_bytes(),
            contributory: shared.was_contributory(),
        }
    }
}

impl fmt::Debug for PrincipalSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrincipalSecret(<redacted>, {:?})", self.public_key())
    }
}

/// Output of one X25519 agreement.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct SharedKey {
    bytes: [u8; 32],
    #[zeroize(skip)]
    contributory: bool,
}

impl SharedKey {
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// False when the peer key was a low-order point and the output is
    /// predictable.
    pub(crate) fn was_contributory(&self) -> bool {
        self.contributory
    }
}

/// Single-use sender key for ephemeral-static agreement.
pub(crate) struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    pub(crate) fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    pub(crate) fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Consumes the secret; it can only be used once.
    pub(crate) fn diffie_hellman(self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.secret.diffie_hellman(&peer_public.to_dalek());
        SharedKey {
            bytes: *shared.as_bytes(),
            contributory: shared.was_contributory(),
        }
    }
}
