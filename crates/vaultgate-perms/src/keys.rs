//! Principal key issuance.

use rand::RngCore;
use zeroize::Zeroizing;

use crate::crypto::{PrincipalSecret, X25519PublicKey};

/// A freshly generated principal keypair.
///
/// The secret moves to the caller; the issuer keeps no copy.
#[derive(Debug)]
pub struct IssuedKeyPair {
    pub public: X25519PublicKey,
    pub secret: PrincipalSecret,
}

/// Stateless generator of principal keypairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyPairIssuer;

impl KeyPairIssuer {
    /// Generate an X25519 keypair.
    pub fn generate_key_pair() -> IssuedKeyPair {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut *seed);
        let secret = PrincipalSecret::from_bytes(*seed);
        IssuedKeyPair {
            public: secret.public_key(),
            secret,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_matches_secret() {
        let pair = KeyPairIssuer::generate_key_pair();
        assert_eq!(pair.public, pair.secret.public_key());
    }

    #[test]
    fn test_pairs_are_distinct() {
        let a = KeyPairIssuer::generate_key_pair();
        let b = KeyPairIssuer::generate_key_pair();
        assert_ne!(a.public, b.public);
    }
}
