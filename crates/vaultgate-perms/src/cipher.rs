//! Symmetric content encryption.
//!
//! Each content object is sealed once under its own random 256-bit key with
//! ChaCha20-Poly1305. The 16-byte tag is kept detached so it can be stored
//! in the metadata record next to the IV, apart from the ciphertext blob.

use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce, Tag};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use vaultgate_core::{AuthTag, Iv, IV_LEN};

use crate::error::{PermsError, Result};

/// Length of a content key in bytes.
pub const CONTENT_KEY_LEN: usize = 32;

/// A 256-bit symmetric content key. Erased on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; CONTENT_KEY_LEN]);

impl ContentKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; CONTENT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(<redacted>)")
    }
}

impl TryFrom<&[u8]> for ContentKey {
    type Error = PermsError;

    fn try_from(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; CONTENT_KEY_LEN] = slice.try_into().map_err(|_| {
            PermsError::Wrap(format!(
                "invalid key length: expected {CONTENT_KEY_LEN}, got {}",
                slice.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

/// Output of [`ContentCipher::encrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedContent {
    pub ciphertext: Vec<u8>,
    pub iv: Iv,
    pub tag: AuthTag,
}

/// Stateless AEAD over content blobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentCipher;

impl ContentCipher {
    /// Generate a fresh content key from the thread-local CSPRNG.
    pub fn generate_key() -> ContentKey {
        let mut bytes = Zeroizing::new([0u8; CONTENT_KEY_LEN]);
        rand::thread_rng().fill_bytes(&mut *bytes);
        ContentKey(*bytes)
    }

    /// Encrypt `plaintext` in place under a fresh random IV.
    ///
    /// Takes ownership of the plaintext buffer. If sealing fails the buffer
    /// is erased before the error is returned.
    pub fn encrypt(plaintext: Vec<u8>, key: &ContentKey) -> Result<SealedContent> {
        let mut buffer = Zeroizing::new(plaintext);

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", buffer.as_mut_slice())
            .map_err(|e| PermsError::Encryption(e.to_string()))?;

        // the buffer now holds ciphertext; move it out so only the empty
        // shell is zeroized
        let ciphertext = std::mem::take(&mut *buffer);
        let mut tag_bytes = [0u8; 16];
        tag_bytes.copy_from_slice(tag.as_slice());

        Ok(SealedContent {
            ciphertext,
            iv: Iv::from_bytes(iv),
            tag: AuthTag::from_bytes(tag_bytes),
        })
    }

    /// Decrypt and authenticate.
    ///
    /// Returns [`PermsError::Integrity`] if the tag does not verify. No
    /// plaintext is ever returned for a tampered input.
    pub fn decrypt(
        ciphertext: &[u8],
        key: &ContentKey,
        iv: &Iv,
        tag: &AuthTag,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mut buffer = Zeroizing::new(ciphertext.to_vec());

        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(iv.as_bytes()),
                b"",
                buffer.as_mut_slice(),
                Tag::from_slice(tag.as_bytes()),
            )
            .map_err(|_| PermsError::Integrity)?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = ContentCipher::generate_key();
        let sealed = ContentCipher::encrypt(b"hello, vault".to_vec(), &key).unwrap();
        assert_ne!(sealed.ciphertext, b"hello, vault");

        let plain = ContentCipher::decrypt(&sealed.ciphertext, &key, &sealed.iv, &sealed.tag).unwrap();
        assert_eq!(plain.as_slice(), b"hello, vault");
    }

    #[test]
    fn test_empty_plaintext() {
        let key = ContentCipher::generate_key();
        let sealed = ContentCipher::encrypt(Vec::new(), &key).unwrap();
        assert!(sealed.ciphertext.is_empty());
        let plain = ContentCipher::decrypt(&sealed.ciphertext, &key, &sealed.iv, &sealed.tag).unwrap();
        assert!(plain.is_empty());
    }

    #[test]
    fn test_iv_differs_per_call() {
        let key = ContentCipher::generate_key();
        let a = ContentCipher::encrypt(b"same".to_vec(), &key).unwrap();
        let b = ContentCipher::encrypt(b"same".to_vec(), &key).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_is_integrity_error() {
        let key = ContentCipher::generate_key();
        let other = ContentCipher::generate_key();
        let sealed = ContentCipher::encrypt(b"secret".to_vec(), &key).unwrap();
        let err = ContentCipher::decrypt(&sealed.ciphertext, &other, &sealed.iv, &sealed.tag).unwrap_err();
        assert!(matches!(err, PermsError::Integrity));
    }

    #[test]
    fn test_wrong_iv_is_integrity_error() {
        let key = ContentCipher::generate_key();
        let sealed = ContentCipher::encrypt(b"secret".to_vec(), &key).unwrap();
        let mut iv = *sealed.iv.as_bytes();
        iv[0] ^= 1;
        let err = ContentCipher::decrypt(&sealed.ciphertext, &key, &Iv::from_bytes(iv), &sealed.tag).unwrap_err();
        assert!(matches!(err, PermsError::Integrity));
    }

    #[test]
    fn test_key_debug_is_redacted() {
        let key = ContentKey::from_bytes([0xab; 32]);
        assert_eq!(format!("{key:?}"), "ContentKey(<redacted>)");
    }

    proptest! {
        #[test]
        fn prop_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let key = ContentCipher::generate_key();
            let sealed = ContentCipher::encrypt(data.clone(), &key).unwrap();
            let plain = ContentCipher::decrypt(&sealed.ciphertext, &key, &sealed.iv, &sealed.tag).unwrap();
            prop_assert_eq!(plain.as_slice(), data.as_slice());
        }

        #[test]
        fn prop_any_flipped_bit_is_detected(
            data in proptest::collection::vec(any::<u8>(), 1..512),
            pos in any::<prop::sample::Index>(),
            bit in 0u8..8,
            in_tag in any::<bool>(),
        ) {
            let key = ContentCipher::generate_key();
            let mut sealed = ContentCipher::encrypt(data, &key).unwrap();
            if in_tag {
                let i = pos.index(16);
                sealed.tag.0[i] ^= 1 << bit;
            } else {
                let i = pos.index(sealed.ciphertext.len());
                sealed.ciphertext[i] ^= 1 << bit;
            }
            let result = ContentCipher::decrypt(&sealed.ciphertext, &key, &sealed.iv, &sealed.tag);
            prop_assert!(matches!(result, Err(PermsError::Integrity)));
        }
    }
}
