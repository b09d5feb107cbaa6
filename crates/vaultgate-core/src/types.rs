//! Strong type definitions for Vaultgate.
//!
//! Identifiers and fixed-size cipher parameters are newtypes so a content id
//! can never be passed where a principal id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a stored ciphertext, assigned by the content-addressed store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap a store-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of a principal (owner, keyholder, admin).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Wrap a principal identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrincipalId({})", self.0)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A 32-byte grant identifier.
///
/// Derived from the grant's content, recipient, issue time and wrapped key,
/// so re-granting the same pair yields a new id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(pub [u8; 32]);

impl GrantId {
    /// Derive the id of a grant.
    pub fn derive(
        content_id: &ContentId,
        principal_id: &PrincipalId,
        issued_at: i64,
        wrapped_key: &[u8],
    ) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key("vaultgate-grant-id-v1");
        hasher.update(&(content_id.as_str().len() as u64).to_be_bytes());
        hasher.update(content_id.as_str().as_bytes());
        hasher.update(&(principal_id.as_str().len() as u64).to_be_bytes());
        hasher.update(principal_id.as_str().as_bytes());
        hasher.update(&issued_at.to_be_bytes());
        hasher.update(wrapped_key);
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GrantId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl TryFrom<&[u8]> for GrantId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// Length of the AEAD nonce (initialization vector) in bytes.
pub const IV_LEN: usize = 12;

/// Length of the AEAD authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// A 96-bit initialization vector, unique per encryption under a key.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iv(pub [u8; IV_LEN]);

impl Iv {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; IV_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }
}

impl fmt::Debug for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Iv({})", hex::encode(self.0))
    }
}

impl TryFrom<&[u8]> for Iv {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(slice.try_into()?))
    }
}

/// A 128-bit AEAD authentication tag, stored apart from the ciphertext.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTag(pub [u8; TAG_LEN]);

impl AuthTag {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; TAG_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }
}

impl fmt::Debug for AuthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthTag({})", hex::encode(self.0))
    }
}

impl TryFrom<&[u8]> for AuthTag {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(slice.try_into()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_id_hex_roundtrip() {
        let id = GrantId::from_bytes([0x42; 32]);
        let recovered = GrantId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_grant_id_changes_with_issue_time() {
        let cid = ContentId::new("b3-abc");
        let pid = PrincipalId::new("bob");
        let a = GrantId::derive(&cid, &pid, 1000, b"wrapped");
        let b = GrantId::derive(&cid, &pid, 1001, b"wrapped");
        assert_ne!(a, b);
    }

    #[test]
    fn test_grant_id_is_length_prefixed() {
        // ("ab", "c") and ("a", "bc") must not collide
        let a = GrantId::derive(&"ab".into(), &"c".into(), 0, b"");
        let b = GrantId::derive(&"a".into(), &"bc".into(), 0, b"");
        assert_ne!(a, b);
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let cid = ContentId::new("b3-0011");
        assert_eq!(serde_json::to_string(&cid).unwrap(), "\"b3-0011\"");
    }

    #[test]
    fn test_iv_rejects_wrong_length() {
        assert!(Iv::try_from(&[0u8; 11][..]).is_err());
        assert!(Iv::try_from(&[0u8; 12][..]).is_ok());
    }
}
