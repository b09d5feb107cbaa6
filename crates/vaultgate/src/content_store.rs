//! The external content-addressed blob store.
//!
//! Only ciphertext ever crosses this boundary. The store assigns the
//! content id; the kernel treats it as opaque.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use vaultgate_core::ContentId;

/// Errors reported by a content store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentStoreError {
    /// Timeout, connection reset, 5xx and the like. Worth retrying.
    #[error("transient: {0}")]
    Transient(String),

    /// No blob under this id.
    #[error("blob not found: {0}")]
    NotFound(ContentId),

    /// Anything retrying will not fix.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl ContentStoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ContentStoreError::Transient(_))
    }
}

/// A content-addressed blob store (IPFS, S3 with hashed keys, ...).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a blob and return the id the store assigned to it.
    async fn put(&self, data: Bytes) -> Result<ContentId, ContentStoreError>;

    /// Fetch a blob by id.
    async fn get(&self, id: &ContentId) -> Result<Bytes, ContentStoreError>;
}

/// In-memory content store keyed by `b3-<hex blake3(bytes)>`.
#[derive(Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<ContentId, Bytes>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id this store assigns to `data`.
    pub fn id_for(data: &[u8]) -> ContentId {
        ContentId::new(format!("b3-{}", blake3::hash(data).to_hex()))
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite a stored blob in place, bypassing content addressing.
    ///
    /// Simulates a misbehaving store for integrity tests.
    pub fn corrupt(&self, id: &ContentId, data: Bytes) -> Result<(), ContentStoreError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| ContentStoreError::Fatal(e.to_string()))?;
        match blobs.get_mut(id) {
            Some(slot) => {
                *slot = data;
                Ok(())
            }
            None => Err(ContentStoreError::NotFound(id.clone())),
        }
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, data: Bytes) -> Result<ContentId, ContentStoreError> {
        let id = Self::id_for(&data);
        self.blobs
            .write()
            .map_err(|e| ContentStoreError::Fatal(e.to_string()))?
            .insert(id.clone(), data);
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<Bytes, ContentStoreError> {
        self.blobs
            .read()
            .map_err(|e| ContentStoreError::Fatal(e.to_string()))?
            .get(id)
            .cloned()
            .ok_or_else(|| ContentStoreError::NotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_is_content_addressed() {
        let store = MemoryContentStore::new();
        let a = store.put(Bytes::from_static(b"ciphertext")).await.unwrap();
        let b = store.put(Bytes::from_static(b"ciphertext")).await.unwrap();
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("b3-"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryContentStore::new();
        let err = store.get(&"b3-nope".into()).await.unwrap_err();
        assert_eq!(err, ContentStoreError::NotFound("b3-nope".into()));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_corrupt_replaces_blob() {
        let store = MemoryContentStore::new();
        let id = store.put(Bytes::from_static(b"good")).await.unwrap();
        store.corrupt(&id, Bytes::from_static(b"evil")).unwrap();
        assert_eq!(store.get(&id).await.unwrap(), Bytes::from_static(b"evil"));
    }
}
