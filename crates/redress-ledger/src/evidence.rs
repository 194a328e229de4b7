//! EvidenceStore - content-addressed blob storage
//!
//! Evidence is stored before any ledger interaction; a failure here aborts
//! the whole write. The ledger only ever sees the content address.

use async_trait::async_trait;
use dashmap::DashMap;
use redress_common::{ContentAddress, RedressError, EVIDENCE_MAX_BYTES};
use thiserror::Error;

/// Errors from evidence store operations
#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("Evidence exceeds {limit} byte limit: got {actual}")]
    TooLarge { actual: usize, limit: usize },

    #[error("Evidence store unavailable: {0}")]
    Unavailable(String),
}

impl From<EvidenceError> for RedressError {
    fn from(err: EvidenceError) -> Self {
        RedressError::Evidence(err.to_string())
    }
}

/// Content-addressed storage for evidence attachments
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Store a blob and return its content address
    async fn store(&self, bytes: &[u8]) -> Result<ContentAddress, EvidenceError>;

    /// Fetch a blob by content address
    async fn fetch(&self, addr: &ContentAddress) -> Result<Option<Vec<u8>>, EvidenceError>;
}

/// In-memory evidence store, blake3 content addressing
pub struct MemoryEvidenceStore {
    blobs: DashMap<String, Vec<u8>>,
    max_bytes: usize,
}

impl MemoryEvidenceStore {
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
            max_bytes: EVIDENCE_MAX_BYTES,
        }
    }

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            blobs: DashMap::new(),
            max_bytes,
        }
    }

    fn address(bytes: &[u8]) -> ContentAddress {
        ContentAddress::new(format!("b3:{}", blake3::hash(bytes).to_hex()))
    }
}

impl Default for MemoryEvidenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EvidenceStore for MemoryEvidenceStore {
    async fn store(&self, bytes: &[u8]) -> Result<ContentAddress, EvidenceError> {
        if bytes.len() > self.max_bytes {
            return Err(EvidenceError::TooLarge {
                actual: bytes.len(),
                limit: self.max_bytes,
            });
        }
        let addr = Self::address(bytes);
        self.blobs.insert(addr.0.clone(), bytes.to_vec());
        Ok(addr)
    }

    async fn fetch(&self, addr: &ContentAddress) -> Result<Option<Vec<u8>>, EvidenceError> {
        Ok(self.blobs.get(addr.as_str()).map(|b| b.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_fetch() {
        let store = MemoryEvidenceStore::new();
        let addr = store.store(b"leaky pipe photo").await.unwrap();
        assert!(addr.as_str().starts_with("b3:"));

        let fetched = store.fetch(&addr).await.unwrap();
        assert_eq!(fetched.as_deref(), Some(b"leaky pipe photo".as_ref()));
    }

    #[tokio::test]
    async fn test_addressing_is_deterministic() {
        let store = MemoryEvidenceStore::new();
        let a = store.store(b"same bytes").await.unwrap();
        let b = store.store(b"same bytes").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_size_limit() {
        let store = MemoryEvidenceStore::with_max_bytes(8);
        let err = store.store(b"way past the limit").await.unwrap_err();
        assert!(matches!(err, EvidenceError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_fetch_unknown_is_none() {
        let store = MemoryEvidenceStore::new();
        let missing = store
            .fetch(&ContentAddress::new("b3:ffff"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
