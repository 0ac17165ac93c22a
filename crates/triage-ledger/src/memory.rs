//! In-process ledger backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use triage_core::{sha256_digest, CanonicalBytes, ContentDigest, DigestAlgorithm};

use crate::address::ContentAddress;
use crate::client::LedgerClient;
use crate::error::LedgerError;

/// Content-addressed map held in memory.
///
/// JSON documents are addressed by the SHA-256 of their canonical bytes;
/// raw blobs by the SHA-256 of the bytes as given. Every successful `put`
/// counts as a write, even when the content already existed.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    objects: Mutex<HashMap<ContentAddress, Vec<u8>>>,
    writes: AtomicUsize,
    failures: Mutex<Vec<LedgerError>>,
}

impl InMemoryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `errors.len()` puts fail, in order.
    pub fn inject_failures(&self, errors: impl IntoIterator<Item = LedgerError>) {
        let mut queued: Vec<LedgerError> = errors.into_iter().collect();
        queued.reverse();
        let mut failures = self.failures.lock();
        queued.extend(failures.drain(..));
        *failures = queued;
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stored bytes for an address.
    pub fn get(&self, address: &ContentAddress) -> Option<Vec<u8>> {
        self.objects.lock().get(address).cloned()
    }

    /// Number of distinct stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    fn take_failure(&self) -> Result<(), LedgerError> {
        match self.failures.lock().pop() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn store(&self, address: ContentAddress, bytes: Vec<u8>) -> ContentAddress {
        self.objects.lock().entry(address.clone()).or_insert(bytes);
        self.writes.fetch_add(1, Ordering::SeqCst);
        address
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, bytes: Vec<u8>) -> Result<ContentAddress, LedgerError> {
        self.take_failure()?;
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(&bytes));
        let address =
            ContentAddress::from_digest(&ContentDigest::new(DigestAlgorithm::Sha256, digest));
        Ok(self.store(address, bytes))
    }

    async fn put_json(&self, value: &serde_json::Value) -> Result<ContentAddress, LedgerError> {
        self.take_failure()?;
        let canonical =
            CanonicalBytes::new(value).map_err(|e| LedgerError::InvalidPayload(e.to_string()))?;
        let address = ContentAddress::from_digest(&sha256_digest(&canonical));
        Ok(self.store(address, canonical.into_bytes()))
    }
}
