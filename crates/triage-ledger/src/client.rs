//! The ledger collaborator contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::address::ContentAddress;
use crate::error::LedgerError;

/// Append-only, content-addressed store.
///
/// Writing identical content twice yields the same address for local
/// backends; remote backends may or may not dedupe.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Store raw bytes.
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentAddress, LedgerError>;

    /// Store a JSON document.
    async fn put_json(&self, value: &serde_json::Value) -> Result<ContentAddress, LedgerError>;
}

#[async_trait]
impl<L: LedgerClient + ?Sized> LedgerClient for Arc<L> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    async fn put(&self, bytes: Vec<u8>) -> Result<ContentAddress, LedgerError> {
        (**self).put(bytes).await
    }

    async fn put_json(&self, value: &serde_json::Value) -> Result<ContentAddress, LedgerError> {
        (**self).put_json(value).await
    }
}
