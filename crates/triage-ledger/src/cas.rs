//! # Filesystem Content-Addressed Store
//!
//! JSON payloads live at `{root}/payload/{hex}.json`, raw blobs at
//! `{root}/blob/{hex}.bin`. The filename is the SHA-256 of the content
//! (canonical bytes for JSON). Writes land through a temp file and a
//! rename. A read recomputes the digest before returning anything.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::io::AsyncWriteExt;
use triage_core::{sha256_hex, CanonicalBytes};

use crate::address::ContentAddress;
use crate::client::LedgerClient;
use crate::error::LedgerError;

const PAYLOAD_KIND: &str = "payload";
const BLOB_KIND: &str = "blob";

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Ledger backend rooted at a directory.
#[derive(Debug, Clone)]
pub struct CasStore {
    root: PathBuf,
}

impl CasStore {
    /// Store rooted at `root`; directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, kind: &str, hex: &str) -> PathBuf {
        let ext = if kind == BLOB_KIND { "bin" } else { "json" };
        self.root.join(kind).join(format!("{hex}.{ext}"))
    }

    /// Land `bytes` at the content path.
    ///
    /// Bytes go to a temp file in the same directory and are renamed into
    /// place, so the content path only ever holds a complete write. An
    /// existing file counts as written only if it holds exactly `bytes`;
    /// anything else is replaced.
    async fn write_once(&self, kind: &str, hex: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        tokio::fs::create_dir_all(self.root.join(kind)).await?;
        let path = self.path_for(kind, hex);

        match tokio::fs::read(&path).await {
            Ok(existing) if bool::from(existing.as_slice().ct_eq(bytes)) => return Ok(()),
            Ok(_) => {
                tracing::warn!(path = %path.display(), "replacing corrupt CAS entry");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let tmp = path.with_extension(format!(
            "tmp-{}-{}",
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let written = write_file(&tmp, bytes).await;
        let renamed = match written {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = renamed {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read(&self, kind: &str, address: &ContentAddress) -> Result<Option<(String, Vec<u8>)>, LedgerError> {
        let hex = address
            .sha256_hex()
            .ok_or_else(|| LedgerError::InvalidPayload(format!("not a sha256 address: {address}")))?
            .to_ascii_lowercase();
        match tokio::fs::read(self.path_for(kind, &hex)).await {
            Ok(bytes) => Ok(Some((hex, bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a JSON payload back, verifying its digest.
    ///
    /// `Ok(None)` when nothing is stored under the address.
    pub async fn resolve_json(
        &self,
        address: &ContentAddress,
    ) -> Result<Option<serde_json::Value>, LedgerError> {
        let Some((hex, bytes)) = self.read(PAYLOAD_KIND, address).await? else {
            return Ok(None);
        };
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| LedgerError::Integrity(format!("payload {hex} is not valid JSON: {e}")))?;
        let recanon = CanonicalBytes::new(&value)
            .map_err(|e| LedgerError::Integrity(format!("payload {hex} failed re-canonicalization: {e}")))?;
        verify(&hex, &sha256_hex(&recanon))?;
        Ok(Some(value))
    }

    /// Read a raw blob back, verifying its digest.
    pub async fn resolve_blob(&self, address: &ContentAddress) -> Result<Option<Vec<u8>>, LedgerError> {
        let Some((hex, bytes)) = self.read(BLOB_KIND, address).await? else {
            return Ok(None);
        };
        verify(&hex, &hex_of(&bytes))?;
        Ok(Some(bytes))
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

fn hex_of(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

fn verify(expected: &str, recomputed: &str) -> Result<(), LedgerError> {
    if bool::from(recomputed.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(LedgerError::Integrity(format!(
            "stored content hashes to {recomputed} but is filed under {expected}"
        )))
    }
}

#[async_trait]
impl LedgerClient for CasStore {
    fn backend(&self) -> &'static str {
        "cas"
    }

    async fn put(&self, bytes: Vec<u8>) -> Result<ContentAddress, LedgerError> {
        let hex = hex_of(&bytes);
        self.write_once(BLOB_KIND, &hex, &bytes).await?;
        Ok(ContentAddress::new(format!("sha256:{hex}")))
    }

    async fn put_json(&self, value: &serde_json::Value) -> Result<ContentAddress, LedgerError> {
        let canonical =
            CanonicalBytes::new(value).map_err(|e| LedgerError::InvalidPayload(e.to_string()))?;
        let hex = sha256_hex(&canonical);
        self.write_once(PAYLOAD_KIND, &hex, canonical.as_bytes()).await?;
        Ok(ContentAddress::new(format!("sha256:{hex}")))
    }
}
