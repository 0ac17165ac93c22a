//! Content addresses returned by ledger collaborators.

use serde::{Deserialize, Serialize};
use triage_core::ContentDigest;

/// Opaque identifier naming a stored payload.
///
/// Local backends produce `sha256:<hex>`; the pinning service returns an
/// IPFS CID. Callers treat both as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Wrap an address returned by a collaborator.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Address of a locally digested payload.
    pub fn from_digest(digest: &ContentDigest) -> Self {
        Self(digest.to_string())
    }

    /// The address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hex digest, for `sha256:`-style addresses (or bare hex).
    pub fn sha256_hex(&self) -> Option<&str> {
        let hex = self.0.strip_prefix("sha256:").unwrap_or(&self.0);
        let valid = hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit());
        valid.then_some(hex)
    }
}

impl std::fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
