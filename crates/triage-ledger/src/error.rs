//! Ledger error types.

use thiserror::Error;
use triage_core::Fingerprint;

/// A ledger collaborator failed to store a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Transport failure or unexpected response.
    #[error("ledger network error: {0}")]
    Network(String),

    /// Credentials missing or rejected.
    #[error("ledger auth error: {0}")]
    Auth(String),

    /// Local storage failure.
    #[error("ledger storage error: {0}")]
    Storage(String),

    /// Payload could not be encoded for storage.
    #[error("ledger payload rejected: {0}")]
    InvalidPayload(String),

    /// Stored bytes do not match their address.
    #[error("ledger integrity violation: {0}")]
    Integrity(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

/// The ledger writer could not commit an incident.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerWriteError {
    /// The external write failed. Safe to retry: commits are keyed by
    /// fingerprint.
    #[error("ledger write failed for incident {fingerprint}: {source}")]
    WriteFailed {
        /// Incident fingerprint.
        fingerprint: Fingerprint,
        /// Collaborator error.
        #[source]
        source: LedgerError,
    },
}

impl LedgerWriteError {
    /// The underlying collaborator error.
    pub fn ledger_error(&self) -> &LedgerError {
        match self {
            Self::WriteFailed { source, .. } => source,
        }
    }
}
