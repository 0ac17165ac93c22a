//! # Pipeline Audit Trail
//!
//! Records every event the pipeline produces for an incident: receipt, each
//! agent attempt, the decision, approval requests and resolutions, ledger
//! commits, and failures.
//!
//! ## Invariant
//!
//! Every entry is individually digestable via `CanonicalBytes` +
//! `sha256_digest`. Metadata must therefore be float-free: confidences are
//! recorded in basis points, latencies in whole milliseconds.
//!
//! The trail is bounded. When it exceeds capacity the oldest 10% is dropped
//! in one step, so appends stay amortized O(1). Sequence numbers keep
//! increasing across trims.

use serde::{Deserialize, Serialize};
use triage_core::{sha256_digest, CanonicalBytes, ContentDigest, Fingerprint, Timestamp};

/// Default trail capacity.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Kind of pipeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntryType {
    /// Incident accepted for evaluation.
    IncidentReceived,
    /// One agent call completed (successfully or not).
    AgentAttempt,
    /// Policy engine produced a decision.
    DecisionMade,
    /// Incident parked at the approval gate.
    ApprovalRequested,
    /// Reviewer approved or rejected.
    ApprovalResolved,
    /// Ledger returned a content address.
    LedgerCommitted,
    /// Evaluation or commit failed terminally.
    PipelineFailed,
}

impl AuditEntryType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncidentReceived => "incident_received",
            Self::AgentAttempt => "agent_attempt",
            Self::DecisionMade => "decision_made",
            Self::ApprovalRequested => "approval_requested",
            Self::ApprovalResolved => "approval_resolved",
            Self::LedgerCommitted => "ledger_committed",
            Self::PipelineFailed => "pipeline_failed",
        }
    }
}

impl std::fmt::Display for AuditEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the trail. Assigned on append.
    pub sequence: u64,
    /// Event kind.
    pub entry_type: AuditEntryType,
    /// When the event happened.
    pub timestamp: Timestamp,
    /// Incident the event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    /// Event-specific, float-free details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AuditEntry {
    /// Create an entry stamped with the current time. The sequence number is
    /// assigned by [`AuditTrail::append`].
    pub fn new(
        entry_type: AuditEntryType,
        fingerprint: Option<Fingerprint>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            sequence: 0,
            entry_type,
            timestamp: Timestamp::now(),
            fingerprint,
            metadata,
        }
    }

    /// Content digest of this entry, or `None` if the metadata cannot be
    /// canonicalized.
    pub fn digest(&self) -> Option<ContentDigest> {
        match CanonicalBytes::new(self) {
            Ok(canonical) => Some(sha256_digest(&canonical)),
            Err(e) => {
                tracing::warn!(
                    entry_type = %self.entry_type,
                    error = %e,
                    "audit entry is not canonicalizable; digest unavailable"
                );
                None
            }
        }
    }
}

/// Bounded, append-only event log.
///
/// Not internally synchronized; wrap in a lock to share.
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
    capacity: usize,
    next_sequence: u64,
}

impl AuditTrail {
    /// Create a trail holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
            next_sequence: 1,
        }
    }

    /// Append an entry, assigning its sequence number. Returns the number.
    pub fn append(&mut self, mut entry: AuditEntry) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        entry.sequence = sequence;
        self.entries.push(entry);
        if self.entries.len() > self.capacity {
            let overflow = (self.capacity / 10).max(1);
            self.entries.drain(..overflow);
        }
        sequence
    }

    /// Convenience wrapper around [`AuditEntry::new`] + [`append`](Self::append).
    pub fn record(
        &mut self,
        entry_type: AuditEntryType,
        fingerprint: Option<&Fingerprint>,
        metadata: serde_json::Value,
    ) -> u64 {
        self.append(AuditEntry::new(
            entry_type,
            fingerprint.cloned(),
            Some(metadata),
        ))
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the trail is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The newest `n` entries, oldest first.
    pub fn last_n(&self, n: usize) -> &[AuditEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Entries belonging to one incident.
    pub fn for_fingerprint(&self, fingerprint: &Fingerprint) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.fingerprint.as_ref() == Some(fingerprint))
            .collect()
    }

    /// Entries of one kind.
    pub fn by_type(&self, entry_type: AuditEntryType) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.entry_type == entry_type)
            .collect()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}
