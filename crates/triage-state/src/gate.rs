//! # Approval Gate
//!
//! Exclusive owner of [`ApprovalRequest`]s. All mutations take the write
//! lock, so check-then-insert and check-then-resolve are atomic per
//! fingerprint.
//!
//! A fingerprint maps to at most one *current* request. When a resolved
//! request is superseded by a fresh `request_approval`, the old one moves
//! to history. History is bounded: past its capacity the oldest tenth is
//! dropped.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;
use triage_core::{Analysis, Fingerprint};

use crate::approval::{ApprovalOutcome, ApprovalRequest};

/// Default number of superseded requests retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

/// Approval gate misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    /// An unresolved request already exists for this fingerprint.
    #[error("approval already pending for incident {fingerprint}")]
    AlreadyPending {
        /// Incident fingerprint.
        fingerprint: Fingerprint,
    },

    /// No request exists for this fingerprint.
    #[error("no approval request for incident {fingerprint}")]
    NotFound {
        /// Incident fingerprint.
        fingerprint: Fingerprint,
    },

    /// The request was already resolved.
    #[error("approval for incident {fingerprint} already resolved as {outcome}")]
    AlreadyResolved {
        /// Incident fingerprint.
        fingerprint: Fingerprint,
        /// The outcome that stands.
        outcome: ApprovalOutcome,
    },
}

#[derive(Debug)]
struct Slot {
    sequence: u64,
    request: ApprovalRequest,
}

#[derive(Debug)]
struct GateInner {
    current: HashMap<Fingerprint, Slot>,
    history: Vec<ApprovalRequest>,
    history_capacity: usize,
    next_sequence: u64,
}

impl GateInner {
    fn archive(&mut self, request: ApprovalRequest) {
        self.history.push(request);
        if self.history.len() > self.history_capacity {
            let overflow = (self.history_capacity / 10).max(1);
            self.history.drain(..overflow);
        }
    }
}

/// Fingerprint-keyed store of approval requests.
#[derive(Debug)]
pub struct ApprovalGate {
    inner: RwLock<GateInner>,
}

impl Default for ApprovalGate {
    fn default() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ApprovalGate {
    /// Empty gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty gate retaining at most `capacity` superseded requests.
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(GateInner {
                current: HashMap::new(),
                history: Vec::new(),
                history_capacity: capacity.max(1),
                next_sequence: 0,
            }),
        }
    }

    /// Open a pending request for `fingerprint`.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::AlreadyPending`] if an unresolved request exists.
    pub fn request_approval(
        &self,
        fingerprint: Fingerprint,
        analysis: Analysis,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let mut inner = self.inner.write();
        if let Some(slot) = inner.current.get(&fingerprint) {
            if slot.request.is_pending() {
                return Err(ApprovalError::AlreadyPending { fingerprint });
            }
        }
        if let Some(previous) = inner.current.remove(&fingerprint) {
            inner.archive(previous.request);
        }

        let request = ApprovalRequest::new(fingerprint.clone(), analysis);
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.current.insert(
            fingerprint.clone(),
            Slot {
                sequence,
                request: request.clone(),
            },
        );
        tracing::info!(fingerprint = %fingerprint.short(), "approval requested");
        Ok(request)
    }

    /// Resolve the pending request for `fingerprint`.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::NotFound`] if no request exists,
    /// [`ApprovalError::AlreadyResolved`] if it was already resolved.
    pub fn resolve(
        &self,
        fingerprint: &Fingerprint,
        outcome: ApprovalOutcome,
        reviewer: Option<String>,
        note: Option<String>,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let mut inner = self.inner.write();
        let slot = inner
            .current
            .get_mut(fingerprint)
            .ok_or_else(|| ApprovalError::NotFound {
                fingerprint: fingerprint.clone(),
            })?;
        slot.request
            .resolve(outcome, reviewer, note)
            .map_err(|existing| ApprovalError::AlreadyResolved {
                fingerprint: fingerprint.clone(),
                outcome: existing,
            })?;
        tracing::info!(fingerprint = %fingerprint.short(), outcome = %outcome, "approval resolved");
        Ok(slot.request.clone())
    }

    /// Current request for `fingerprint`, pending or resolved.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<ApprovalRequest> {
        self.inner
            .read()
            .current
            .get(fingerprint)
            .map(|slot| slot.request.clone())
    }

    /// All pending requests, oldest first.
    pub fn pending(&self) -> Vec<ApprovalRequest> {
        let inner = self.inner.read();
        let mut slots: Vec<&Slot> = inner
            .current
            .values()
            .filter(|slot| slot.request.is_pending())
            .collect();
        slots.sort_by_key(|slot| slot.sequence);
        slots.into_iter().map(|slot| slot.request.clone()).collect()
    }

    /// Superseded requests for `fingerprint`, oldest first.
    pub fn history(&self, fingerprint: &Fingerprint) -> Vec<ApprovalRequest> {
        self.inner
            .read()
            .history
            .iter()
            .filter(|r| r.fingerprint() == fingerprint)
            .cloned()
            .collect()
    }

    /// Number of pending requests.
    pub fn pending_count(&self) -> usize {
        self.inner
            .read()
            .current
            .values()
            .filter(|slot| slot.request.is_pending())
            .count()
    }
}
