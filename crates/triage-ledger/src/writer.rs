//! # Ledger Writer
//!
//! Commits reported incidents to a [`LedgerClient`], at most once per
//! fingerprint. A repeat commit returns the stored address without
//! touching the collaborator.
//!
//! Concurrent commits for the same fingerprint serialize on a per-key
//! async lock, so exactly one reaches the collaborator. Different
//! fingerprints never contend. The lock entry is dropped once a record
//! exists, since every later caller short-circuits on the record. After a
//! failed write it is dropped when no other caller is queued on it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use triage_core::{Analysis, Fingerprint, Timestamp};

use crate::address::ContentAddress;
use crate::client::LedgerClient;
use crate::error::{LedgerError, LedgerWriteError};
use crate::payload::{LedgerPayload, DEFAULT_REPORTER};

/// A committed incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRecord {
    /// Incident fingerprint.
    pub fingerprint: Fingerprint,
    /// Address returned by the collaborator.
    pub content_address: ContentAddress,
    /// When the commit completed.
    pub committed_at: Timestamp,
}

/// Idempotent front for a ledger collaborator.
pub struct LedgerWriter {
    client: Arc<dyn LedgerClient>,
    reporter: String,
    records: RwLock<HashMap<Fingerprint, LedgerRecord>>,
    locks: Mutex<HashMap<Fingerprint, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for LedgerWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerWriter")
            .field("backend", &self.client.backend())
            .field("reporter", &self.reporter)
            .field("records", &self.records.read().len())
            .finish()
    }
}

impl LedgerWriter {
    /// Writer over `client`, stamping payloads with the default reporter.
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        Self {
            client,
            reporter: DEFAULT_REPORTER.to_string(),
            records: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Override the reporter name written into payloads.
    pub fn with_reporter(mut self, reporter: impl Into<String>) -> Self {
        self.reporter = reporter.into();
        self
    }

    /// Backend name of the underlying collaborator.
    pub fn backend(&self) -> &'static str {
        self.client.backend()
    }

    /// Commit `analysis` for `fingerprint`, or return the existing address.
    ///
    /// # Errors
    ///
    /// `WriteFailed` if the collaborator rejects the write. No record is
    /// stored and nothing is retried here.
    pub async fn commit(
        &self,
        fingerprint: &Fingerprint,
        analysis: &Analysis,
    ) -> Result<ContentAddress, LedgerWriteError> {
        if let Some(existing) = self.record(fingerprint) {
            return Ok(existing.content_address);
        }

        let key_lock = self.locks.lock().entry(fingerprint.clone()).or_default().clone();
        let _guard = key_lock.lock().await;

        if let Some(existing) = self.record(fingerprint) {
            return Ok(existing.content_address);
        }

        let payload = LedgerPayload::new(fingerprint, analysis, &self.reporter);
        let written = match serde_json::to_value(&payload) {
            Ok(value) => self.client.put_json(&value).await,
            Err(e) => Err(LedgerError::InvalidPayload(e.to_string())),
        };

        match written {
            Ok(address) => {
                let record = LedgerRecord {
                    fingerprint: fingerprint.clone(),
                    content_address: address.clone(),
                    committed_at: Timestamp::now(),
                };
                self.records.write().insert(fingerprint.clone(), record);
                self.locks.lock().remove(fingerprint);
                tracing::info!(
                    fingerprint = %fingerprint.short(),
                    backend = self.client.backend(),
                    content_address = %address,
                    "incident committed to ledger"
                );
                Ok(address)
            }
            Err(source) => {
                self.release_lock(fingerprint, &key_lock);
                tracing::warn!(
                    fingerprint = %fingerprint.short(),
                    backend = self.client.backend(),
                    error = %source,
                    "ledger write failed"
                );
                Err(LedgerWriteError::WriteFailed {
                    fingerprint: fingerprint.clone(),
                    source,
                })
            }
        }
    }

    /// Drop the per-key lock unless another caller still holds a handle.
    ///
    /// Handles are only cloned under the map lock, so the count is stable
    /// while it is held.
    fn release_lock(&self, fingerprint: &Fingerprint, key_lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        let idle = locks
            .get(fingerprint)
            .is_some_and(|l| Arc::ptr_eq(l, key_lock) && Arc::strong_count(key_lock) == 2);
        if idle {
            locks.remove(fingerprint);
        }
    }

    /// Number of per-key locks currently held in the map.
    pub fn lock_entries(&self) -> usize {
        self.locks.lock().len()
    }

    /// The record for a fingerprint, if committed.
    pub fn record(&self, fingerprint: &Fingerprint) -> Option<LedgerRecord> {
        self.records.read().get(fingerprint).cloned()
    }

    /// All records, oldest commit first.
    pub fn records(&self) -> Vec<LedgerRecord> {
        let mut all: Vec<LedgerRecord> = self.records.read().values().cloned().collect();
        all.sort_by(|a, b| a.committed_at.cmp(&b.committed_at));
        all
    }

    /// Number of committed fingerprints.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
