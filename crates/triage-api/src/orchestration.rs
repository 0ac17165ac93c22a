//! # Triage Pipeline Orchestration
//!
//! Composes dispatch, policy, approval and ledger into the incident
//! lifecycle:
//!
//! ```text
//! Received → Analyzing ─┬─ AutoClear ─────▶ Cleared
//!                       ├─ HoldForReview ─▶ AwaitingApproval ─┬─ Rejected ─▶ Closed
//!                       │                                     └─ Approved ─┐
//!                       ├─ AutoReport ────▶ Reporting ◀───────────────────┘
//!                       │                      ├─ committed ─▶ Reported
//!                       │                      └─ retries exhausted ─▶ Failed
//!                       └─ AnalysisUnavailable ─▶ Failed
//! ```
//!
//! Approval is asynchronous: `submit_incident` returns as soon as the
//! request is parked, and `resolve_approval` drives it forward out of band.
//! The ledger is only reached from the AutoReport and Approved paths.
//!
//! A fingerprint has at most one live lifecycle. Admission happens under
//! the lifecycle store's write lock, so concurrent submissions of the same
//! incident see `InProgress` rather than racing into the dispatcher.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use triage_agents::{AttemptTrace, DispatchError, Dispatcher};
use triage_core::{Analysis, CanonicalizationError, Fingerprint, Incident, ValidationError};
use triage_ledger::{ContentAddress, LedgerError, LedgerWriteError, LedgerWriter};
use triage_policy::{AuditEntry, AuditEntryType, AuditTrail, Decision, PolicyEngine};
use triage_state::{
    ApprovalError, ApprovalGate, ApprovalOutcome, ApprovalRequest, IncidentLifecycle,
    IncidentState, LifecycleError,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a pipeline operation did not complete.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Malformed incident, rejected before dispatch.
    #[error("invalid incident: {0}")]
    InvalidIncident(#[from] ValidationError),

    /// The incident could not be fingerprinted.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Neither agent produced an analysis.
    #[error(transparent)]
    AnalysisUnavailable(#[from] DispatchError),

    /// Approval gate misuse.
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    /// Ledger commit failed after all retries.
    #[error(transparent)]
    Ledger(#[from] LedgerWriteError),

    /// Illegal lifecycle step.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The incident is already being evaluated or reported.
    #[error("incident {fingerprint} is {state}; retry once it settles")]
    InProgress {
        /// Incident fingerprint.
        fingerprint: Fingerprint,
        /// Current in-flight state.
        state: IncidentState,
    },

    /// No lifecycle exists for this fingerprint.
    #[error("no incident with fingerprint {0}")]
    NotFound(Fingerprint),
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Ledger commit retry policy.
///
/// `attempts` counts every call including the first. The delay before
/// retry `n` (zero-based) is `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total commit attempts, at least 1.
    pub attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `n` (zero-based).
    pub fn delay(&self, n: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(n))
    }
}

/// Payload and integrity errors fail identically on every attempt.
fn is_retryable(err: &LedgerWriteError) -> bool {
    matches!(
        err.ledger_error(),
        LedgerError::Network(_) | LedgerError::Storage(_) | LedgerError::Auth(_)
    )
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of `submit_incident` or `resolve_approval`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    /// Incident fingerprint.
    pub fingerprint: Fingerprint,
    /// Lifecycle state after the call.
    pub state: IncidentState,
    /// The analysis the decision was made on.
    pub analysis: Analysis,
    /// Policy decision.
    pub decision: Decision,
    /// Ledger address, once reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_address: Option<ContentAddress>,
    /// Approval request, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalRequest>,
    /// Agent attempts made by this call.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<AttemptTrace>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The incident triage pipeline.
pub struct Pipeline {
    dispatcher: Dispatcher,
    policy: PolicyEngine,
    gate: ApprovalGate,
    ledger: LedgerWriter,
    retry: RetryPolicy,
    lifecycles: RwLock<HashMap<Fingerprint, IncidentLifecycle>>,
    audit: Mutex<AuditTrail>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("dispatcher", &self.dispatcher)
            .field("policy", &self.policy)
            .field("ledger", &self.ledger)
            .field("retry", &self.retry)
            .field("lifecycles", &self.lifecycles.read().len())
            .finish()
    }
}

enum Admission {
    Parked(ApprovalRequest),
    Admitted,
}

impl Pipeline {
    /// Assemble a pipeline from its parts.
    pub fn new(
        dispatcher: Dispatcher,
        policy: PolicyEngine,
        ledger: LedgerWriter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            dispatcher,
            policy,
            gate: ApprovalGate::new(),
            ledger,
            retry,
            lifecycles: RwLock::new(HashMap::new()),
            audit: Mutex::new(AuditTrail::default()),
        }
    }

    /// Run an incident through dispatch, policy and (if warranted) the ledger.
    ///
    /// Returns with `AwaitingApproval` when a reviewer must decide; a
    /// repeat submission while parked returns the open request unchanged.
    pub async fn submit_incident(&self, incident: Incident) -> Result<PipelineOutcome, PipelineError> {
        let fingerprint = incident.fingerprint()?;

        if let Admission::Parked(request) = self.admit(&fingerprint)? {
            return Ok(PipelineOutcome {
                fingerprint,
                state: IncidentState::AwaitingApproval,
                analysis: request.analysis().clone(),
                decision: Decision::HoldForReview,
                content_address: None,
                approval: Some(request),
                trace: Vec::new(),
            });
        }
        self.audit(
            AuditEntryType::IncidentReceived,
            &fingerprint,
            json!({ "disaster_type": incident.disaster_type(), "sector_id": incident.sector_id() }),
        );

        let evaluation = match self.dispatcher.evaluate(&incident).await {
            Ok(evaluation) => evaluation,
            Err(err) => {
                self.audit_attempts(&fingerprint, err.trace());
                self.fail(&fingerprint, &err.to_string());
                return Err(err.into());
            }
        };
        self.audit_attempts(&fingerprint, &evaluation.trace);

        let analysis = evaluation.analysis;
        let decision = self.policy.decide(&analysis);
        tracing::info!(
            fingerprint = %fingerprint.short(),
            severity = ?analysis.severity(),
            confidence = %analysis.confidence(),
            fallback_active = analysis.fallback_active(),
            decision = %decision,
            "policy decision"
        );
        self.audit(
            AuditEntryType::DecisionMade,
            &fingerprint,
            json!({
                "decision": decision,
                "severity": analysis.severity(),
                "confidence_bps": analysis.confidence().basis_points(),
                "fallback_active": analysis.fallback_active(),
            }),
        );

        let mut outcome = PipelineOutcome {
            fingerprint: fingerprint.clone(),
            state: IncidentState::Analyzing,
            analysis,
            decision,
            content_address: None,
            approval: None,
            trace: evaluation.trace,
        };

        match decision {
            Decision::AutoClear => {
                self.advance(&fingerprint, IncidentState::Cleared, "AutoClear")?;
                outcome.state = IncidentState::Cleared;
            }
            Decision::HoldForReview => {
                let request = match self.park(&fingerprint, &outcome.analysis) {
                    Ok(request) => request,
                    Err(err) => {
                        self.fail(&fingerprint, &err.to_string());
                        return Err(err);
                    }
                };
                self.audit(AuditEntryType::ApprovalRequested, &fingerprint, json!({}));
                outcome.state = IncidentState::AwaitingApproval;
                outcome.approval = Some(request);
            }
            Decision::AutoReport => {
                self.advance(&fingerprint, IncidentState::Reporting, "AutoReport")?;
                let address = self.report(&fingerprint, &outcome.analysis).await?;
                outcome.state = IncidentState::Reported;
                outcome.content_address = Some(address);
            }
        }
        Ok(outcome)
    }

    /// Apply a reviewer's verdict to a parked incident.
    ///
    /// `Approved` commits to the ledger; `Rejected` closes the incident
    /// without reporting it.
    pub async fn resolve_approval(
        &self,
        fingerprint: &Fingerprint,
        outcome: ApprovalOutcome,
        reviewer: Option<String>,
        note: Option<String>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let request = self.settle(fingerprint, outcome, reviewer.clone(), note)?;
        self.audit(
            AuditEntryType::ApprovalResolved,
            fingerprint,
            json!({ "outcome": outcome, "reviewer": reviewer }),
        );

        let mut result = PipelineOutcome {
            fingerprint: fingerprint.clone(),
            state: IncidentState::AwaitingApproval,
            analysis: request.analysis().clone(),
            decision: Decision::HoldForReview,
            content_address: None,
            approval: Some(request),
            trace: Vec::new(),
        };

        match outcome {
            ApprovalOutcome::Rejected => {
                result.state = IncidentState::Closed;
            }
            ApprovalOutcome::Approved => {
                let address = self.report(fingerprint, &result.analysis).await?;
                result.state = IncidentState::Reported;
                result.content_address = Some(address);
            }
        }
        Ok(result)
    }

    // -- Queries -------------------------------------------------------------

    /// Current lifecycle for a fingerprint.
    pub fn lifecycle(&self, fingerprint: &Fingerprint) -> Option<IncidentLifecycle> {
        self.lifecycles.read().get(fingerprint).cloned()
    }

    /// Pending approvals, oldest first.
    pub fn pending_approvals(&self) -> Vec<ApprovalRequest> {
        self.gate.pending()
    }

    /// The approval gate.
    pub fn gate(&self) -> &ApprovalGate {
        &self.gate
    }

    /// The ledger writer.
    pub fn ledger(&self) -> &LedgerWriter {
        &self.ledger
    }

    /// The active policy engine.
    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    /// The most recent `n` audit entries, oldest first.
    pub fn audit_tail(&self, n: usize) -> Vec<AuditEntry> {
        self.audit.lock().last_n(n).to_vec()
    }

    /// Audit entries for one incident.
    pub fn audit_for(&self, fingerprint: &Fingerprint) -> Vec<AuditEntry> {
        self.audit
            .lock()
            .for_fingerprint(fingerprint)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Whether the shared stores are responsive.
    pub fn is_ready(&self) -> bool {
        self.audit.try_lock().is_some() && self.lifecycles.try_read().is_some()
    }

    // -- Internals -----------------------------------------------------------

    fn admit(&self, fingerprint: &Fingerprint) -> Result<Admission, PipelineError> {
        let mut lifecycles = self.lifecycles.write();
        if let Some(existing) = lifecycles.get(fingerprint) {
            let state = existing.state();
            if state == IncidentState::AwaitingApproval {
                if let Some(request) = self.gate.get(fingerprint).filter(|r| r.is_pending()) {
                    return Ok(Admission::Parked(request));
                }
            }
            if !state.is_terminal() {
                return Err(PipelineError::InProgress {
                    fingerprint: fingerprint.clone(),
                    state,
                });
            }
        }
        let mut lifecycle = IncidentLifecycle::new(fingerprint.clone());
        lifecycle.transition(IncidentState::Analyzing, "dispatch")?;
        lifecycles.insert(fingerprint.clone(), lifecycle);
        Ok(Admission::Admitted)
    }

    /// Open an approval request and park the lifecycle in one step.
    ///
    /// Both happen under the lifecycle write lock, so a reviewer can never
    /// see a pending request for an incident that is still `Analyzing`.
    fn park(
        &self,
        fingerprint: &Fingerprint,
        analysis: &Analysis,
    ) -> Result<ApprovalRequest, PipelineError> {
        let mut lifecycles = self.lifecycles.write();
        let lifecycle = lifecycles
            .get_mut(fingerprint)
            .ok_or_else(|| PipelineError::NotFound(fingerprint.clone()))?;
        if !lifecycle.state().can_transition_to(IncidentState::AwaitingApproval) {
            return Err(PipelineError::InProgress {
                fingerprint: fingerprint.clone(),
                state: lifecycle.state(),
            });
        }
        let request = self.gate.request_approval(fingerprint.clone(), analysis.clone())?;
        lifecycle.transition(IncidentState::AwaitingApproval, "HoldForReview")?;
        Ok(request)
    }

    /// Resolve the gate and step the lifecycle out of `AwaitingApproval`.
    ///
    /// The lifecycle is checked before the gate is touched; an in-flight
    /// incident leaves its request pending.
    fn settle(
        &self,
        fingerprint: &Fingerprint,
        outcome: ApprovalOutcome,
        reviewer: Option<String>,
        note: Option<String>,
    ) -> Result<ApprovalRequest, PipelineError> {
        let mut lifecycles = self.lifecycles.write();
        let Some(lifecycle) = lifecycles.get_mut(fingerprint) else {
            return Err(ApprovalError::NotFound {
                fingerprint: fingerprint.clone(),
            }
            .into());
        };
        let state = lifecycle.state();
        if state.is_in_flight() {
            return Err(PipelineError::InProgress {
                fingerprint: fingerprint.clone(),
                state,
            });
        }
        let (to, reason) = match outcome {
            ApprovalOutcome::Rejected => (IncidentState::Closed, "Rejected"),
            ApprovalOutcome::Approved => (IncidentState::Reporting, "Approved"),
        };
        let request = self.gate.resolve(fingerprint, outcome, reviewer, note)?;
        lifecycle.transition(to, reason)?;
        Ok(request)
    }

    fn advance(
        &self,
        fingerprint: &Fingerprint,
        to: IncidentState,
        reason: &str,
    ) -> Result<(), PipelineError> {
        let mut lifecycles = self.lifecycles.write();
        let lifecycle = lifecycles
            .get_mut(fingerprint)
            .ok_or_else(|| PipelineError::NotFound(fingerprint.clone()))?;
        lifecycle.transition(to, reason)?;
        Ok(())
    }

    /// Move to `Failed` and make it visible. Never silent.
    fn fail(&self, fingerprint: &Fingerprint, reason: &str) {
        tracing::error!(fingerprint = %fingerprint.short(), reason, "incident failed");
        if let Err(err) = self.advance(fingerprint, IncidentState::Failed, reason) {
            tracing::error!(fingerprint = %fingerprint.short(), error = %err, "could not record failure");
        }
        self.audit(
            AuditEntryType::PipelineFailed,
            fingerprint,
            json!({ "reason": reason }),
        );
    }

    /// Commit with retry, then settle the lifecycle as Reported or Failed.
    async fn report(
        &self,
        fingerprint: &Fingerprint,
        analysis: &Analysis,
    ) -> Result<ContentAddress, PipelineError> {
        match self.commit_with_retry(fingerprint, analysis).await {
            Ok(address) => {
                self.advance(fingerprint, IncidentState::Reported, "committed")?;
                self.audit(
                    AuditEntryType::LedgerCommitted,
                    fingerprint,
                    json!({ "content_address": address, "backend": self.ledger.backend() }),
                );
                Ok(address)
            }
            Err(err) => {
                self.fail(fingerprint, &err.to_string());
                Err(err.into())
            }
        }
    }

    async fn commit_with_retry(
        &self,
        fingerprint: &Fingerprint,
        analysis: &Analysis,
    ) -> Result<ContentAddress, LedgerWriteError> {
        let attempts = self.retry.attempts.max(1);
        let mut n = 0;
        loop {
            match self.ledger.commit(fingerprint, analysis).await {
                Ok(address) => return Ok(address),
                Err(err) if n + 1 < attempts && is_retryable(&err) => {
                    let delay = self.retry.delay(n);
                    tracing::warn!(
                        fingerprint = %fingerprint.short(),
                        attempt = n + 1,
                        max_attempts = attempts,
                        "ledger commit failed, retrying in {delay:?}: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    n += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn audit(&self, entry_type: AuditEntryType, fingerprint: &Fingerprint, metadata: serde_json::Value) {
        self.audit.lock().record(entry_type, Some(fingerprint), metadata);
    }

    fn audit_attempts(&self, fingerprint: &Fingerprint, trace: &[AttemptTrace]) {
        let mut audit = self.audit.lock();
        for attempt in trace {
            let metadata = serde_json::to_value(attempt).unwrap_or_else(|_| json!({}));
            audit.record(AuditEntryType::AgentAttempt, Some(fingerprint), metadata);
        }
    }
}
