//! # Incident Lifecycle State Machine
//!
//! Tracks one evaluation of one incident from receipt to a terminal state.
//! Transitions are validated against a fixed table; anything else is
//! rejected with a structured error naming both ends.
//!
//! A lifecycle in a terminal state never moves again. Resubmitting an
//! incident after it terminated starts a new lifecycle.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use triage_core::{Fingerprint, Timestamp};

/// Where an incident is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentState {
    /// Accepted, not yet dispatched.
    Received,
    /// Agents are running.
    Analyzing,
    /// Auto-cleared. Terminal.
    Cleared,
    /// Parked at the approval gate.
    AwaitingApproval,
    /// Ledger commit in progress.
    Reporting,
    /// Committed to the ledger. Terminal.
    Reported,
    /// Rejected by a reviewer. Terminal.
    Closed,
    /// Analysis unavailable or commit failed. Terminal.
    Failed,
}

impl IncidentState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Cleared | Self::Reported | Self::Closed | Self::Failed
        )
    }

    /// Whether work is actively running (not parked, not finished).
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Received | Self::Analyzing | Self::Reporting)
    }

    /// States reachable in one step.
    pub fn valid_transitions(&self) -> &'static [IncidentState] {
        match self {
            Self::Received => &[Self::Analyzing],
            Self::Analyzing => &[
                Self::Cleared,
                Self::AwaitingApproval,
                Self::Reporting,
                Self::Failed,
            ],
            Self::AwaitingApproval => &[Self::Reporting, Self::Closed],
            Self::Reporting => &[Self::Reported, Self::Failed],
            Self::Cleared | Self::Reported | Self::Closed | Self::Failed => &[],
        }
    }

    /// Whether `to` is reachable in one step.
    pub fn can_transition_to(&self, to: IncidentState) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "Received",
            Self::Analyzing => "Analyzing",
            Self::Cleared => "Cleared",
            Self::AwaitingApproval => "AwaitingApproval",
            Self::Reporting => "Reporting",
            Self::Reported => "Reported",
            Self::Closed => "Closed",
            Self::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for IncidentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected lifecycle transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// `to` is not reachable from `from`.
    #[error("invalid incident transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: IncidentState,
        /// Attempted state.
        to: IncidentState,
    },

    /// The lifecycle already terminated.
    #[error("incident {fingerprint} is {state} and cannot transition")]
    Terminal {
        /// Incident fingerprint.
        fingerprint: Fingerprint,
        /// Terminal state reached.
        state: IncidentState,
    },
}

/// One entry in the transition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleTransition {
    /// State before.
    pub from: IncidentState,
    /// State after.
    pub to: IncidentState,
    /// When it happened.
    pub timestamp: Timestamp,
    /// Why.
    pub reason: String,
}

/// One incident evaluation with its transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentLifecycle {
    fingerprint: Fingerprint,
    state: IncidentState,
    created_at: Timestamp,
    transitions: Vec<LifecycleTransition>,
}

impl IncidentLifecycle {
    /// Start a lifecycle in `Received`.
    pub fn new(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            state: IncidentState::Received,
            created_at: Timestamp::now(),
            transitions: Vec::new(),
        }
    }

    /// Incident fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Current state.
    pub fn state(&self) -> IncidentState {
        self.state
    }

    /// When the lifecycle began.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Ordered transition log.
    pub fn transitions(&self) -> &[LifecycleTransition] {
        &self.transitions
    }

    /// Reason recorded on the transition into `Failed`, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        match self.state {
            IncidentState::Failed => self.transitions.last().map(|t| t.reason.as_str()),
            _ => None,
        }
    }

    /// Move to `to`, recording `reason`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Terminal`] from a terminal state,
    /// [`LifecycleError::InvalidTransition`] for any other illegal step.
    pub fn transition(
        &mut self,
        to: IncidentState,
        reason: impl Into<String>,
    ) -> Result<(), LifecycleError> {
        if self.state.is_terminal() {
            return Err(LifecycleError::Terminal {
                fingerprint: self.fingerprint.clone(),
                state: self.state,
            });
        }
        if !self.state.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        let reason = reason.into();
        tracing::debug!(
            fingerprint = %self.fingerprint.short(),
            from = %self.state,
            to = %to,
            reason = %reason,
            "incident transition"
        );
        self.transitions.push(LifecycleTransition {
            from: self.state,
            to,
            timestamp: Timestamp::now(),
            reason,
        });
        self.state = to;
        Ok(())
    }
}
