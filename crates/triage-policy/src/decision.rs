//! # Policy Engine
//!
//! `decide()` is a total function of `(Analysis, PolicyConfig)`. The report
//! threshold is inclusive: an analysis whose confidence equals the threshold
//! exactly is reported.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use triage_core::{Analysis, Confidence, Severity};

/// Default confidence at or above which non-clear analyses are auto-reported.
pub const DEFAULT_REPORT_THRESHOLD: f64 = 0.90;

/// Routing decision for an analysed incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Nothing to report; the incident is closed.
    AutoClear,
    /// A human must approve before the incident is committed.
    HoldForReview,
    /// Commit to the ledger without review.
    AutoReport,
}

impl Decision {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoClear => "AutoClear",
            Self::HoldForReview => "HoldForReview",
            Self::AutoReport => "AutoReport",
        }
    }

    /// Whether this decision parks the incident at the approval gate.
    pub fn requires_review(&self) -> bool {
        matches!(self, Self::HoldForReview)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invalid policy configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// Threshold is not a finite value in `[0, 1]`.
    #[error("report threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
}

/// Tunable policy thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    report_threshold: Confidence,
}

impl PolicyConfig {
    /// Build a config, rejecting out-of-range thresholds.
    pub fn new(report_threshold: f64) -> Result<Self, PolicyError> {
        let report_threshold = Confidence::new(report_threshold)
            .map_err(|_| PolicyError::InvalidThreshold(report_threshold))?;
        Ok(Self { report_threshold })
    }

    /// The inclusive auto-report threshold.
    pub fn report_threshold(&self) -> Confidence {
        self.report_threshold
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            report_threshold: Confidence::from_basis_points(9_000),
        }
    }
}

/// Pure severity/confidence router.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine {
    config: PolicyConfig,
}

impl PolicyEngine {
    /// Create an engine with the given thresholds.
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Derive the decision for an analysis.
    pub fn decide(&self, analysis: &Analysis) -> Decision {
        match analysis.severity() {
            Severity::Clear => Decision::AutoClear,
            Severity::Advisory | Severity::Critical => {
                if analysis.confidence().value() >= self.config.report_threshold.value() {
                    Decision::AutoReport
                } else {
                    Decision::HoldForReview
                }
            }
        }
    }
}
