//! # Ledger Payload
//!
//! The JSON document committed for a reported incident. It carries no
//! floats and no wall-clock time, so the same fingerprint and analysis
//! always canonicalize to the same bytes and therefore the same local
//! content address.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use triage_core::{AgentRole, Analysis, CanonicalBytes, CanonicalizationError, Fingerprint, Severity};

/// Reporter identity stamped on payloads by default.
pub const DEFAULT_REPORTER: &str = "NeoGuard Sentinel 01";

/// Committed incident report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPayload {
    /// Incident fingerprint.
    pub fingerprint: Fingerprint,
    /// Severity verdict.
    pub severity: Severity,
    /// Verdict confidence in basis points.
    pub confidence_bps: u32,
    /// Agent justification.
    pub reasoning: String,
    /// Suggested responses, in order.
    pub recommended_actions: Vec<String>,
    /// Agents that ran.
    pub agents_used: BTreeSet<AgentRole>,
    /// Whether the fallback produced the verdict.
    pub fallback_active: bool,
    /// Reporting node.
    pub reporter: String,
}

impl LedgerPayload {
    /// Build the payload for a fingerprint and its analysis.
    pub fn new(fingerprint: &Fingerprint, analysis: &Analysis, reporter: &str) -> Self {
        Self {
            fingerprint: fingerprint.clone(),
            severity: analysis.severity(),
            confidence_bps: analysis.confidence().basis_points(),
            reasoning: analysis.reasoning().to_string(),
            recommended_actions: analysis.recommended_actions().to_vec(),
            agents_used: analysis.agents_used().clone(),
            fallback_active: analysis.fallback_active(),
            reporter: reporter.to_string(),
        }
    }

    /// Canonical bytes of this payload.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::{Assessment, Confidence};

    #[test]
    fn payload_is_integer_only_and_deterministic() {
        let fp = Fingerprint::parse(&"f".repeat(64)).unwrap();
        let analysis = Analysis::from_primary(Assessment {
            severity: Severity::Critical,
            confidence: Confidence::new(0.93).unwrap(),
            reasoning: "wildfire".into(),
            recommended_actions: vec!["evacuate".into()],
        });
        let a = LedgerPayload::new(&fp, &analysis, DEFAULT_REPORTER);
        let b = LedgerPayload::new(&fp, &analysis, DEFAULT_REPORTER);
        assert_eq!(a.confidence_bps, 9_300);
        assert_eq!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());

        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["reporter"], "NeoGuard Sentinel 01");
        assert_eq!(v["agents_used"], serde_json::json!(["primary"]));
    }
}
