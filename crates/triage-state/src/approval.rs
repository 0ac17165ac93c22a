//! # Approval Requests
//!
//! An [`ApprovalRequest`] is created only when the policy decides
//! `HoldForReview`. Its [`Resolution`] moves exactly once, from `Pending`
//! to `Approved` or `Rejected`.

use serde::{Deserialize, Serialize};
use triage_core::{Analysis, Fingerprint, Timestamp};

/// Reviewer verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalOutcome {
    /// Commit the incident to the ledger.
    Approved,
    /// Close the incident without reporting.
    Rejected,
}

impl std::fmt::Display for ApprovalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => f.write_str("Approved"),
            Self::Rejected => f.write_str("Rejected"),
        }
    }
}

/// Who resolved a request, when, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionDetails {
    /// When the request was resolved.
    pub resolved_at: Timestamp,
    /// Reviewer identity, if supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    /// Free-text justification, if supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// State of an approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Resolution {
    /// Waiting for a reviewer.
    Pending,
    /// Reviewer approved.
    Approved(ResolutionDetails),
    /// Reviewer rejected.
    Rejected(ResolutionDetails),
}

impl Resolution {
    /// Whether still awaiting a reviewer.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The verdict, once resolved.
    pub fn outcome(&self) -> Option<ApprovalOutcome> {
        match self {
            Self::Pending => None,
            Self::Approved(_) => Some(ApprovalOutcome::Approved),
            Self::Rejected(_) => Some(ApprovalOutcome::Rejected),
        }
    }

    /// Resolution details, once resolved.
    pub fn details(&self) -> Option<&ResolutionDetails> {
        match self {
            Self::Pending => None,
            Self::Approved(d) | Self::Rejected(d) => Some(d),
        }
    }
}

/// A request for human review of one incident's analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    fingerprint: Fingerprint,
    analysis: Analysis,
    created_at: Timestamp,
    resolution: Resolution,
}

impl ApprovalRequest {
    /// Open a new pending request.
    pub fn new(fingerprint: Fingerprint, analysis: Analysis) -> Self {
        Self {
            fingerprint,
            analysis,
            created_at: Timestamp::now(),
            resolution: Resolution::Pending,
        }
    }

    /// Incident fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Analysis under review.
    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// When the request was opened.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Current resolution.
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Whether still awaiting a reviewer.
    pub fn is_pending(&self) -> bool {
        self.resolution.is_pending()
    }

    /// When the request was resolved, if it has been.
    pub fn resolved_at(&self) -> Option<Timestamp> {
        self.resolution.details().map(|d| d.resolved_at)
    }

    /// Move `Pending` to the given outcome. Returns the existing outcome if
    /// already resolved; the request is left untouched in that case.
    pub(crate) fn resolve(
        &mut self,
        outcome: ApprovalOutcome,
        reviewer: Option<String>,
        note: Option<String>,
    ) -> Result<(), ApprovalOutcome> {
        if let Some(existing) = self.resolution.outcome() {
            return Err(existing);
        }
        let details = ResolutionDetails {
            resolved_at: Timestamp::now(),
            reviewer,
            note,
        };
        self.resolution = match outcome {
            ApprovalOutcome::Approved => Resolution::Approved(details),
            ApprovalOutcome::Rejected => Resolution::Rejected(details),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::{Assessment, Confidence, Severity};

    fn request() -> ApprovalRequest {
        ApprovalRequest::new(
            Fingerprint::parse(&"ab".repeat(32)).unwrap(),
            Analysis::from_primary(Assessment {
                severity: Severity::Advisory,
                confidence: Confidence::new(0.6).unwrap(),
                reasoning: "flood".into(),
                recommended_actions: vec![],
            }),
        )
    }

    #[test]
    fn new_request_is_pending() {
        let r = request();
        assert!(r.is_pending());
        assert!(r.resolved_at().is_none());
        assert!(r.resolution().outcome().is_none());
    }

    #[test]
    fn resolve_is_single_shot() {
        let mut r = request();
        r.resolve(ApprovalOutcome::Approved, Some("reviewer-1".into()), None)
            .unwrap();
        assert_eq!(r.resolution().outcome(), Some(ApprovalOutcome::Approved));
        assert!(r.resolved_at().is_some());

        let err = r
            .resolve(ApprovalOutcome::Rejected, None, None)
            .unwrap_err();
        assert_eq!(err, ApprovalOutcome::Approved);
        assert_eq!(r.resolution().outcome(), Some(ApprovalOutcome::Approved));
    }

    #[test]
    fn resolution_serializes_with_status_tag() {
        let mut r = request();
        let pending = serde_json::to_value(r.resolution()).unwrap();
        assert_eq!(pending, serde_json::json!({"status": "Pending"}));

        r.resolve(ApprovalOutcome::Rejected, Some("ops".into()), Some("sensor glitch".into()))
            .unwrap();
        let v = serde_json::to_value(r.resolution()).unwrap();
        assert_eq!(v["status"], "Rejected");
        assert_eq!(v["reviewer"], "ops");
        assert_eq!(v["note"], "sensor glitch");
    }
}
