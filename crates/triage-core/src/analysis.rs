//! # Analysis
//!
//! An agent answers with an [`Assessment`]. The dispatcher wraps the winning
//! assessment into an [`Analysis`], adding provenance: which agents ran and
//! whether the fallback path was taken.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::incident::Confidence;

/// Severity verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Nothing actionable.
    Clear,
    /// Worth reporting, not life-threatening.
    Advisory,
    /// Immediate danger.
    Critical,
}

impl Severity {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Advisory => "Advisory",
            Self::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which slot an agent occupied in the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// First agent consulted.
    Primary,
    /// Consulted only when the primary fails, times out, or is unsure.
    Fallback,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// The raw verdict returned by a single agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Severity verdict.
    pub severity: Severity,
    /// Agent's confidence in the verdict.
    pub confidence: Confidence,
    /// Free-text justification.
    pub reasoning: String,
    /// Ordered list of suggested responses.
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}

/// The dispatcher's final verdict for one incident evaluation. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    severity: Severity,
    confidence: Confidence,
    reasoning: String,
    recommended_actions: Vec<String>,
    agents_used: BTreeSet<AgentRole>,
    fallback_active: bool,
}

impl Analysis {
    /// Wrap an agent's assessment with dispatch provenance.
    pub fn from_assessment(
        assessment: Assessment,
        agents_used: BTreeSet<AgentRole>,
        fallback_active: bool,
    ) -> Self {
        Self {
            severity: assessment.severity,
            confidence: assessment.confidence,
            reasoning: assessment.reasoning,
            recommended_actions: assessment.recommended_actions,
            agents_used,
            fallback_active,
        }
    }

    /// Analysis answered by the primary agent alone.
    pub fn from_primary(assessment: Assessment) -> Self {
        Self::from_assessment(assessment, BTreeSet::from([AgentRole::Primary]), false)
    }

    /// Severity verdict.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Confidence in the verdict.
    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// Free-text justification.
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Suggested responses, in order.
    pub fn recommended_actions(&self) -> &[String] {
        &self.recommended_actions
    }

    /// Agents that were invoked.
    pub fn agents_used(&self) -> &BTreeSet<AgentRole> {
        &self.agents_used
    }

    /// Whether the fallback agent produced this verdict.
    pub fn fallback_active(&self) -> bool {
        self.fallback_active
    }
}
