//! # Primary → Fallback Dispatch
//!
//! ```text
//!   primary ──ok, conf ≥ min──▶ Analysis { agents: {primary}, fallback: false }
//!      │
//!      ├─ error
//!      ├─ timeout (future dropped)
//!      └─ conf < min
//!             │
//!          fallback ──ok──▶ Analysis { agents: {primary, fallback}, fallback: true }
//!             │
//!             └─ error / timeout ──▶ DispatchError::AnalysisUnavailable
//! ```
//!
//! The fallback's verdict replaces the primary's entirely and is not
//! re-checked against the confidence floor. There is exactly one fallback;
//! a failing fallback is terminal.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use triage_core::{AgentRole, Analysis, Assessment, Confidence, Incident};

use crate::agent::{Agent, AgentError, Deadline};

/// Default primary timeout.
pub const DEFAULT_PRIMARY_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Default minimum primary confidence before the fallback is consulted.
pub const DEFAULT_MIN_CONFIDENCE_FOR_FALLBACK: f64 = 0.85;

/// Dispatch tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    /// Deadline for the primary agent.
    pub primary_timeout: Duration,
    /// Deadline for the fallback agent. `None` means no deadline.
    pub fallback_timeout: Option<Duration>,
    /// Primary results strictly below this confidence trigger the fallback.
    pub min_confidence_for_fallback: Confidence,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            primary_timeout: DEFAULT_PRIMARY_TIMEOUT,
            fallback_timeout: None,
            min_confidence_for_fallback: Confidence::from_basis_points(8_500),
        }
    }
}

/// How one agent attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Returned an assessment that was used.
    Succeeded,
    /// Returned an assessment below the confidence floor.
    LowConfidence,
    /// Exceeded its deadline.
    TimedOut,
    /// Returned an error.
    Failed,
}

impl AttemptOutcome {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::LowConfidence => "low_confidence",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured record of a single agent call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptTrace {
    /// Slot the agent occupied.
    pub role: AgentRole,
    /// Agent name.
    pub agent: String,
    /// How the call ended.
    pub outcome: AttemptOutcome,
    /// Wall time spent, in milliseconds.
    pub latency_ms: u64,
    /// Returned confidence in basis points, when an assessment came back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_bps: Option<u32>,
    /// Error text for failed or timed-out calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Successful dispatch result.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Final verdict.
    pub analysis: Analysis,
    /// Every attempt, in call order.
    pub trace: Vec<AttemptTrace>,
}

/// Terminal dispatch failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Neither agent produced a usable assessment.
    #[error("analysis unavailable: primary {primary}; fallback {fallback}")]
    AnalysisUnavailable {
        /// Why the primary was passed over.
        primary: String,
        /// Why the fallback failed.
        fallback: AgentError,
        /// Every attempt, in call order.
        trace: Vec<AttemptTrace>,
    },
}

impl DispatchError {
    /// Attempts made before giving up.
    pub fn trace(&self) -> &[AttemptTrace] {
        match self {
            Self::AnalysisUnavailable { trace, .. } => trace,
        }
    }
}

/// Orchestrates the primary and fallback agents.
#[derive(Clone)]
pub struct Dispatcher {
    primary: Arc<dyn Agent>,
    fallback: Arc<dyn Agent>,
    config: DispatchConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher over two agents.
    pub fn new(primary: Arc<dyn Agent>, fallback: Arc<dyn Agent>, config: DispatchConfig) -> Self {
        Self {
            primary,
            fallback,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Evaluate an incident.
    ///
    /// # Errors
    ///
    /// [`DispatchError::AnalysisUnavailable`] when the fallback was needed
    /// and also failed. Never fabricates an analysis.
    pub async fn evaluate(&self, incident: &Incident) -> Result<Evaluation, DispatchError> {
        let mut trace = Vec::with_capacity(2);
        let floor = self.config.min_confidence_for_fallback;

        let (primary_result, latency_ms) = attempt(
            self.primary.as_ref(),
            incident,
            Some(self.config.primary_timeout),
        )
        .await;

        let passed_over = match primary_result {
            Ok(assessment) if assessment.confidence.value() >= floor.value() => {
                trace.push(record(
                    AgentRole::Primary,
                    self.primary.name(),
                    AttemptOutcome::Succeeded,
                    latency_ms,
                    Some(&assessment),
                    None,
                ));
                return Ok(Evaluation {
                    analysis: Analysis::from_primary(assessment),
                    trace,
                });
            }
            Ok(assessment) => {
                let reason = format!(
                    "confidence {} below minimum {}",
                    assessment.confidence, floor
                );
                trace.push(record(
                    AgentRole::Primary,
                    self.primary.name(),
                    AttemptOutcome::LowConfidence,
                    latency_ms,
                    Some(&assessment),
                    Some(reason.clone()),
                ));
                reason
            }
            Err(err) => {
                let outcome = if err.is_timeout() {
                    AttemptOutcome::TimedOut
                } else {
                    AttemptOutcome::Failed
                };
                trace.push(record(
                    AgentRole::Primary,
                    self.primary.name(),
                    outcome,
                    latency_ms,
                    None,
                    Some(err.to_string()),
                ));
                err.to_string()
            }
        };

        tracing::warn!(
            primary = %self.primary.name(),
            fallback = %self.fallback.name(),
            reason = %passed_over,
            "primary agent passed over; invoking fallback"
        );

        let (fallback_result, latency_ms) =
            attempt(self.fallback.as_ref(), incident, self.config.fallback_timeout).await;

        match fallback_result {
            Ok(assessment) => {
                trace.push(record(
                    AgentRole::Fallback,
                    self.fallback.name(),
                    AttemptOutcome::Succeeded,
                    latency_ms,
                    Some(&assessment),
                    None,
                ));
                Ok(Evaluation {
                    analysis: Analysis::from_assessment(
                        assessment,
                        BTreeSet::from([AgentRole::Primary, AgentRole::Fallback]),
                        true,
                    ),
                    trace,
                })
            }
            Err(err) => {
                let outcome = if err.is_timeout() {
                    AttemptOutcome::TimedOut
                } else {
                    AttemptOutcome::Failed
                };
                trace.push(record(
                    AgentRole::Fallback,
                    self.fallback.name(),
                    outcome,
                    latency_ms,
                    None,
                    Some(err.to_string()),
                ));
                tracing::error!(
                    primary_reason = %passed_over,
                    fallback_error = %err,
                    "analysis unavailable: both agents failed"
                );
                Err(DispatchError::AnalysisUnavailable {
                    primary: passed_over,
                    fallback: err,
                    trace,
                })
            }
        }
    }
}

/// Run one agent under an optional timeout. On timeout the agent's future is
/// dropped, cancelling its in-flight work.
async fn attempt(
    agent: &dyn Agent,
    incident: &Incident,
    timeout: Option<Duration>,
) -> (Result<Assessment, AgentError>, u64) {
    let started = Instant::now();
    let result = match timeout {
        Some(limit) => {
            match tokio::time::timeout(limit, agent.analyze(incident, Deadline::after(limit))).await
            {
                Ok(result) => result,
                Err(_) => Err(AgentError::Timeout {
                    agent: agent.name().to_string(),
                    after_ms: limit.as_millis() as u64,
                }),
            }
        }
        None => agent.analyze(incident, Deadline::unbounded()).await,
    };
    (result, started.elapsed().as_millis() as u64)
}

fn record(
    role: AgentRole,
    agent: &str,
    outcome: AttemptOutcome,
    latency_ms: u64,
    assessment: Option<&Assessment>,
    detail: Option<String>,
) -> AttemptTrace {
    let confidence_bps = assessment.map(|a| a.confidence.basis_points());
    tracing::info!(
        role = %role,
        agent = %agent,
        outcome = %outcome,
        latency_ms,
        confidence_bps = ?confidence_bps,
        "agent attempt"
    );
    AttemptTrace {
        role,
        agent: agent.to_string(),
        outcome,
        latency_ms,
        confidence_bps,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAgent;
    use triage_core::{DisasterType, Severity};

    fn incident() -> Incident {
        Incident::new(DisasterType::Flood, "Sector-2", None, 0.6, None).unwrap()
    }

    fn assessment(severity: Severity, confidence: f64) -> Assessment {
        Assessment {
            severity,
            confidence: Confidence::new(confidence).unwrap(),
            reasoning: "scripted".into(),
            recommended_actions: vec![],
        }
    }

    fn dispatcher(primary: MockAgent, fallback: MockAgent) -> Dispatcher {
        Dispatcher::new(Arc::new(primary), Arc::new(fallback), DispatchConfig::default())
    }

    #[test]
    fn default_config() {
        let c = DispatchConfig::default();
        assert_eq!(c.primary_timeout, DEFAULT_PRIMARY_TIMEOUT);
        assert_eq!(c.fallback_timeout, None);
        assert_eq!(
            c.min_confidence_for_fallback.value(),
            DEFAULT_MIN_CONFIDENCE_FOR_FALLBACK
        );
    }

    #[tokio::test]
    async fn confident_primary_wins_alone() {
        let fallback = Arc::new(MockAgent::answering(
            "fallback",
            assessment(Severity::Clear, 1.0),
        ));
        let d = Dispatcher::new(
            Arc::new(MockAgent::answering("primary", assessment(Severity::Critical, 0.93))),
            fallback.clone(),
            DispatchConfig::default(),
        );
        let eval = d.evaluate(&incident()).await.unwrap();
        assert_eq!(eval.analysis.severity(), Severity::Critical);
        assert!(!eval.analysis.fallback_active());
        assert_eq!(eval.trace.len(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn primary_at_floor_is_not_low_confidence() {
        let d = dispatcher(
            MockAgent::answering("primary", assessment(Severity::Advisory, 0.85)),
            MockAgent::failing("fallback", "should not run"),
        );
        let eval = d.evaluate(&incident()).await.unwrap();
        assert!(!eval.analysis.fallback_active());
    }

    #[tokio::test]
    async fn low_confidence_primary_triggers_fallback() {
        let d = dispatcher(
            MockAgent::answering("primary", assessment(Severity::Critical, 0.70)),
            MockAgent::answering("fallback", assessment(Severity::Advisory, 0.60)),
        );
        let eval = d.evaluate(&incident()).await.unwrap();
        assert!(eval.analysis.fallback_active());
        // Fallback verdict is taken as-is, even below the floor.
        assert_eq!(eval.analysis.severity(), Severity::Advisory);
        assert_eq!(eval.analysis.confidence().value(), 0.60);
        assert_eq!(eval.trace[0].outcome, AttemptOutcome::LowConfidence);
        assert_eq!(eval.trace[0].confidence_bps, Some(7_000));
        assert_eq!(eval.trace[1].outcome, AttemptOutcome::Succeeded);
    }

    #[tokio::test]
    async fn failing_primary_triggers_fallback() {
        let d = dispatcher(
            MockAgent::failing("primary", "upstream 500"),
            MockAgent::answering("fallback", assessment(Severity::Clear, 0.99)),
        );
        let eval = d.evaluate(&incident()).await.unwrap();
        assert_eq!(
            eval.analysis.agents_used(),
            &BTreeSet::from([AgentRole::Primary, AgentRole::Fallback])
        );
        assert_eq!(eval.trace[0].outcome, AttemptOutcome::Failed);
        assert!(eval.trace[0].detail.as_deref().unwrap().contains("upstream 500"));
    }

    #[tokio::test]
    async fn both_failing_is_analysis_unavailable() {
        let d = dispatcher(
            MockAgent::failing("primary", "down"),
            MockAgent::failing("fallback", "also down"),
        );
        let err = d.evaluate(&incident()).await.unwrap_err();
        let DispatchError::AnalysisUnavailable {
            primary, fallback, ..
        } = &err;
        assert!(primary.contains("down"));
        assert_eq!(fallback, &AgentError::failure("fallback", "also down"));
        assert_eq!(err.trace().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_timeout_is_terminal_when_configured() {
        let config = DispatchConfig {
            fallback_timeout: Some(Duration::from_millis(500)),
            ..DispatchConfig::default()
        };
        let d = Dispatcher::new(
            Arc::new(MockAgent::failing("primary", "down")),
            Arc::new(
                MockAgent::answering("fallback", assessment(Severity::Clear, 1.0))
                    .with_delay(Duration::from_secs(1)),
            ),
            config,
        );
        let err = d.evaluate(&incident()).await.unwrap_err();
        let DispatchError::AnalysisUnavailable { fallback, .. } = err;
        assert!(fallback.is_timeout());
    }
}
