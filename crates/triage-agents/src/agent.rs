//! The agent contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use triage_core::{Assessment, Incident};

/// Why a single agent call produced no assessment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The call exceeded its deadline and was abandoned.
    #[error("agent '{agent}' timed out after {after_ms}ms")]
    Timeout {
        /// Agent name.
        agent: String,
        /// Deadline that elapsed.
        after_ms: u64,
    },

    /// The agent returned an error or an unusable response.
    #[error("agent '{agent}' failed: {reason}")]
    Failure {
        /// Agent name.
        agent: String,
        /// Human-readable cause.
        reason: String,
    },
}

impl AgentError {
    /// Shorthand for a [`AgentError::Failure`].
    pub fn failure(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failure {
            agent: agent.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Point in time by which an agent must answer.
///
/// An unbounded deadline never expires. Agents that talk to the network
/// should pass [`Deadline::remaining`] to their transport so that the
/// request itself is bounded, not just the future awaiting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// Deadline `after` from now.
    pub fn after(after: Duration) -> Self {
        Self {
            at: Some(Instant::now() + after),
        }
    }

    /// A deadline that never expires.
    pub fn unbounded() -> Self {
        Self { at: None }
    }

    /// The absolute instant, if bounded.
    pub fn instant(&self) -> Option<Instant> {
        self.at
    }

    /// Time left, or `None` if unbounded. Saturates at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }
}

/// A decision function over incidents.
///
/// Implementations must be cancel-safe: the dispatcher drops the returned
/// future when the deadline passes.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable name used in traces and errors.
    fn name(&self) -> &str;

    /// Assess an incident before `deadline`.
    async fn analyze(&self, incident: &Incident, deadline: Deadline)
        -> Result<Assessment, AgentError>;
}

#[async_trait]
impl<A: Agent + ?Sized> Agent for Arc<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn analyze(
        &self,
        incident: &Incident,
        deadline: Deadline,
    ) -> Result<Assessment, AgentError> {
        (**self).analyze(incident, deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_expires_with_virtual_time() {
        let d = Deadline::after(Duration::from_millis(100));
        assert!(!d.is_expired());
        assert_eq!(d.remaining(), Some(Duration::from_millis(100)));
        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(d.is_expired());
        assert_eq!(d.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn unbounded_never_expires() {
        let d = Deadline::unbounded();
        assert!(!d.is_expired());
        assert!(d.remaining().is_none());
    }

    #[test]
    fn error_display() {
        let e = AgentError::Timeout {
            agent: "primary".into(),
            after_ms: 2000,
        };
        assert_eq!(e.to_string(), "agent 'primary' timed out after 2000ms");
        assert!(e.is_timeout());
        assert!(!AgentError::failure("x", "boom").is_timeout());
    }
}
