//! Scripted agent for tests and demos.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use triage_core::{Assessment, Incident};

use crate::agent::{Agent, AgentError, Deadline};

#[derive(Debug, Clone)]
enum Script {
    Answer(Assessment),
    Fail(String),
}

/// Agent that sleeps for a fixed delay, then answers or fails as scripted.
///
/// Counts calls started and calls that ran to completion, so tests can
/// observe that a timed-out call was actually abandoned.
#[derive(Debug)]
pub struct MockAgent {
    name: String,
    script: Script,
    delay: Duration,
    started: AtomicUsize,
    completed: AtomicUsize,
}

impl MockAgent {
    /// Always returns `assessment`.
    pub fn answering(name: impl Into<String>, assessment: Assessment) -> Self {
        Self::scripted(name.into(), Script::Answer(assessment))
    }

    /// Always fails with `reason`.
    pub fn failing(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::scripted(name.into(), Script::Fail(reason.into()))
    }

    fn scripted(name: String, script: Script) -> Self {
        Self {
            name,
            script,
            delay: Duration::ZERO,
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Calls started.
    pub fn calls(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Calls that ran to completion (not dropped mid-flight).
    pub fn completions(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(
        &self,
        _incident: &Incident,
        _deadline: Deadline,
    ) -> Result<Assessment, AgentError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Answer(a) => Ok(a.clone()),
            Script::Fail(reason) => Err(AgentError::failure(&self.name, reason.clone())),
        }
    }
}
