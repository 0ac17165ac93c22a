//! # HTTP Agent
//!
//! Delegates analysis to a remote service.
//!
//! ```text
//! POST {base_url}/analyze-incident
//! { "incident": { …Incident… } }
//!
//! 200 OK
//! { "analysis": { "severity", "confidence", "reasoning", "recommended_actions" }, … }
//! ```
//!
//! Unknown response fields are ignored. The request timeout is taken from
//! the caller's deadline, so the connection is torn down when the deadline
//! passes even if the dispatcher's own timer has not fired yet.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use triage_core::{Assessment, Incident};
use url::Url;

use crate::agent::{Agent, AgentError, Deadline};

const ANALYZE_PATH: &str = "analyze-incident";

/// Connection settings for an [`HttpAgent`].
#[derive(Debug, Clone)]
pub struct HttpAgentConfig {
    /// Service root. A trailing slash is added if missing.
    pub base_url: Url,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
}

impl HttpAgentConfig {
    /// Config with a 2 second connect timeout.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            connect_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    incident: &'a Incident,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    analysis: Assessment,
}

/// Agent backed by a remote analysis endpoint.
#[derive(Debug, Clone)]
pub struct HttpAgent {
    name: String,
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpAgent {
    /// Build an agent. Fails only if the HTTP client or URL is unusable.
    pub fn new(name: impl Into<String>, config: HttpAgentConfig) -> Result<Self, AgentError> {
        let name = name.into();
        let mut base = config.base_url;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(ANALYZE_PATH)
            .map_err(|e| AgentError::failure(&name, format!("invalid base URL: {e}")))?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AgentError::failure(&name, format!("HTTP client init: {e}")))?;
        Ok(Self {
            name,
            http,
            endpoint,
        })
    }

    /// Full analysis endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Agent for HttpAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(
        &self,
        incident: &Incident,
        deadline: Deadline,
    ) -> Result<Assessment, AgentError> {
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .json(&AnalyzeRequest { incident });
        let budget = deadline.remaining();
        if let Some(budget) = budget {
            if budget.is_zero() {
                return Err(AgentError::Timeout {
                    agent: self.name.clone(),
                    after_ms: 0,
                });
            }
            request = request.timeout(budget);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::Timeout {
                    agent: self.name.clone(),
                    after_ms: budget.map(|b| b.as_millis() as u64).unwrap_or(0),
                }
            } else {
                AgentError::failure(&self.name, format!("transport error: {e}"))
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(agent = %self.name, status = status.as_u16(), "analysis service returned error status");
            return Err(AgentError::failure(
                &self.name,
                format!("analysis service returned {status}: {body}"),
            ));
        }

        let parsed: AnalyzeResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::failure(&self.name, format!("malformed response: {e}")))?;
        Ok(parsed.analysis)
    }
}
