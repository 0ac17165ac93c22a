//! # Pipeline Bootstrap
//!
//! Turns a [`PipelineConfig`] into a running [`Pipeline`]: picks the
//! primary agent (remote service or threshold rules), the fallback
//! (always threshold rules) and the ledger collaborator.

use std::sync::Arc;

use triage_agents::{Agent, Dispatcher, HttpAgent, HttpAgentConfig, ThresholdAgent};
use triage_ledger::{CasStore, InMemoryLedger, LedgerClient, LedgerWriter, PinningClient};
use triage_policy::PolicyEngine;

use crate::config::{ConfigError, LedgerBackend, PipelineConfig};
use crate::orchestration::Pipeline;

/// Agent names as they appear in traces and the audit trail.
pub const PRIMARY_AGENT_NAME: &str = "primary";
pub const FALLBACK_AGENT_NAME: &str = "threshold-fallback";

/// Threshold agents, in-memory ledger, default thresholds.
pub fn default_pipeline() -> Pipeline {
    let defaults = PipelineConfig::default();
    Pipeline::new(
        Dispatcher::new(
            Arc::new(ThresholdAgent::new(PRIMARY_AGENT_NAME)),
            Arc::new(ThresholdAgent::new(FALLBACK_AGENT_NAME)),
            defaults.dispatch,
        ),
        PolicyEngine::new(defaults.policy),
        LedgerWriter::new(Arc::new(InMemoryLedger::new())),
        defaults.retry,
    )
}

/// Build the pipeline described by `config`.
pub fn build_pipeline(config: &PipelineConfig) -> Result<Pipeline, ConfigError> {
    let primary: Arc<dyn Agent> = match &config.primary_agent_url {
        Some(url) => {
            tracing::info!(url = %url, "primary agent: remote analysis service");
            Arc::new(
                HttpAgent::new(PRIMARY_AGENT_NAME, HttpAgentConfig::new(url.clone()))
                    .map_err(|e| ConfigError::Agent(e.to_string()))?,
            )
        }
        None => {
            tracing::info!("primary agent: threshold rules");
            Arc::new(ThresholdAgent::new(PRIMARY_AGENT_NAME))
        }
    };
    let fallback: Arc<dyn Agent> = Arc::new(ThresholdAgent::new(FALLBACK_AGENT_NAME));

    let client: Arc<dyn LedgerClient> = match &config.ledger {
        LedgerBackend::Memory => {
            tracing::warn!("ledger: in-memory; records are lost on restart");
            Arc::new(InMemoryLedger::new())
        }
        LedgerBackend::Cas(root) => {
            tracing::info!(root = %root.display(), "ledger: filesystem CAS");
            Arc::new(CasStore::new(root.clone()))
        }
        LedgerBackend::Pinning(pinning) => {
            tracing::info!(base_url = %pinning.base_url, "ledger: pinning service");
            Arc::new(PinningClient::new(pinning.clone())?)
        }
    };

    Ok(Pipeline::new(
        Dispatcher::new(primary, fallback, config.dispatch),
        PolicyEngine::new(config.policy),
        LedgerWriter::new(client),
        config.retry,
    ))
}
