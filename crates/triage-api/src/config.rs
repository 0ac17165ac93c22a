//! # Pipeline Configuration
//!
//! Everything tunable is read from the environment. Nothing in the
//! pipeline itself hardcodes a threshold, timeout or endpoint.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `TRIAGE_PRIMARY_TIMEOUT_MS` | 3000 |
//! | `TRIAGE_FALLBACK_TIMEOUT_MS` | unset (no deadline) |
//! | `TRIAGE_MIN_CONFIDENCE_FOR_FALLBACK` | 0.85 |
//! | `TRIAGE_REPORT_THRESHOLD` | 0.90 |
//! | `TRIAGE_LEDGER_COMMIT_ATTEMPTS` | 3 |
//! | `TRIAGE_LEDGER_RETRY_BASE_MS` | 200 |
//! | `TRIAGE_PRIMARY_AGENT_URL` | unset (threshold agent) |
//! | `TRIAGE_LEDGER_JWT` / `TRIAGE_LEDGER_URL` | pinning service |
//! | `TRIAGE_LEDGER_DIR` | filesystem CAS |
//!
//! Out-of-range values are errors, never clamped.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use triage_agents::{DispatchConfig, DEFAULT_PRIMARY_TIMEOUT};
use triage_core::{Confidence, ValidationError};
use triage_ledger::{PinningConfig, PinningConfigError};
use triage_policy::{PolicyConfig, PolicyError};
use url::Url;

use crate::orchestration::RetryPolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidInteger { var: String, value: String },
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: String, value: String },
    #[error("{var}: {source}")]
    Confidence {
        var: String,
        #[source]
        source: ValidationError,
    },
    #[error("TRIAGE_REPORT_THRESHOLD: {0}")]
    Policy(#[from] PolicyError),
    #[error("TRIAGE_LEDGER_COMMIT_ATTEMPTS must be at least 1")]
    ZeroAttempts,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("ledger: {0}")]
    Pinning(#[from] PinningConfigError),
    #[error("agent: {0}")]
    Agent(String),
}

/// Which ledger collaborator to commit to.
#[derive(Debug, Clone)]
pub enum LedgerBackend {
    /// Process-local map.
    Memory,
    /// Filesystem content-addressed store.
    Cas(PathBuf),
    /// HTTP pinning service.
    Pinning(PinningConfig),
}

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Agent dispatch tuning.
    pub dispatch: DispatchConfig,
    /// Decision thresholds.
    pub policy: PolicyConfig,
    /// Ledger commit retry policy.
    pub retry: RetryPolicy,
    /// Remote primary analysis service; threshold agent when `None`.
    pub primary_agent_url: Option<Url>,
    /// Ledger collaborator.
    pub ledger: LedgerBackend,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            policy: PolicyConfig::default(),
            retry: RetryPolicy::default(),
            primary_agent_url: None,
            ledger: LedgerBackend::Memory,
        }
    }
}

impl PipelineConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let primary_timeout = env_u64("TRIAGE_PRIMARY_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PRIMARY_TIMEOUT);
        let fallback_timeout = env_u64("TRIAGE_FALLBACK_TIMEOUT_MS")?.map(Duration::from_millis);
        let defaults = Self::default();

        let min_confidence_for_fallback = match env_f64("TRIAGE_MIN_CONFIDENCE_FOR_FALLBACK")? {
            Some(v) => Confidence::new(v).map_err(|source| ConfigError::Confidence {
                var: "TRIAGE_MIN_CONFIDENCE_FOR_FALLBACK".into(),
                source,
            })?,
            None => defaults.dispatch.min_confidence_for_fallback,
        };
        let policy = match env_f64("TRIAGE_REPORT_THRESHOLD")? {
            Some(v) => PolicyConfig::new(v)?,
            None => defaults.policy,
        };

        let attempts = match env_u64("TRIAGE_LEDGER_COMMIT_ATTEMPTS")? {
            Some(0) => return Err(ConfigError::ZeroAttempts),
            Some(n) => u32::try_from(n).map_err(|_| ConfigError::InvalidInteger {
                var: "TRIAGE_LEDGER_COMMIT_ATTEMPTS".into(),
                value: n.to_string(),
            })?,
            None => defaults.retry.attempts,
        };
        let base_delay = env_u64("TRIAGE_LEDGER_RETRY_BASE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.base_delay);

        let primary_agent_url = match std::env::var("TRIAGE_PRIMARY_AGENT_URL") {
            Ok(raw) => Some(Url::parse(&raw).map_err(|e| {
                ConfigError::InvalidUrl("TRIAGE_PRIMARY_AGENT_URL".into(), e.to_string())
            })?),
            Err(_) => None,
        };

        let ledger = if std::env::var("TRIAGE_LEDGER_JWT").is_ok() {
            LedgerBackend::Pinning(PinningConfig::from_env()?)
        } else if let Ok(dir) = std::env::var("TRIAGE_LEDGER_DIR") {
            LedgerBackend::Cas(PathBuf::from(dir))
        } else {
            LedgerBackend::Memory
        };

        Ok(Self {
            dispatch: DispatchConfig {
                primary_timeout,
                fallback_timeout,
                min_confidence_for_fallback,
            },
            policy,
            retry: RetryPolicy {
                attempts,
                base_delay,
            },
            primary_agent_url,
            ledger,
        })
    }
}

fn env_u64(var: &str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidInteger {
                var: var.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

fn env_f64(var: &str) -> Result<Option<f64>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber {
                var: var.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}
