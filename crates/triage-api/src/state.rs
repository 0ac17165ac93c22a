//! # Application State
//!
//! Shared state handed to every handler. The pipeline owns all mutable
//! stores; `AppState` is a cheap clone around it.

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::bootstrap::default_pipeline;
use crate::orchestration::Pipeline;

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token`.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

impl AppConfig {
    /// Load `PORT` (default 8080) and `AUTH_TOKEN` (unset disables auth).
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            auth_token: std::env::var("AUTH_TOKEN").ok().map(Zeroizing::new),
        }
    }
}

/// State shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: AppConfig,
}

impl AppState {
    /// Default pipeline (threshold agents, in-memory ledger), auth disabled.
    pub fn new() -> Self {
        Self::with_pipeline(default_pipeline(), AppConfig::default())
    }

    /// State around an existing pipeline.
    pub fn with_pipeline(pipeline: Pipeline, config: AppConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
