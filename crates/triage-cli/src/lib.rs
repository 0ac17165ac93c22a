//! # triage-cli — Operator Command-Line Interface
//!
//! ## Subcommands
//!
//! - `fingerprint` — deterministic fingerprint of an incident file
//! - `decide` — policy decision for an analysis file
//! - `evaluate` — run the full pipeline in-process on an incident file
//! - `ledger show` — read a committed payload back from a filesystem CAS
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to the domain crates and return an exit code.

pub mod decide;
pub mod evaluate;
pub mod fingerprint;
pub mod ledger;

use std::path::Path;

use anyhow::{Context, Result};
use triage_api::routes::incidents::SubmitIncidentRequest;
use triage_core::Incident;

/// Read and validate an incident JSON file.
///
/// Accepts the same field names as `POST /v1/incidents`.
pub fn read_incident(path: &Path) -> Result<Incident> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let request: SubmitIncidentRequest = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse incident JSON: {}", path.display()))?;
    request
        .into_incident()
        .with_context(|| format!("invalid incident: {}", path.display()))
}

/// Current-thread runtime for the async handlers.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
