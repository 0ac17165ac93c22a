//! # Evaluate Subcommand
//!
//! Runs one incident through the whole pipeline in-process: threshold
//! agents, the policy engine, and either the in-memory ledger or a
//! filesystem CAS. Held incidents stop at `AwaitingApproval`; there is no
//! reviewer in a one-shot run.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use triage_api::bootstrap::build_pipeline;
use triage_api::config::{LedgerBackend, PipelineConfig};
use triage_core::Confidence;
use triage_policy::PolicyConfig;

/// Arguments for `triage evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Path to the incident JSON file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Commit reported incidents to a filesystem CAS rooted here.
    #[arg(long, value_name = "DIR")]
    pub ledger_dir: Option<PathBuf>,

    /// Primary agent deadline in milliseconds.
    #[arg(long)]
    pub primary_timeout_ms: Option<u64>,

    /// Primary confidence below which the fallback is consulted.
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Minimum confidence for AutoReport, inclusive.
    #[arg(long)]
    pub report_threshold: Option<f64>,
}

impl EvaluateArgs {
    /// Defaults overlaid with the flags that were given.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::default();
        if let Some(ms) = self.primary_timeout_ms {
            config.dispatch.primary_timeout = Duration::from_millis(ms);
        }
        if let Some(min) = self.min_confidence {
            config.dispatch.min_confidence_for_fallback =
                Confidence::new(min).context("invalid --min-confidence")?;
        }
        if let Some(threshold) = self.report_threshold {
            config.policy = PolicyConfig::new(threshold).context("invalid --report-threshold")?;
        }
        if let Some(dir) = &self.ledger_dir {
            config.ledger = LedgerBackend::Cas(dir.clone());
        }
        Ok(config)
    }
}

/// Evaluate the incident and print the outcome as JSON.
pub fn run_evaluate(args: &EvaluateArgs) -> Result<u8> {
    let incident = crate::read_incident(&args.file)?;
    let pipeline = build_pipeline(&args.pipeline_config()?)?;

    let outcome = crate::runtime()?
        .block_on(pipeline.submit_incident(incident))
        .context("pipeline failed")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(0)
}
