//! # Decide Subcommand
//!
//! Runs the policy engine on an analysis file. Accepts either a full
//! analysis (with `agents_used`, `fallback_active`) or a bare agent
//! assessment, which is treated as a primary-only analysis.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use triage_core::{Analysis, Assessment};
use triage_policy::{Decision, PolicyConfig, PolicyEngine};

/// Arguments for `triage decide`.
#[derive(Args, Debug)]
pub struct DecideArgs {
    /// Path to the analysis JSON file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Minimum confidence for AutoReport, inclusive.
    #[arg(long, default_value_t = 0.90)]
    pub report_threshold: f64,
}

/// Print the decision for the analysis.
pub fn run_decide(args: &DecideArgs) -> Result<u8> {
    let analysis = read_analysis(&args.file)?;
    let decision = decide(&analysis, args.report_threshold)?;
    println!("{decision}");
    Ok(0)
}

/// Decision for `analysis` under `report_threshold`.
pub fn decide(analysis: &Analysis, report_threshold: f64) -> Result<Decision> {
    let config = PolicyConfig::new(report_threshold).context("invalid --report-threshold")?;
    Ok(PolicyEngine::new(config).decide(analysis))
}

fn read_analysis(path: &Path) -> Result<Analysis> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse JSON: {}", path.display()))?;
    if value.get("agents_used").is_some() {
        return serde_json::from_value(value)
            .with_context(|| format!("invalid analysis: {}", path.display()));
    }
    let assessment: Assessment = serde_json::from_value(value)
        .with_context(|| format!("invalid assessment: {}", path.display()))?;
    Ok(Analysis::from_primary(assessment))
}
