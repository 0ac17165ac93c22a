//! # triage CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use triage_cli::decide::{run_decide, DecideArgs};
use triage_cli::evaluate::{run_evaluate, EvaluateArgs};
use triage_cli::fingerprint::{run_fingerprint, FingerprintArgs};
use triage_cli::ledger::{run_ledger, LedgerArgs};

/// Incident triage operator CLI.
///
/// Fingerprints incidents, applies the report policy, runs the triage
/// pipeline in-process, and inspects committed ledger payloads.
#[derive(Parser, Debug)]
#[command(name = "triage", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the deterministic fingerprint of an incident.
    Fingerprint(FingerprintArgs),

    /// Print the policy decision for an analysis.
    Decide(DecideArgs),

    /// Run an incident through the full pipeline and print the outcome.
    Evaluate(EvaluateArgs),

    /// Inspect committed ledger payloads.
    Ledger(LedgerArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Fingerprint(args) => run_fingerprint(&args),
        Commands::Decide(args) => run_decide(&args),
        Commands::Evaluate(args) => run_evaluate(&args),
        Commands::Ledger(args) => run_ledger(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
