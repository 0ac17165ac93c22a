//! # Fingerprint Subcommand

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

/// Arguments for `triage fingerprint`.
#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// Path to the incident JSON file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Print the incident's fingerprint.
pub fn run_fingerprint(args: &FingerprintArgs) -> Result<u8> {
    let incident = crate::read_incident(&args.file)?;
    println!("{}", incident.fingerprint()?);
    Ok(0)
}
