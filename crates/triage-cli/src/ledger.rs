//! # Ledger Subcommand
//!
//! Reads committed payloads back from a filesystem CAS. Every read
//! recomputes the digest; a tampered file is an error, not output.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use triage_ledger::{CasStore, ContentAddress};

/// Arguments for `triage ledger`.
#[derive(Args, Debug)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub command: LedgerCommand,
}

/// Ledger subcommands.
#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Print a committed payload.
    Show {
        /// Root of the filesystem CAS.
        #[arg(long, value_name = "DIR")]
        ledger_dir: PathBuf,
        /// Content address, `sha256:<hex>`.
        #[arg(value_name = "ADDRESS")]
        address: String,
    },
}

/// Execute the ledger subcommand.
pub fn run_ledger(args: &LedgerArgs) -> Result<u8> {
    match &args.command {
        LedgerCommand::Show {
            ledger_dir,
            address,
        } => cmd_show(ledger_dir.clone(), address),
    }
}

fn cmd_show(ledger_dir: PathBuf, address: &str) -> Result<u8> {
    let store = CasStore::new(ledger_dir);
    let address = ContentAddress::new(address);
    if address.sha256_hex().is_none() {
        bail!("not a sha256 content address: {address}");
    }

    match crate::runtime()?.block_on(store.resolve_json(&address)) {
        Ok(Some(value)) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(0)
        }
        Ok(None) => {
            println!("NOT FOUND: {address}");
            Ok(1)
        }
        Err(e) => bail!("ledger read failed: {e}"),
    }
}
