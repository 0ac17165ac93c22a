//! # triage-ledger — Content-Addressed Incident Ledger
//!
//! The ledger is an append-only store that names every payload by its
//! content. Three collaborators implement the [`LedgerClient`] contract:
//!
//! - [`InMemoryLedger`]: process-local map, the default. Supports failure
//!   injection for tests.
//! - [`CasStore`]: filesystem store at `{root}/{kind}/{hex}.json`, verified
//!   on read.
//! - [`PinningClient`]: HTTP pinning service (`pinJSONToIPFS` /
//!   `pinFileToIPFS`), returning a CID.
//!
//! The [`LedgerWriter`] sits in front of a client and guarantees at most one
//! [`LedgerRecord`] per fingerprint: a repeat commit returns the existing
//! address without a second write. It never retries; that is the
//! orchestration layer's call.

pub mod address;
pub mod cas;
pub mod client;
pub mod error;
pub mod memory;
pub mod payload;
pub mod pinning;
pub mod writer;

pub use address::ContentAddress;
pub use cas::CasStore;
pub use client::LedgerClient;
pub use error::{LedgerError, LedgerWriteError};
pub use memory::InMemoryLedger;
pub use payload::{LedgerPayload, DEFAULT_REPORTER};
pub use pinning::{PinningClient, PinningConfig, PinningConfigError};
pub use writer::{LedgerRecord, LedgerWriter};
