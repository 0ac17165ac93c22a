//! # API Route Modules
//!
//! - `incidents` — submission and lifecycle lookup.
//! - `approvals` — pending queue and reviewer resolution.
//! - `ledger` — committed ledger records.
//! - `audit` — pipeline audit trail.

pub mod approvals;
pub mod audit;
pub mod incidents;
pub mod ledger;
