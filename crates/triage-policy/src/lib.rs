//! # triage-policy — Decision Policy and Audit Trail
//!
//! Maps an [`Analysis`](triage_core::Analysis) to a [`Decision`]:
//!
//! | Severity | Confidence | Decision |
//! |----------|------------|----------|
//! | Clear | any | `AutoClear` |
//! | Advisory / Critical | `≥ report_threshold` | `AutoReport` |
//! | Advisory / Critical | `< report_threshold` | `HoldForReview` |
//!
//! The engine is pure: no I/O, no clock, no interior mutability. Decisions
//! are never persisted; they are recomputed from the analysis on demand.
//!
//! The [`audit`] module holds the bounded trail of pipeline events that the
//! orchestration layer appends to.

pub mod audit;
pub mod decision;

pub use audit::{AuditEntry, AuditEntryType, AuditTrail};
pub use decision::{Decision, PolicyConfig, PolicyEngine, PolicyError};
