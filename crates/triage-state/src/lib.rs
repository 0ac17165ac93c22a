//! # triage-state — Approval and Lifecycle State Machines
//!
//! ## Approval requests
//!
//! ```text
//! Pending ──resolve(Approved)──▶ Approved (terminal)
//!    │
//!    └──resolve(Rejected)──▶ Rejected (terminal)
//! ```
//!
//! [`Resolution`] is a tagged variant, not a flag, so a resolved request
//! has nowhere left to go. The [`ApprovalGate`] owns all requests, keyed by
//! fingerprint, and serializes access so that at most one request per
//! fingerprint is ever open.
//!
//! ## Incident lifecycle
//!
//! ```text
//! Received ──▶ Analyzing ──┬──▶ Cleared (terminal)
//!                          ├──▶ AwaitingApproval ──┬──▶ Reporting ──▶ Reported (terminal)
//!                          │                       └──▶ Closed (terminal)
//!                          ├──▶ Reporting ──▶ Reported (terminal)
//!                          └──▶ Failed (terminal)
//! Reporting ──▶ Failed (terminal)
//! ```
//!
//! [`IncidentLifecycle`] validates each transition and keeps an ordered log.

pub mod approval;
pub mod gate;
pub mod lifecycle;

pub use approval::{ApprovalOutcome, ApprovalRequest, Resolution, ResolutionDetails};
pub use gate::{ApprovalError, ApprovalGate, DEFAULT_HISTORY_CAPACITY};
pub use lifecycle::{IncidentLifecycle, IncidentState, LifecycleError, LifecycleTransition};
