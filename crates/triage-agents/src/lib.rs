//! # triage-agents — Analysis Agents and Dispatch
//!
//! An [`Agent`] turns an [`Incident`](triage_core::Incident) into an
//! [`Assessment`](triage_core::Assessment) before a caller-supplied
//! [`Deadline`]. The [`Dispatcher`] consults a primary agent and, when the
//! primary fails, times out, or is not confident enough, a fallback agent.
//!
//! ## Agents
//!
//! - [`ThresholdAgent`]: rule-based severity from disaster type and observed
//!   confidence. Never fails.
//! - [`HttpAgent`]: remote analysis service (`POST /analyze-incident`).
//! - [`MockAgent`]: scripted delay / failure, for tests and demos.
//!
//! ## Cancellation
//!
//! The dispatcher enforces deadlines with `tokio::time::timeout`. When the
//! timer fires, the agent's future is dropped, which cancels any in-flight
//! I/O it owns. Agents must therefore hold no state that outlives a dropped
//! future.

pub mod agent;
pub mod dispatcher;
pub mod heuristic;
pub mod mock;
pub mod remote;

pub use agent::{Agent, AgentError, Deadline};
pub use dispatcher::{
    AttemptOutcome, AttemptTrace, DispatchConfig, DispatchError, Dispatcher, Evaluation,
    DEFAULT_MIN_CONFIDENCE_FOR_FALLBACK, DEFAULT_PRIMARY_TIMEOUT,
};
pub use heuristic::ThresholdAgent;
pub use mock::MockAgent;
pub use remote::{HttpAgent, HttpAgentConfig};
