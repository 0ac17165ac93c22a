//! # triage-core — Foundational Types for the Triage Pipeline
//!
//! Every other crate in the workspace depends on `triage-core`; it depends
//! on nothing internal. It defines the data that flows through the pipeline
//! (`Incident → Analysis`) and the primitives that make incidents
//! idempotence-safe.
//!
//! ## Key Design Principles
//!
//! 1. **Validated constructors.** An [`Incident`] can only be built through
//!    [`Incident::new`] (or deserialized through it), so malformed input is
//!    rejected before dispatch with a [`ValidationError`].
//!
//! 2. **Floats never reach a digest.** The fingerprint is computed over a
//!    [`NormalizedIncident`] in which confidence is basis points and
//!    coordinates are microdegrees. [`CanonicalBytes`] rejects floats, so a
//!    forgotten normalization step fails loudly instead of producing an
//!    unstable hash.
//!
//! 3. **`sha256_digest()` accepts only `&CanonicalBytes`.** All digests flow
//!    through canonicalization.
//!
//! 4. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `triage-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod analysis;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod incident;
pub mod temporal;

pub use analysis::{AgentRole, Analysis, Assessment, Severity};
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, ValidationError};
pub use incident::{
    Confidence, Coordinates, DisasterType, EvidenceRef, Fingerprint, Incident, NormalizedIncident,
    SectorId,
};
pub use temporal::Timestamp;
