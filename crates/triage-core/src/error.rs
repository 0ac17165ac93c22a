//! # Error Types
//!
//! Errors raised by the foundational types. All use `thiserror`.
//!
//! - [`ValidationError`] is the `InvalidIncident` class: malformed input
//!   rejected before it ever reaches an agent.
//! - [`CanonicalizationError`] fails loudly when a value cannot be reduced
//!   to canonical bytes (most often: a float slipped past normalization).

use thiserror::Error;

/// An incident (or one of its fields) failed validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Sector identifier was empty after trimming.
    #[error("sector_id must not be empty")]
    EmptySector,

    /// Sector identifier exceeded the maximum length.
    #[error("sector_id must not exceed {max} characters (got {len})")]
    SectorTooLong {
        /// Maximum permitted length.
        max: usize,
        /// Actual length.
        len: usize,
    },

    /// Confidence was NaN, infinite, or outside `[0, 1]`.
    #[error("confidence must be a finite number in [0, 1], got {0}")]
    ConfidenceOutOfRange(f64),

    /// Latitude outside `[-90, 90]` or not finite.
    #[error("latitude must be within [-90, 90], got {0}")]
    LatitudeOutOfRange(f64),

    /// Longitude outside `[-180, 180]` or not finite.
    #[error("longitude must be within [-180, 180], got {0}")]
    LongitudeOutOfRange(f64),

    /// Evidence reference is not a URI with a scheme.
    #[error("evidence_ref must be a URI with a scheme (e.g. ipfs://, neofs://, https://), got {0:?}")]
    InvalidEvidenceRef(String),

    /// Timestamp string is not RFC 3339 UTC with a `Z` suffix.
    #[error("timestamp must be RFC 3339 UTC with Z suffix: {0}")]
    InvalidTimestamp(String),

    /// Fingerprint string is not 64 lowercase hex characters.
    #[error("fingerprint must be 64 lowercase hex characters, got {0:?}")]
    InvalidFingerprint(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Confidence and coordinates must be normalized to integers first.
    #[error("float values are not permitted in canonical representations; normalize to integers first: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
