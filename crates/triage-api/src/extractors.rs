//! # Custom Extractors & Validation
//!
//! JSON bodies are taken as `Result<Json<T>, JsonRejection>` so that
//! rejections use the structured error body. Syntactically broken JSON is
//! a 400; well-formed JSON with the wrong shape or values is a 422.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use triage_core::Fingerprint;

use crate::error::AppError;

/// Request types with rules beyond what serde checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping rejections to [`AppError`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result.map(|Json(v)| v).map_err(|err| match err {
        JsonRejection::JsonDataError(e) => AppError::Validation(e.body_text()),
        other => AppError::BadRequest(other.body_text()),
    })
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parse a fingerprint path segment.
pub fn parse_fingerprint(raw: &str) -> Result<Fingerprint, AppError> {
    Fingerprint::parse(raw).map_err(AppError::from)
}
