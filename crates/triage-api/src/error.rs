//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps pipeline errors to HTTP status codes and a JSON body
//! `{ "error": { "code", "message", "details"? } }`. Internal error
//! details never reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use triage_core::ValidationError;
use triage_state::ApprovalError;

use crate::orchestration::PipelineError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "ALREADY_RESOLVED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context: the agent trace for analysis failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Submitted incident is malformed (422).
    #[error("invalid incident: {0}")]
    InvalidIncident(String),

    /// Path parameter or request body failed validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient role (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current incident state (409).
    #[error("conflict: {message}")]
    Conflict {
        /// Specific conflict kind.
        code: &'static str,
        /// Description.
        message: String,
    },

    /// Neither agent produced an analysis (503).
    #[error("analysis unavailable: {message}")]
    AnalysisUnavailable {
        /// Description.
        message: String,
        /// Agent attempt trace.
        trace: serde_json::Value,
    },

    /// Ledger write failed after retries (502).
    #[error("ledger write failed: {0}")]
    WriteFailed(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::InvalidIncident(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_INCIDENT"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict { code, .. } => (StatusCode::CONFLICT, code),
            Self::AnalysisUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "ANALYSIS_UNAVAILABLE")
            }
            Self::WriteFailed(_) => (StatusCode::BAD_GATEWAY, "WRITE_FAILED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let details = match self {
            Self::AnalysisUnavailable { trace, .. } => Some(trace),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl AppError {
    /// Reclassify a validation failure as one about the submitted incident.
    pub fn for_incident(self) -> Self {
        match self {
            Self::Validation(message) => Self::InvalidIncident(message),
            other => other,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidIncident(e) => Self::InvalidIncident(e.to_string()),
            PipelineError::Canonicalization(e) => Self::InvalidIncident(e.to_string()),
            PipelineError::AnalysisUnavailable(e) => Self::AnalysisUnavailable {
                trace: serde_json::to_value(e.trace()).unwrap_or(serde_json::Value::Null),
                message: e.to_string(),
            },
            PipelineError::Approval(e) => match &e {
                ApprovalError::NotFound { .. } => Self::NotFound(e.to_string()),
                ApprovalError::AlreadyPending { .. } => Self::Conflict {
                    code: "ALREADY_PENDING",
                    message: e.to_string(),
                },
                ApprovalError::AlreadyResolved { .. } => Self::Conflict {
                    code: "ALREADY_RESOLVED",
                    message: e.to_string(),
                },
            },
            PipelineError::Ledger(e) => Self::WriteFailed(e.to_string()),
            PipelineError::Lifecycle(e) => Self::Conflict {
                code: "INVALID_TRANSITION",
                message: e.to_string(),
            },
            e @ PipelineError::InProgress { .. } => Self::Conflict {
                code: "IN_PROGRESS",
                message: e.to_string(),
            },
            e @ PipelineError::NotFound(_) => Self::NotFound(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use triage_core::Fingerprint;
    use triage_ledger::{LedgerError, LedgerWriteError};
    use triage_state::{ApprovalOutcome, IncidentState};

    fn fp() -> Fingerprint {
        Fingerprint::parse(&"c".repeat(64)).unwrap()
    }

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn approval_errors_map_to_404_and_409() {
        let not_found = AppError::from(PipelineError::Approval(ApprovalError::NotFound {
            fingerprint: fp(),
        }));
        assert_eq!(not_found.status_and_code(), (StatusCode::NOT_FOUND, "NOT_FOUND"));

        let resolved = AppError::from(PipelineError::Approval(ApprovalError::AlreadyResolved {
            fingerprint: fp(),
            outcome: ApprovalOutcome::Approved,
        }));
        assert_eq!(
            resolved.status_and_code(),
            (StatusCode::CONFLICT, "ALREADY_RESOLVED")
        );

        let pending = AppError::from(PipelineError::Approval(ApprovalError::AlreadyPending {
            fingerprint: fp(),
        }));
        assert_eq!(pending.status_and_code(), (StatusCode::CONFLICT, "ALREADY_PENDING"));
    }

    #[test]
    fn in_progress_is_conflict() {
        let err = AppError::from(PipelineError::InProgress {
            fingerprint: fp(),
            state: IncidentState::Analyzing,
        });
        assert_eq!(err.status_and_code(), (StatusCode::CONFLICT, "IN_PROGRESS"));
    }

    #[test]
    fn ledger_failure_is_bad_gateway() {
        let err = AppError::from(PipelineError::Ledger(LedgerWriteError::WriteFailed {
            fingerprint: fp(),
            source: LedgerError::Network("reset".into()),
        }));
        assert_eq!(err.status_and_code(), (StatusCode::BAD_GATEWAY, "WRITE_FAILED"));
    }

    #[test]
    fn invalid_incident_is_unprocessable() {
        let err = AppError::from(PipelineError::InvalidIncident(ValidationError::EmptySector));
        assert_eq!(
            err.status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_INCIDENT")
        );
    }

    #[test]
    fn non_incident_validation_uses_generic_code() {
        let bad_path = AppError::from(ValidationError::InvalidFingerprint("xyz".into()));
        assert_eq!(
            bad_path.status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
        );
        assert_eq!(
            bad_path.for_incident().status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_INCIDENT")
        );
        let conflict = AppError::Conflict {
            code: "IN_PROGRESS",
            message: "busy".into(),
        };
        assert!(matches!(conflict.for_incident(), AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn analysis_unavailable_carries_trace_details() {
        let err = AppError::AnalysisUnavailable {
            message: "both agents failed".into(),
            trace: serde_json::json!([{"role": "primary", "outcome": "timed_out"}]),
        };
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error.code, "ANALYSIS_UNAVAILABLE");
        assert_eq!(body.error.details.unwrap()[0]["outcome"], "timed_out");
    }

    #[tokio::test]
    async fn internal_message_is_not_exposed() {
        let (status, body) = response_parts(AppError::Internal("lock poisoned".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }
}
