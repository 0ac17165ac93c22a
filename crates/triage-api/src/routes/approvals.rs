//! # Approval API
//!
//! Reviewers list parked incidents and resolve them. Resolution is
//! single-shot: a second resolve for the same request is a 409.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use triage_state::{ApprovalOutcome, ApprovalRequest};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_fingerprint, Validate};
use crate::orchestration::PipelineOutcome;
use crate::state::AppState;

const MAX_NOTE_LEN: usize = 2_000;
const MAX_REVIEWER_LEN: usize = 255;

/// Reviewer verdict.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub outcome: ApprovalOutcome,
    #[serde(default)]
    pub reviewer: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Validate for ResolveRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(reviewer) = &self.reviewer {
            if reviewer.trim().is_empty() {
                return Err("reviewer must not be blank".to_string());
            }
            if reviewer.len() > MAX_REVIEWER_LEN {
                return Err(format!("reviewer must not exceed {MAX_REVIEWER_LEN} characters"));
            }
        }
        if self.note.as_ref().is_some_and(|n| n.len() > MAX_NOTE_LEN) {
            return Err(format!("note must not exceed {MAX_NOTE_LEN} characters"));
        }
        Ok(())
    }
}

/// Build the approvals router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/approvals", get(list_pending))
        .route("/v1/approvals/{fingerprint}/resolve", post(resolve))
}

/// GET /v1/approvals — pending requests, oldest first.
async fn list_pending(State(state): State<AppState>) -> Json<Vec<ApprovalRequest>> {
    Json(state.pipeline.pending_approvals())
}

/// POST /v1/approvals/{fingerprint}/resolve — reviewers only.
async fn resolve(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(fingerprint): Path<String>,
    body: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<PipelineOutcome>, AppError> {
    require_role(&caller, Role::Reviewer)?;
    let fingerprint = parse_fingerprint(&fingerprint)?;
    let req = extract_validated_json(body)?;
    let outcome = state
        .pipeline
        .resolve_approval(&fingerprint, req.outcome, req.reviewer, req.note)
        .await?;
    Ok(Json(outcome))
}
