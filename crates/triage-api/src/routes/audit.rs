//! # Audit Trail API

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use triage_policy::AuditEntry;

use crate::state::AppState;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1_000;

/// `?limit=N`, clamped to `1..=1000`.
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// Build the audit router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/audit", get(recent))
}

/// GET /v1/audit — most recent entries, oldest first.
async fn recent(State(state): State<AppState>, Query(q): Query<AuditQuery>) -> Json<Vec<AuditEntry>> {
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    Json(state.pipeline.audit_tail(limit))
}
