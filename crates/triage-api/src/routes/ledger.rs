//! # Ledger Records API

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use triage_ledger::LedgerRecord;

use crate::error::AppError;
use crate::extractors::parse_fingerprint;
use crate::state::AppState;

/// Build the ledger router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/ledger", get(list_records))
        .route("/v1/ledger/{fingerprint}", get(get_record))
}

/// GET /v1/ledger — all records, oldest commit first.
async fn list_records(State(state): State<AppState>) -> Json<Vec<LedgerRecord>> {
    Json(state.pipeline.ledger().records())
}

/// GET /v1/ledger/{fingerprint} — the record for one incident.
async fn get_record(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
) -> Result<Json<LedgerRecord>, AppError> {
    let fingerprint = parse_fingerprint(&fingerprint)?;
    state
        .pipeline
        .ledger()
        .record(&fingerprint)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no ledger record for incident {fingerprint}")))
}
