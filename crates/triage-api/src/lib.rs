//! # triage-api — Incident Triage Service
//!
//! Orchestrates the triage pipeline (dispatch → policy → approval →
//! ledger) and exposes it over Axum.
//!
//! ## Routes
//!
//! - `POST /v1/incidents` — submit an incident for triage
//! - `GET  /v1/incidents/{fingerprint}` — lifecycle, approval, ledger record
//! - `GET  /v1/approvals` — pending review queue
//! - `POST /v1/approvals/{fingerprint}/resolve` — reviewer verdict
//! - `GET  /v1/ledger`, `GET /v1/ledger/{fingerprint}` — committed records
//! - `GET  /v1/audit?limit=N` — pipeline audit trail
//! - `/health/*` — liveness and readiness probes (unauthenticated)
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → AuthLayer
//!
//! ## Crate Policy
//!
//! - Route handlers only translate; the pipeline lives in [`orchestration`].
//! - All errors map to structured HTTP responses via `AppError`.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod orchestration;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use orchestration::{Pipeline, PipelineError, PipelineOutcome, RetryPolicy};
pub use state::AppState;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

/// Incident bodies are small; anything larger is not a sensor report.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::incidents::router())
        .merge(routes::approvals::router())
        .merge(routes::ledger::router())
        .merge(routes::audit::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — 503 until the pipeline can accept incidents.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.pipeline.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}
