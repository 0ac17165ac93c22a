//! # Incident Submission API
//!
//! `POST /v1/incidents` runs an incident through the pipeline and answers
//! with the analysis, the decision and (when reported) the ledger address.
//! A `HoldForReview` decision answers `202 Accepted`: the incident is
//! parked until a reviewer resolves it.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use triage_core::{DisasterType, Incident, ValidationError};
use triage_ledger::LedgerRecord;
use triage_policy::AuditEntry;
use triage_state::{ApprovalRequest, IncidentLifecycle, IncidentState};

use crate::error::AppError;
use crate::extractors::{extract_json, parse_fingerprint};
use crate::orchestration::PipelineOutcome;
use crate::state::AppState;

/// Location of the observation.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CoordinatesBody {
    pub lat: f64,
    pub lng: f64,
}

/// Incident as submitted by a sensor node or the dashboard.
#[derive(Debug, Deserialize)]
pub struct SubmitIncidentRequest {
    #[serde(alias = "disasterType")]
    pub disaster_type: DisasterType,
    #[serde(alias = "sectorId")]
    pub sector_id: String,
    #[serde(default)]
    pub coordinates: Option<CoordinatesBody>,
    #[serde(alias = "observedConfidence", alias = "confidence")]
    pub observed_confidence: f64,
    #[serde(default, alias = "evidenceRef")]
    pub evidence_ref: Option<String>,
}

impl SubmitIncidentRequest {
    /// Validate into a domain incident.
    pub fn into_incident(self) -> Result<Incident, ValidationError> {
        Incident::new(
            self.disaster_type,
            &self.sector_id,
            self.coordinates.map(|c| (c.lat, c.lng)),
            self.observed_confidence,
            self.evidence_ref.as_deref(),
        )
    }
}

/// Everything known about one incident.
#[derive(Debug, Serialize)]
pub struct IncidentView {
    pub lifecycle: IncidentLifecycle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<LedgerRecord>,
    pub audit: Vec<AuditEntry>,
}

/// Build the incidents router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/incidents", post(submit_incident))
        .route("/v1/incidents/{fingerprint}", get(get_incident))
}

/// POST /v1/incidents — submit an incident for triage.
async fn submit_incident(
    State(state): State<AppState>,
    body: Result<Json<SubmitIncidentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PipelineOutcome>), AppError> {
    let incident = extract_json(body)
        .map_err(AppError::for_incident)?
        .into_incident()
        .map_err(|e| AppError::InvalidIncident(e.to_string()))?;
    let outcome = state.pipeline.submit_incident(incident).await?;
    let status = match outcome.state {
        IncidentState::AwaitingApproval => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

/// GET /v1/incidents/{fingerprint} — lifecycle, approval, ledger record.
async fn get_incident(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
) -> Result<Json<IncidentView>, AppError> {
    let fingerprint = parse_fingerprint(&fingerprint)?;
    let pipeline = &state.pipeline;
    let lifecycle = pipeline
        .lifecycle(&fingerprint)
        .ok_or_else(|| AppError::NotFound(format!("incident {fingerprint}")))?;
    Ok(Json(IncidentView {
        lifecycle,
        approval: pipeline.gate().get(&fingerprint),
        ledger: pipeline.ledger().record(&fingerprint),
        audit: pipeline.audit_for(&fingerprint),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dashboard_field_names() {
        let req: SubmitIncidentRequest = serde_json::from_value(serde_json::json!({
            "disasterType": "wildfire",
            "sectorId": "Sector-1",
            "confidence": 0.92,
            "evidenceRef": "neofs://neoguard/incident_Sector-1.mp4"
        }))
        .unwrap();
        let incident = req.into_incident().unwrap();
        assert_eq!(incident.disaster_type(), DisasterType::Wildfire);
        assert_eq!(incident.sector_id().as_str(), "Sector-1");
    }

    #[test]
    fn out_of_range_confidence_is_invalid() {
        let req: SubmitIncidentRequest = serde_json::from_value(serde_json::json!({
            "disaster_type": "flood",
            "sector_id": "Sector-2",
            "observed_confidence": 1.4
        }))
        .unwrap();
        assert!(matches!(
            req.into_incident(),
            Err(ValidationError::ConfidenceOutOfRange(_))
        ));
    }
}
