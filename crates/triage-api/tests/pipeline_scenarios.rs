//! End-to-end pipeline scenarios over scripted agents and an in-memory ledger.

use std::sync::Arc;
use std::time::Duration;

use triage_agents::{DispatchConfig, Dispatcher, MockAgent, ThresholdAgent};
use triage_api::{Pipeline, PipelineError, RetryPolicy};
use triage_core::{Assessment, Confidence, DisasterType, Incident, Severity};
use triage_ledger::{CasStore, InMemoryLedger, LedgerError, LedgerWriter};
use triage_policy::{AuditEntryType, Decision, PolicyConfig, PolicyEngine};
use triage_state::{ApprovalError, ApprovalOutcome, IncidentState};

fn assessment(severity: Severity, confidence: f64) -> Assessment {
    Assessment {
        severity,
        confidence: Confidence::new(confidence).unwrap(),
        reasoning: format!("{severity:?} at {confidence}"),
        recommended_actions: vec!["notify responders".into()],
    }
}

fn incident(sector: &str) -> Incident {
    Incident::new(DisasterType::Wildfire, sector, Some((37.34, -121.97)), 0.92, None).unwrap()
}

struct Harness {
    pipeline: Pipeline,
    primary: Arc<MockAgent>,
    ledger: Arc<InMemoryLedger>,
}

fn harness(primary: MockAgent) -> Harness {
    let primary = Arc::new(primary);
    let ledger = Arc::new(InMemoryLedger::new());
    let pipeline = Pipeline::new(
        Dispatcher::new(
            primary.clone(),
            Arc::new(ThresholdAgent::new("threshold")),
            DispatchConfig::default(),
        ),
        PolicyEngine::new(PolicyConfig::default()),
        LedgerWriter::new(ledger.clone()),
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(10),
        },
    );
    Harness {
        pipeline,
        primary,
        ledger,
    }
}

fn answering(severity: Severity, confidence: f64) -> MockAgent {
    MockAgent::answering("primary", assessment(severity, confidence))
}

#[tokio::test]
async fn confident_critical_is_reported() {
    let h = harness(answering(Severity::Critical, 0.95));
    let outcome = h.pipeline.submit_incident(incident("Sector-1")).await.unwrap();

    assert_eq!(outcome.decision, Decision::AutoReport);
    assert_eq!(outcome.state, IncidentState::Reported);
    let address = outcome.content_address.unwrap();
    assert_eq!(h.ledger.write_count(), 1);
    assert_eq!(
        h.pipeline.ledger().record(&outcome.fingerprint).unwrap().content_address,
        address
    );
    let lifecycle = h.pipeline.lifecycle(&outcome.fingerprint).unwrap();
    let path: Vec<IncidentState> = lifecycle.transitions().iter().map(|t| t.to).collect();
    assert_eq!(
        path,
        vec![
            IncidentState::Analyzing,
            IncidentState::Reporting,
            IncidentState::Reported
        ]
    );
}

#[tokio::test]
async fn confidence_exactly_at_threshold_reports() {
    let h = harness(answering(Severity::Advisory, 0.90));
    let outcome = h.pipeline.submit_incident(incident("Sector-2")).await.unwrap();
    assert_eq!(outcome.decision, Decision::AutoReport);
    assert_eq!(h.ledger.write_count(), 1);
}

#[tokio::test]
async fn clear_severity_never_touches_ledger() {
    let h = harness(answering(Severity::Clear, 0.99));
    let outcome = h.pipeline.submit_incident(incident("Sector-3")).await.unwrap();
    assert_eq!(outcome.decision, Decision::AutoClear);
    assert_eq!(outcome.state, IncidentState::Cleared);
    assert_eq!(h.ledger.write_count(), 0);
}

#[tokio::test]
async fn held_incident_is_reported_after_approval() {
    let h = harness(answering(Severity::Critical, 0.88));
    let outcome = h.pipeline.submit_incident(incident("Sector-4")).await.unwrap();
    assert_eq!(outcome.decision, Decision::HoldForReview);
    assert_eq!(outcome.state, IncidentState::AwaitingApproval);
    assert!(outcome.approval.as_ref().unwrap().is_pending());
    assert_eq!(h.ledger.write_count(), 0);
    assert_eq!(h.pipeline.pending_approvals().len(), 1);

    let resolved = h
        .pipeline
        .resolve_approval(
            &outcome.fingerprint,
            ApprovalOutcome::Approved,
            Some("duty-officer".into()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(resolved.state, IncidentState::Reported);
    assert_eq!(resolved.decision, Decision::HoldForReview);
    assert!(resolved.content_address.is_some());
    assert_eq!(h.ledger.write_count(), 1);
    assert!(h.pipeline.pending_approvals().is_empty());
}

#[tokio::test]
async fn rejected_incident_closes_without_reporting() {
    let h = harness(answering(Severity::Advisory, 0.86));
    let outcome = h.pipeline.submit_incident(incident("Sector-5")).await.unwrap();
    let resolved = h
        .pipeline
        .resolve_approval(&outcome.fingerprint, ApprovalOutcome::Rejected, None, Some("false alarm".into()))
        .await
        .unwrap();
    assert_eq!(resolved.state, IncidentState::Closed);
    assert!(resolved.content_address.is_none());
    assert_eq!(h.ledger.write_count(), 0);
}

#[tokio::test]
async fn second_resolution_is_already_resolved() {
    let h = harness(answering(Severity::Advisory, 0.86));
    let outcome = h.pipeline.submit_incident(incident("Sector-6")).await.unwrap();
    h.pipeline
        .resolve_approval(&outcome.fingerprint, ApprovalOutcome::Rejected, None, None)
        .await
        .unwrap();
    let err = h
        .pipeline
        .resolve_approval(&outcome.fingerprint, ApprovalOutcome::Approved, None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Approval(ApprovalError::AlreadyResolved { .. })
    ));
    assert_eq!(h.ledger.write_count(), 0);
}

#[tokio::test]
async fn resolving_unknown_incident_is_not_found() {
    let h = harness(answering(Severity::Critical, 0.95));
    let fingerprint = incident("Sector-7").fingerprint().unwrap();
    let err = h
        .pipeline
        .resolve_approval(&fingerprint, ApprovalOutcome::Approved, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Approval(ApprovalError::NotFound { .. })));
}

#[tokio::test]
async fn resubmitting_parked_incident_returns_open_request() {
    let h = harness(answering(Severity::Critical, 0.87));
    let first = h.pipeline.submit_incident(incident("Sector-8")).await.unwrap();
    let second = h.pipeline.submit_incident(incident("Sector-8")).await.unwrap();

    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(second.state, IncidentState::AwaitingApproval);
    assert_eq!(
        first.approval.unwrap().created_at(),
        second.approval.unwrap().created_at()
    );
    assert_eq!(h.primary.calls(), 1);
    assert_eq!(h.pipeline.pending_approvals().len(), 1);
}

#[tokio::test]
async fn resubmitting_reported_incident_does_not_write_twice() {
    let h = harness(answering(Severity::Critical, 0.97));
    let first = h.pipeline.submit_incident(incident("Sector-9")).await.unwrap();
    let second = h.pipeline.submit_incident(incident("Sector-9")).await.unwrap();
    assert_eq!(first.content_address, second.content_address);
    assert_eq!(h.ledger.write_count(), 1);
    assert_eq!(h.primary.calls(), 2);
}

#[tokio::test]
async fn both_agents_failing_fails_the_incident() {
    let primary = Arc::new(MockAgent::failing("primary", "model offline"));
    let ledger = Arc::new(InMemoryLedger::new());
    let pipeline = Pipeline::new(
        Dispatcher::new(
            primary,
            Arc::new(MockAgent::failing("fallback", "rules unavailable")),
            DispatchConfig::default(),
        ),
        PolicyEngine::new(PolicyConfig::default()),
        LedgerWriter::new(ledger.clone()),
        RetryPolicy::default(),
    );

    let incident = incident("Sector-10");
    let fingerprint = incident.fingerprint().unwrap();
    let err = pipeline.submit_incident(incident).await.unwrap_err();
    match err {
        PipelineError::AnalysisUnavailable(e) => assert_eq!(e.trace().len(), 2),
        other => panic!("expected AnalysisUnavailable, got {other:?}"),
    }
    let lifecycle = pipeline.lifecycle(&fingerprint).unwrap();
    assert_eq!(lifecycle.state(), IncidentState::Failed);
    assert!(lifecycle.failure_reason().is_some());
    assert_eq!(ledger.write_count(), 0);
    assert!(pipeline
        .audit_for(&fingerprint)
        .iter()
        .any(|e| e.entry_type == AuditEntryType::PipelineFailed));
}

#[tokio::test]
async fn low_confidence_primary_uses_fallback() {
    let h = harness(answering(Severity::Critical, 0.40));
    let outcome = h.pipeline.submit_incident(incident("Sector-11")).await.unwrap();
    assert!(outcome.analysis.fallback_active());
    assert_eq!(outcome.trace.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn transient_ledger_errors_are_retried() {
    let h = harness(answering(Severity::Critical, 0.95));
    h.ledger.inject_failures([
        LedgerError::Network("connection reset".into()),
        LedgerError::Storage("disk busy".into()),
    ]);
    let outcome = h.pipeline.submit_incident(incident("Sector-12")).await.unwrap();
    assert_eq!(outcome.state, IncidentState::Reported);
    assert_eq!(h.ledger.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fail_the_incident() {
    let h = harness(answering(Severity::Critical, 0.95));
    h.ledger.inject_failures((0..3).map(|_| LedgerError::Network("unreachable".into())));
    let incident = incident("Sector-13");
    let fingerprint = incident.fingerprint().unwrap();

    let err = h.pipeline.submit_incident(incident).await.unwrap_err();
    assert!(matches!(err, PipelineError::Ledger(_)));
    assert_eq!(
        h.pipeline.lifecycle(&fingerprint).unwrap().state(),
        IncidentState::Failed
    );
    assert!(h.pipeline.ledger().record(&fingerprint).is_none());
}

#[tokio::test(start_paused = true)]
async fn invalid_payload_is_not_retried() {
    let h = harness(answering(Severity::Critical, 0.95));
    h.ledger.inject_failures([
        LedgerError::InvalidPayload("rejected".into()),
        LedgerError::Network("never reached".into()),
    ]);
    let err = h.pipeline.submit_incident(incident("Sector-14")).await.unwrap_err();
    match err {
        PipelineError::Ledger(e) => {
            assert!(matches!(e.ledger_error(), LedgerError::InvalidPayload(_)))
        }
        other => panic!("expected Ledger, got {other:?}"),
    }
}

#[tokio::test]
async fn audit_trail_records_each_step() {
    let h = harness(answering(Severity::Critical, 0.95));
    let outcome = h.pipeline.submit_incident(incident("Sector-15")).await.unwrap();
    let kinds: Vec<AuditEntryType> = h
        .pipeline
        .audit_for(&outcome.fingerprint)
        .into_iter()
        .map(|e| e.entry_type)
        .collect();
    assert_eq!(
        kinds,
        vec![
            AuditEntryType::IncidentReceived,
            AuditEntryType::AgentAttempt,
            AuditEntryType::DecisionMade,
            AuditEntryType::LedgerCommitted,
        ]
    );
}

#[tokio::test]
async fn sector_one_wildfire_reports_once_across_resubmission() {
    let h = harness(answering(Severity::Critical, 0.93));
    let first = h.pipeline.submit_incident(incident("Sector-1")).await.unwrap();
    let second = h.pipeline.submit_incident(incident("Sector-1")).await.unwrap();

    assert_eq!(first.decision, Decision::AutoReport);
    assert!(first.content_address.is_some());
    assert_eq!(first.content_address, second.content_address);
    assert_eq!(h.ledger.write_count(), 1);
    assert_eq!(h.pipeline.ledger().len(), 1);
}

#[tokio::test]
async fn uncertain_flood_is_held_then_rejected() {
    let advisory = || MockAgent::answering("agent", assessment(Severity::Advisory, 0.6));
    let ledger = Arc::new(InMemoryLedger::new());
    let pipeline = Pipeline::new(
        Dispatcher::new(
            Arc::new(advisory()),
            Arc::new(advisory()),
            DispatchConfig::default(),
        ),
        PolicyEngine::new(PolicyConfig::default()),
        LedgerWriter::new(ledger.clone()),
        RetryPolicy::default(),
    );
    let flood = Incident::new(DisasterType::Flood, "Sector-2", None, 0.6, None).unwrap();

    let outcome = pipeline.submit_incident(flood).await.unwrap();
    assert_eq!(outcome.decision, Decision::HoldForReview);
    assert!(outcome.approval.as_ref().unwrap().is_pending());

    let resolved = pipeline
        .resolve_approval(&outcome.fingerprint, ApprovalOutcome::Rejected, None, None)
        .await
        .unwrap();
    assert_eq!(resolved.state, IncidentState::Closed);
    assert!(pipeline.ledger().record(&outcome.fingerprint).is_none());
    assert_eq!(ledger.write_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_of_one_incident_dispatch_once() {
    let h = Arc::new(harness(
        answering(Severity::Critical, 0.88).with_delay(Duration::from_millis(50)),
    ));
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            h.pipeline.submit_incident(incident("Sector-16")).await
        }));
    }
    let mut in_progress = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(outcome) => assert_eq!(outcome.state, IncidentState::AwaitingApproval),
            Err(PipelineError::InProgress { .. }) => in_progress += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(h.primary.calls(), 1);
    assert!(in_progress <= 7);
    assert_eq!(h.pipeline.pending_approvals().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resolving_while_analyzing_leaves_gate_untouched() {
    let h = Arc::new(harness(
        answering(Severity::Critical, 0.88).with_delay(Duration::from_millis(100)),
    ));
    let fingerprint = incident("Sector-17").fingerprint().unwrap();
    let submit = {
        let h = h.clone();
        tokio::spawn(async move { h.pipeline.submit_incident(incident("Sector-17")).await })
    };
    while h.primary.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let err = h
        .pipeline
        .resolve_approval(&fingerprint, ApprovalOutcome::Approved, Some("early".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InProgress {
            state: IncidentState::Analyzing,
            ..
        }
    ));

    let outcome = submit.await.unwrap().unwrap();
    assert_eq!(outcome.state, IncidentState::AwaitingApproval);
    assert_eq!(h.pipeline.pending_approvals().len(), 1);

    let resolved = h
        .pipeline
        .resolve_approval(&fingerprint, ApprovalOutcome::Rejected, None, None)
        .await
        .unwrap();
    assert_eq!(resolved.state, IncidentState::Closed);
    let path: Vec<IncidentState> = h
        .pipeline
        .lifecycle(&fingerprint)
        .unwrap()
        .transitions()
        .iter()
        .map(|t| t.to)
        .collect();
    assert_eq!(
        path,
        vec![
            IncidentState::Analyzing,
            IncidentState::AwaitingApproval,
            IncidentState::Closed
        ]
    );
}

#[tokio::test]
async fn reported_incident_is_readable_from_disk_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CasStore::new(dir.path()));
    let pipeline = Pipeline::new(
        Dispatcher::new(
            Arc::new(answering(Severity::Critical, 0.96)),
            Arc::new(ThresholdAgent::new("threshold")),
            DispatchConfig::default(),
        ),
        PolicyEngine::new(PolicyConfig::default()),
        LedgerWriter::new(store.clone()),
        RetryPolicy {
            attempts: 1,
            base_delay: Duration::from_millis(1),
        },
    );

    let outcome = pipeline.submit_incident(incident("Sector-18")).await.unwrap();
    assert_eq!(outcome.state, IncidentState::Reported);
    let address = outcome.content_address.unwrap();

    let stored = store.resolve_json(&address).await.unwrap().unwrap();
    assert_eq!(stored["fingerprint"], outcome.fingerprint.to_string());
    assert_eq!(stored["confidence_bps"], 9600);

    let again = pipeline.submit_incident(incident("Sector-18")).await.unwrap();
    assert_eq!(again.content_address, Some(address));
}
