//! A partial payload left by an interrupted write never backs a record.

use std::sync::Arc;

use triage_core::{sha256_hex, Analysis, Assessment, Confidence, Fingerprint, Severity};
use triage_ledger::{CasStore, LedgerClient, LedgerPayload, LedgerWriter, DEFAULT_REPORTER};

fn analysis() -> Analysis {
    Analysis::from_primary(Assessment {
        severity: Severity::Critical,
        confidence: Confidence::new(0.93).unwrap(),
        reasoning: "flame front crossing Sector-1".into(),
        recommended_actions: vec!["evacuate ridge road".into()],
    })
}

#[tokio::test]
async fn truncated_payload_is_rewritten_on_commit() {
    let dir = tempfile::tempdir().unwrap();
    let fp = Fingerprint::parse(&"9c".repeat(32)).unwrap();
    let canonical = LedgerPayload::new(&fp, &analysis(), DEFAULT_REPORTER)
        .canonical_bytes()
        .unwrap();
    let hex = sha256_hex(&canonical);

    let payload_dir = dir.path().join("payload");
    std::fs::create_dir_all(&payload_dir).unwrap();
    let path = payload_dir.join(format!("{hex}.json"));
    std::fs::write(&path, br#"{"fingerp"#).unwrap();

    let store = Arc::new(CasStore::new(dir.path()));
    let writer = LedgerWriter::new(store.clone());
    let addr = writer.commit(&fp, &analysis()).await.unwrap();

    assert_eq!(addr.as_str(), format!("sha256:{hex}"));
    let stored = store.resolve_json(&addr).await.unwrap().unwrap();
    assert_eq!(stored["fingerprint"], fp.as_str());
    assert_eq!(std::fs::read(&path).unwrap(), canonical.as_bytes());
}

#[tokio::test]
async fn intact_payload_is_left_alone_and_no_temp_files_remain() {
    let dir = tempfile::tempdir().unwrap();
    let store = CasStore::new(dir.path());
    let doc = serde_json::json!({"reporter": DEFAULT_REPORTER, "confidence_bps": 9300});

    let first = store.put_json(&doc).await.unwrap();
    let second = store.put_json(&doc).await.unwrap();
    assert_eq!(first, second);

    let names: Vec<String> = std::fs::read_dir(dir.path().join("payload"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![format!("{}.json", first.sha256_hex().unwrap())]);
}
