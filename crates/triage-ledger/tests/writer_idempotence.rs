//! Concurrent commits of the same incident reach the collaborator once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use triage_core::{Analysis, Assessment, Confidence, Fingerprint, Severity};
use triage_ledger::{
    CasStore, ContentAddress, InMemoryLedger, LedgerClient, LedgerError, LedgerPayload,
    LedgerWriter, DEFAULT_REPORTER,
};

fn fingerprint(seed: u8) -> Fingerprint {
    Fingerprint::parse(&format!("{seed:02x}").repeat(32)).unwrap()
}

fn analysis() -> Analysis {
    Analysis::from_primary(Assessment {
        severity: Severity::Critical,
        confidence: Confidence::new(0.92).unwrap(),
        reasoning: "thermal anomaly across Sector-1".into(),
        recommended_actions: vec!["alert fire services".into()],
    })
}

/// In-memory ledger that yields before storing, widening the race window.
struct SlowLedger {
    inner: InMemoryLedger,
}

#[async_trait]
impl LedgerClient for SlowLedger {
    fn backend(&self) -> &'static str {
        "slow"
    }

    async fn put(&self, bytes: Vec<u8>) -> Result<ContentAddress, LedgerError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.put(bytes).await
    }

    async fn put_json(&self, value: &serde_json::Value) -> Result<ContentAddress, LedgerError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.put_json(value).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commits_write_once() {
    let ledger = Arc::new(SlowLedger { inner: InMemoryLedger::new() });
    let writer = Arc::new(LedgerWriter::new(ledger.clone()));
    let fp = fingerprint(0x7a);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let writer = writer.clone();
            let fp = fp.clone();
            tokio::spawn(async move { writer.commit(&fp, &analysis()).await })
        })
        .collect();

    let mut addresses = Vec::new();
    for h in handles {
        addresses.push(h.await.unwrap().unwrap());
    }

    assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(ledger.inner.write_count(), 1);
    assert_eq!(writer.len(), 1);
}

#[tokio::test]
async fn local_address_is_digest_of_canonical_payload() {
    let ledger = Arc::new(InMemoryLedger::new());
    let writer = LedgerWriter::new(ledger.clone());
    let fp = fingerprint(0x01);

    let addr = writer.commit(&fp, &analysis()).await.unwrap();
    let expected = LedgerPayload::new(&fp, &analysis(), DEFAULT_REPORTER)
        .canonical_bytes()
        .unwrap();
    assert_eq!(
        addr.as_str(),
        format!("sha256:{}", triage_core::sha256_hex(&expected))
    );
}

#[tokio::test]
async fn cas_backed_writer_persists_readable_payload() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CasStore::new(dir.path()));
    let writer = LedgerWriter::new(store.clone());
    let fp = fingerprint(0x33);

    let addr = writer.commit(&fp, &analysis()).await.unwrap();
    let stored = store.resolve_json(&addr).await.unwrap().unwrap();
    assert_eq!(stored["fingerprint"], fp.as_str());
    assert_eq!(stored["severity"], "Critical");
    assert_eq!(stored["fallback_active"], false);

    // A second writer over the same directory lands on the same address.
    let again = LedgerWriter::new(store).commit(&fp, &analysis()).await.unwrap();
    assert_eq!(again, addr);
}
