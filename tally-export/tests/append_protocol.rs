use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tally_core::CanonicalTransaction;
use tally_export::{
    CooperativeLock, CsvSheet, DedupExporter, ExportError, FileReservation, Lock, LockSettings, Reservation,
    ReservationStore, SheetStore,
};

fn txn(day: u32, desc: &str, amount: &str) -> CanonicalTransaction {
    let mut t =
        CanonicalTransaction::from_signed(NaiveDate::from_ymd_opt(2024, 3, day), desc, amount.parse().unwrap());
    t.source_issuer = Some("chase-checking".into());
    t
}

fn settings() -> LockSettings {
    LockSettings {
        ttl: Duration::from_secs(60),
        max_wait: Duration::from_secs(10),
        base_backoff: Duration::from_millis(2),
        max_backoff: Duration::from_millis(20),
    }
}

fn exporter(dir: &std::path::Path) -> DedupExporter {
    DedupExporter::new(
        Box::new(CooperativeLock::new(FileReservation::new(dir), "ledger", settings())),
        Box::new(CsvSheet::new(dir.join("ledger.csv"))),
    )
}

#[tokio::test]
async fn test_concurrent_appends_write_each_transaction_once() {
    let dir = tempfile::tempdir().unwrap();
    let batch = vec![
        txn(1, "PAYROLL ACME", "1250.00"),
        txn(4, "CARD PURCHASE TRADER JOES", "-63.18"),
        txn(14, "CITY WATER", "-41.20"),
    ];

    let mut handles = Vec::new();
    for i in 0..6 {
        let dir = dir.path().to_path_buf();
        let mut mine = batch.clone();
        mine.push(txn(20, &format!("ATM WITHDRAWAL {i}"), "-20.00"));
        handles.push(tokio::spawn(async move { exporter(&dir).append(&mine).await }));
    }

    let mut appended = 0;
    let mut duplicates = 0;
    for h in handles {
        let report = h.await.unwrap().unwrap();
        appended += report.appended;
        duplicates += report.duplicate_count;
    }

    // 3 shared rows once, plus one distinct row per caller.
    assert_eq!(appended, 9);
    assert_eq!(duplicates, 15);

    let sheet = CsvSheet::new(dir.path().join("ledger.csv"));
    assert_eq!(sheet.read_rows().unwrap().len(), 9);
    assert_eq!(sheet.load_hashes().await.unwrap().len(), 9);
    assert!(!dir.path().join("ledger.lock").exists());
}

#[tokio::test]
async fn test_abandoned_lock_is_recovered() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileReservation::new(dir.path());
    let crashed = Reservation {
        owner: "crashed-holder".into(),
        created_at: Utc::now() - chrono::Duration::minutes(30),
    };
    store.create("ledger", &crashed).await.unwrap();

    let report = exporter(dir.path()).append(&[txn(1, "PAYROLL ACME", "1250.00")]).await.unwrap();
    assert_eq!(report.appended, 1);
    assert!(store.inspect("ledger").await.unwrap().is_none());
}

#[tokio::test]
async fn test_held_lock_times_out_as_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let quick = LockSettings {
        max_wait: Duration::from_millis(100),
        ..settings()
    };
    let holder = CooperativeLock::new(FileReservation::new(dir.path()), "ledger", quick);
    let lease = holder.acquire().await.unwrap();

    let waiter = DedupExporter::new(
        Box::new(CooperativeLock::new(FileReservation::new(dir.path()), "ledger", quick)),
        Box::new(CsvSheet::new(dir.path().join("ledger.csv"))),
    );
    let err = waiter.append(&[txn(1, "PAYROLL ACME", "1250.00")]).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, ExportError::Lock(_)));
    assert!(!dir.path().join("ledger.csv").exists());

    holder.release(&lease).await.unwrap();
    let report = waiter.append(&[txn(1, "PAYROLL ACME", "1250.00")]).await.unwrap();
    assert_eq!(report.appended, 1);
}
