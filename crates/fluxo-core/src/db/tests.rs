//! Database layer tests

use chrono::NaiveDate;

use super::*;
use crate::models::{
    Direction, DocumentStatus, NormalizedTransaction, ProviderKind, SyncOutcome, TxnKind,
};

fn tx(external_id: &str, amount: f64) -> NormalizedTransaction {
    let direction = if amount < 0.0 {
        Direction::Payable
    } else {
        Direction::Receivable
    };
    NormalizedTransaction {
        external_id: external_id.to_string(),
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        description: "TEST".to_string(),
        amount,
        kind: if amount < 0.0 {
            TxnKind::Debit
        } else {
            TxnKind::Credit
        },
        direction,
        institution: "Banco Teste".to_string(),
        account_id: None,
        balance: None,
        segment_id: None,
        category: None,
        provider: ProviderKind::Pluggy,
        raw: None,
    }
}

#[test]
fn test_upsert_batch_counts_new_and_existing() {
    let db = Database::in_memory().unwrap();

    let batch = vec![tx("a", 10.0), tx("b", -5.0)];
    let (imported, updated) = db.upsert_batch(&batch).unwrap();
    assert_eq!(imported, 2);
    assert_eq!(updated, 0);

    // second run with one known and one new id
    let batch = vec![tx("b", -7.5), tx("c", 3.0)];
    let (imported, updated) = db.upsert_batch(&batch).unwrap();
    assert_eq!(imported, 1);
    assert_eq!(updated, 1);

    let filter = TransactionFilter::default();
    assert_eq!(db.count_transactions(&filter).unwrap(), 3);
}

#[test]
fn test_upsert_is_idempotent() {
    let db = Database::in_memory().unwrap();
    let batch = vec![tx("a", 10.0), tx("b", -5.0), tx("c", 1.0)];

    db.upsert_batch(&batch).unwrap();
    let (imported, updated) = db.upsert_batch(&batch).unwrap();
    assert_eq!(imported, 0);
    assert_eq!(updated, 3);
    assert_eq!(
        db.count_transactions(&TransactionFilter::default()).unwrap(),
        3
    );
}

#[test]
fn test_upsert_batch_with_repeated_external_id() {
    let db = Database::in_memory().unwrap();

    // same id twice in one batch: one row, the later occurrence wins and
    // counts as an update
    let (imported, updated) = db.upsert_batch(&[tx("dup", 10.0), tx("dup", 25.0)]).unwrap();
    assert_eq!(imported, 1);
    assert_eq!(updated, 1);
    assert_eq!(
        db.count_transactions(&TransactionFilter::default()).unwrap(),
        1
    );

    let stored = db.get_transaction_by_external_id("dup").unwrap().unwrap();
    assert_eq!(stored.amount, 25.0);
}

#[test]
fn test_reingest_converges_to_latest_values() {
    let db = Database::in_memory().unwrap();

    db.upsert_batch(&[tx("a", 10.0)]).unwrap();
    let mut second = tx("a", 25.5);
    second.description = "REVISED".to_string();
    db.upsert_batch(&[second]).unwrap();

    let stored = db.get_transaction_by_external_id("a").unwrap().unwrap();
    assert_eq!(stored.amount, 25.5);
    assert_eq!(stored.description, "REVISED");
    assert_eq!(
        db.count_transactions(&TransactionFilter::default()).unwrap(),
        1
    );
}

#[test]
fn test_upsert_preserves_business_status() {
    let db = Database::in_memory().unwrap();

    db.upsert_batch(&[tx("a", -10.0)]).unwrap();
    let stored = db.get_transaction_by_external_id("a").unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Pending);

    assert!(db
        .set_transaction_status(stored.id, DocumentStatus::Paid)
        .unwrap());

    // re-ingestion refreshes source fields but not the status
    db.upsert_batch(&[tx("a", -12.0)]).unwrap();
    let stored = db.get_transaction_by_external_id("a").unwrap().unwrap();
    assert_eq!(stored.amount, -12.0);
    assert_eq!(stored.status, DocumentStatus::Paid);
}

#[test]
fn test_set_status_missing_transaction() {
    let db = Database::in_memory().unwrap();
    assert!(!db.set_transaction_status(999, DocumentStatus::Paid).unwrap());
}

#[test]
fn test_list_transactions_filters() {
    let db = Database::in_memory().unwrap();
    let segment = db.create_segment("Filial SP", None).unwrap();

    let mut a = tx("a", 10.0);
    a.segment_id = Some(segment.id);
    a.description = "PIX RECEBIDO".to_string();
    let b = tx("b", -5.0);
    db.upsert_batch(&[a, b]).unwrap();

    let filter = TransactionFilter {
        segment_id: Some(segment.id),
        ..Default::default()
    };
    let listed = db.list_transactions(&filter, 50, 0).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].external_id, "a");

    let filter = TransactionFilter {
        direction: Some(Direction::Payable),
        ..Default::default()
    };
    assert_eq!(db.count_transactions(&filter).unwrap(), 1);

    let filter = TransactionFilter {
        search: Some("pix".to_string()),
        ..Default::default()
    };
    assert_eq!(db.count_transactions(&filter).unwrap(), 1);
}

#[test]
fn test_segment_crud() {
    let db = Database::in_memory().unwrap();

    let segment = db.create_segment("Matriz", Some("Loja principal")).unwrap();
    assert_eq!(segment.name, "Matriz");

    assert!(db.update_segment(segment.id, "Matriz RJ", None).unwrap());
    let fetched = db.get_segment(segment.id).unwrap().unwrap();
    assert_eq!(fetched.name, "Matriz RJ");
    assert_eq!(fetched.description, None);

    // duplicate names are rejected
    db.create_segment("Filial", None).unwrap();
    assert!(db.create_segment("Filial", None).is_err());

    assert!(db.delete_segment(segment.id).unwrap());
    assert!(db.get_segment(segment.id).unwrap().is_none());
    assert!(!db.delete_segment(segment.id).unwrap());
}

#[test]
fn test_delete_segment_detaches_transactions() {
    let db = Database::in_memory().unwrap();
    let segment = db.create_segment("Filial", None).unwrap();

    let mut a = tx("a", 10.0);
    a.segment_id = Some(segment.id);
    db.upsert_batch(&[a]).unwrap();

    db.delete_segment(segment.id).unwrap();
    let stored = db.get_transaction_by_external_id("a").unwrap().unwrap();
    assert_eq!(stored.segment_id, None);
}

#[test]
fn test_sync_run_history() {
    let db = Database::in_memory().unwrap();

    let outcome = SyncOutcome {
        total: 3,
        imported: 2,
        updated: 0,
        skipped: 1,
    };
    db.record_sync_run(ProviderKind::Pluggy, Some("acc-1"), None, &outcome, Some(120))
        .unwrap();

    let runs = db.list_sync_runs(10, 0).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].provider, ProviderKind::Pluggy);
    assert_eq!(runs[0].scope.as_deref(), Some("acc-1"));
    assert_eq!(runs[0].imported, 2);
    assert_eq!(runs[0].skipped, 1);
    assert_eq!(db.count_sync_runs().unwrap(), 1);
}

#[test]
fn test_financial_summary() {
    let db = Database::in_memory().unwrap();
    db.upsert_batch(&[tx("a", 100.0), tx("b", -40.0), tx("c", 25.0)])
        .unwrap();

    let summary = db.financial_summary(None, None).unwrap();
    assert_eq!(summary.receivable, 125.0);
    assert_eq!(summary.payable, 40.0);
    assert_eq!(summary.net, 85.0);
    assert_eq!(summary.transactions, 3);

    // empty range
    let range = (
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
    );
    let summary = db.financial_summary(Some(range), None).unwrap();
    assert_eq!(summary.transactions, 0);
    assert_eq!(summary.net, 0.0);
}

#[test]
fn test_financial_summary_payable_magnitude() {
    let db = Database::in_memory().unwrap();

    // an explicit debit flag can classify a positive amount as payable
    let mut flagged = tx("flagged-debit", 35.0);
    flagged.direction = Direction::Payable;
    flagged.kind = TxnKind::Debit;
    db.upsert_batch(&[flagged, tx("a", 100.0), tx("b", -40.0)])
        .unwrap();

    let summary = db.financial_summary(None, None).unwrap();
    assert_eq!(summary.receivable, 100.0);
    assert_eq!(summary.payable, 75.0);
    assert_eq!(summary.net, 25.0);
}

#[test]
fn test_audit_log() {
    let db = Database::in_memory().unwrap();
    db.log_audit("dev@example.com", "list", Some("transaction"), None, None)
        .unwrap();
    db.log_audit("dev@example.com", "sync", Some("pluggy"), Some(1), Some("imported=2"))
        .unwrap();

    let entries = db.list_audit_log(10, 0).unwrap();
    assert_eq!(entries.len(), 2);
    // newest first
    assert_eq!(entries[0].action, "sync");
    assert_eq!(entries[0].details.as_deref(), Some("imported=2"));
}
