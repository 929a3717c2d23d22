//! Sync engine: fetch, normalize, upsert, record
//!
//! One engine call covers one sync or import invocation end to end. There is
//! no background scheduling and no locking; concurrent runs over the same
//! scope converge through the `external_id` upsert key.

use std::time::Instant;

use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{ProviderKind, StatementFormat, SyncOutcome};
use crate::normalize::{self, SourceRecord};
use crate::providers::{BankProvider, FetchScope};
use crate::statement;

/// Runs provider syncs and statement imports against the database
#[derive(Clone)]
pub struct SyncEngine {
    db: Database,
}

impl SyncEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Fetch transactions from a provider and persist them
    ///
    /// `total` in the outcome counts everything the provider returned,
    /// including records dropped for lacking an external id.
    pub async fn sync<P: BankProvider>(
        &self,
        provider: &P,
        scope: &FetchScope,
        segment_id: Option<i64>,
    ) -> Result<SyncOutcome> {
        let started = Instant::now();
        let records = provider.fetch_transactions(scope).await?;
        let outcome = self.persist(&records, segment_id)?;

        let duration_ms = started.elapsed().as_millis() as i64;
        self.db.record_sync_run(
            provider.kind(),
            Some(&scope.scope),
            segment_id,
            &outcome,
            Some(duration_ms),
        )?;

        info!(
            provider = provider.kind().as_str(),
            scope = %scope.scope,
            total = outcome.total,
            imported = outcome.imported,
            updated = outcome.updated,
            skipped = outcome.skipped,
            duration_ms,
            "Sync completed"
        );
        Ok(outcome)
    }

    /// Parse a statement file's contents and persist its lines
    ///
    /// When `format` is None the format is auto-detected from the content.
    /// `scope` labels the sync run (typically the file name).
    pub fn import_statement(
        &self,
        content: &str,
        format: Option<StatementFormat>,
        scope: &str,
        segment_id: Option<i64>,
    ) -> Result<SyncOutcome> {
        let started = Instant::now();
        let format = match format {
            Some(f) => f,
            None => statement::detect_statement_format(content).ok_or_else(|| {
                Error::UnsupportedFormat(
                    "Could not detect statement format; pass it explicitly".into(),
                )
            })?,
        };

        let lines = statement::parse_statement(content.as_bytes(), format)?;
        let records: Vec<SourceRecord> = lines.into_iter().map(SourceRecord::Statement).collect();
        let outcome = self.persist(&records, segment_id)?;

        let duration_ms = started.elapsed().as_millis() as i64;
        self.db.record_sync_run(
            ProviderKind::Statement,
            Some(scope),
            segment_id,
            &outcome,
            Some(duration_ms),
        )?;

        info!(
            format = format.as_str(),
            scope,
            total = outcome.total,
            imported = outcome.imported,
            updated = outcome.updated,
            skipped = outcome.skipped,
            duration_ms,
            "Statement import completed"
        );
        Ok(outcome)
    }

    fn persist(&self, records: &[SourceRecord], segment_id: Option<i64>) -> Result<SyncOutcome> {
        let batch = normalize::normalize_batch(records, segment_id);
        let (imported, updated) = self.db.upsert_batch(&batch.transactions)?;
        Ok(SyncOutcome {
            total: records.len() as i64,
            imported,
            updated,
            skipped: batch.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TransactionFilter;
    use crate::normalize::PluggyTransaction;
    use crate::providers::MockProvider;

    fn pluggy_record(id: Option<&str>, amount: f64) -> SourceRecord {
        SourceRecord::Pluggy(PluggyTransaction {
            id: id.map(|s| s.to_string()),
            description: Some("PIX TRANSF".to_string()),
            amount: Some(amount),
            txn_type: None,
            date: Some("2024-01-15".to_string()),
            balance: None,
            account_id: Some("acc-1".to_string()),
            category: None,
            connector: None,
        })
    }

    #[tokio::test]
    async fn test_sync_drops_records_without_ids() {
        let db = Database::in_memory().unwrap();
        let engine = SyncEngine::new(db.clone());
        let provider = MockProvider::with_records(vec![
            pluggy_record(Some("t-1"), 10.0),
            pluggy_record(None, 20.0),
            pluggy_record(Some("t-3"), -30.0),
        ]);

        let outcome = engine
            .sync(&provider, &FetchScope::new("acc-1"), None)
            .await
            .unwrap();
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(
            db.count_transactions(&TransactionFilter::default()).unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_sync_rerun_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let engine = SyncEngine::new(db.clone());
        let provider = MockProvider::with_records(vec![
            pluggy_record(Some("t-1"), 10.0),
            pluggy_record(None, 20.0),
            pluggy_record(Some("t-3"), -30.0),
        ]);
        let scope = FetchScope::new("acc-1");

        engine.sync(&provider, &scope, None).await.unwrap();
        let second = engine.sync(&provider, &scope, None).await.unwrap();

        assert_eq!(second.total, 3);
        assert_eq!(second.imported, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(second.skipped, 1);
        assert_eq!(
            db.count_transactions(&TransactionFilter::default()).unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_sync_records_run_history() {
        let db = Database::in_memory().unwrap();
        let engine = SyncEngine::new(db.clone());
        let provider = MockProvider::with_records(vec![pluggy_record(Some("t-1"), 10.0)]);

        engine
            .sync(&provider, &FetchScope::new("acc-1"), None)
            .await
            .unwrap();

        let runs = db.list_sync_runs(10, 0).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].provider, ProviderKind::Pluggy);
        assert_eq!(runs[0].scope.as_deref(), Some("acc-1"));
        assert_eq!(runs[0].imported, 1);
    }

    #[test]
    fn test_import_statement_autodetects_csv() {
        let db = Database::in_memory().unwrap();
        let engine = SyncEngine::new(db.clone());
        let content = "data;descricao;valor\n15/01/2024;PIX RECEBIDO;150,00\n16/01/2024;PAGTO BOLETO;-89,90\n";

        let outcome = engine
            .import_statement(content, None, "extrato.csv", None)
            .unwrap();
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.skipped, 0);

        // re-import converges through the synthetic ids
        let second = engine
            .import_statement(content, None, "extrato.csv", None)
            .unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(
            db.count_transactions(&TransactionFilter::default()).unwrap(),
            2
        );
    }

    #[test]
    fn test_import_statement_unknown_format_is_an_error() {
        let db = Database::in_memory().unwrap();
        let engine = SyncEngine::new(db);
        assert!(engine
            .import_statement("not a statement", None, "x.txt", None)
            .is_err());
    }
}
