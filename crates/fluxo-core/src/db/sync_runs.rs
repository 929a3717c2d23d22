//! Sync run history

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{ProviderKind, SyncOutcome, SyncRun};

impl Database {
    /// Record one sync/import invocation
    pub fn record_sync_run(
        &self,
        provider: ProviderKind,
        scope: Option<&str>,
        segment_id: Option<i64>,
        outcome: &SyncOutcome,
        duration_ms: Option<i64>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO sync_runs (provider, scope, segment_id, total, imported, updated, skipped, duration_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                provider.as_str(),
                scope,
                segment_id,
                outcome.total,
                outcome.imported,
                outcome.updated,
                outcome.skipped,
                duration_ms,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List sync runs, newest first
    pub fn list_sync_runs(&self, limit: i64, offset: i64) -> Result<Vec<SyncRun>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, provider, scope, segment_id, total, imported, updated, skipped, \
             duration_ms, created_at FROM sync_runs ORDER BY id DESC LIMIT ? OFFSET ?",
        )?;

        let runs = stmt
            .query_map(params![limit, offset], |row| {
                let provider_str: String = row.get(1)?;
                let created_at_str: String = row.get(9)?;
                Ok(SyncRun {
                    id: row.get(0)?,
                    provider: provider_str.parse().unwrap_or(ProviderKind::Statement),
                    scope: row.get(2)?,
                    segment_id: row.get(3)?,
                    total: row.get(4)?,
                    imported: row.get(5)?,
                    updated: row.get(6)?,
                    skipped: row.get(7)?,
                    duration_ms: row.get(8)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    /// Total number of sync runs
    pub fn count_sync_runs(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM sync_runs", [], |row| row.get(0))?;
        Ok(count)
    }
}
