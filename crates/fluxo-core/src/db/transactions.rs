//! Normalized transaction storage and the deduplicating upsert

use std::collections::HashSet;

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{
    Direction, DocumentStatus, NormalizedTransaction, ProviderKind, StoredTransaction, TxnKind,
};

/// Filters for transaction listing
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub provider: Option<ProviderKind>,
    pub segment_id: Option<i64>,
    pub direction: Option<Direction>,
    /// Case-insensitive substring match on description
    pub search: Option<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl Database {
    /// Which of the given external ids already exist in storage
    pub fn existing_external_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        let mut existing = HashSet::new();

        // SQLite caps bound parameters, so probe in chunks
        for chunk in ids.chunks(500) {
            let placeholders: Vec<&str> = chunk.iter().map(|_| "?").collect();
            let sql = format!(
                "SELECT external_id FROM transactions WHERE external_id IN ({})",
                placeholders.join(", ")
            );
            let mut stmt = conn.prepare(&sql)?;
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                chunk.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
            let rows = stmt.query_map(params_refs.as_slice(), |row| row.get::<_, String>(0))?;
            for row in rows {
                existing.insert(row?);
            }
        }

        Ok(existing)
    }

    /// Persist a normalized batch idempotently, keyed on `external_id`
    ///
    /// Returns `(imported, updated)` counts. A repeated id within one batch
    /// counts as imported once and updated for each later occurrence. The
    /// whole batch is written in one SQL transaction: a failure rolls
    /// everything back (all-or-nothing per call, no partial-failure
    /// tracking).
    pub fn upsert_batch(&self, batch: &[NormalizedTransaction]) -> Result<(i64, i64)> {
        let ids: Vec<String> = batch.iter().map(|tx| tx.external_id.clone()).collect();
        let mut existing = self.existing_external_ids(&ids)?;

        let mut imported = 0i64;
        let mut updated = 0i64;

        let conn = self.conn()?;
        conn.execute("BEGIN TRANSACTION", [])?;

        let result = (|| {
            for tx in batch {
                // status is a business field managed after ingestion; the
                // upsert refreshes only source-derived columns
                conn.execute(
                    r#"
                    INSERT INTO transactions
                        (external_id, date, description, amount, kind, direction,
                         institution, account_id, balance, segment_id, category, provider, raw)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(external_id) DO UPDATE SET
                        date = excluded.date,
                        description = excluded.description,
                        amount = excluded.amount,
                        kind = excluded.kind,
                        direction = excluded.direction,
                        institution = excluded.institution,
                        account_id = excluded.account_id,
                        balance = excluded.balance,
                        segment_id = excluded.segment_id,
                        category = excluded.category,
                        raw = excluded.raw,
                        updated_at = CURRENT_TIMESTAMP
                    "#,
                    params![
                        tx.external_id,
                        tx.date.to_string(),
                        tx.description,
                        tx.amount,
                        tx.kind.as_str(),
                        tx.direction.as_str(),
                        tx.institution,
                        tx.account_id,
                        tx.balance,
                        tx.segment_id,
                        tx.category,
                        tx.provider.as_str(),
                        tx.raw,
                    ],
                )?;

                // extend the set as rows land so duplicate ids within the
                // batch count as updates
                if existing.insert(tx.external_id.clone()) {
                    imported += 1;
                } else {
                    updated += 1;
                }
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute("COMMIT", [])?;
                Ok((imported, updated))
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Get a transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<StoredTransaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!("{} WHERE id = ?", SELECT_TRANSACTION),
                params![id],
                Self::row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// Get a transaction by its external id
    pub fn get_transaction_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<StoredTransaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!("{} WHERE external_id = ?", SELECT_TRANSACTION),
                params![external_id],
                Self::row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// List transactions with optional filters, newest first
    pub fn list_transactions(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredTransaction>> {
        let (where_clause, mut params) = build_filter(filter);

        let sql = format!(
            "{} {} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
            SELECT_TRANSACTION, where_clause
        );
        params.push(Box::new(limit));
        params.push(Box::new(offset));

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let transactions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count transactions matching the filter
    pub fn count_transactions(&self, filter: &TransactionFilter) -> Result<i64> {
        let (where_clause, params) = build_filter(filter);
        let sql = format!("SELECT COUNT(*) FROM transactions {}", where_clause);

        let conn = self.conn()?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let count = conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    /// Update a transaction's business status
    ///
    /// Returns false if the transaction does not exist.
    pub fn set_transaction_status(&self, id: i64, status: DocumentStatus) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE transactions SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![status.as_str(), id],
        )?;
        Ok(changed > 0)
    }

    fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<StoredTransaction> {
        let date_str: String = row.get(2)?;
        let kind_str: String = row.get(5)?;
        let direction_str: String = row.get(6)?;
        let provider_str: String = row.get(12)?;
        let status_str: String = row.get(13)?;
        let created_at_str: String = row.get(14)?;
        let updated_at_str: String = row.get(15)?;

        Ok(StoredTransaction {
            id: row.get(0)?,
            external_id: row.get(1)?,
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                .unwrap_or_else(|_| chrono::Utc::now().date_naive()),
            description: row.get(3)?,
            amount: row.get(4)?,
            kind: kind_str.parse().unwrap_or(TxnKind::Credit),
            direction: direction_str.parse().unwrap_or(Direction::Receivable),
            institution: row.get(7)?,
            account_id: row.get(8)?,
            balance: row.get(9)?,
            segment_id: row.get(10)?,
            category: row.get(11)?,
            provider: provider_str.parse().unwrap_or(ProviderKind::Statement),
            status: status_str.parse().unwrap_or_default(),
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }
}

const SELECT_TRANSACTION: &str = "SELECT id, external_id, date, description, amount, kind, \
     direction, institution, account_id, balance, segment_id, category, provider, status, \
     created_at, updated_at FROM transactions";

fn build_filter(filter: &TransactionFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(provider) = filter.provider {
        conditions.push("provider = ?".to_string());
        params.push(Box::new(provider.as_str()));
    }
    if let Some(segment_id) = filter.segment_id {
        conditions.push("segment_id = ?".to_string());
        params.push(Box::new(segment_id));
    }
    if let Some(direction) = filter.direction {
        conditions.push("direction = ?".to_string());
        params.push(Box::new(direction.as_str()));
    }
    if let Some(ref search) = filter.search {
        if !search.trim().is_empty() {
            conditions.push("description LIKE ? COLLATE NOCASE".to_string());
            params.push(Box::new(format!("%{}%", search.trim())));
        }
    }
    if let Some((from, to)) = filter.date_range {
        conditions.push("date >= ? AND date <= ?".to_string());
        params.push(Box::new(from.to_string()));
        params.push(Box::new(to.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, params)
}
