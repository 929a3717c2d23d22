//! Financial KPI aggregates

use chrono::NaiveDate;
use serde::Serialize;

use super::Database;
use crate::error::Result;

/// Receivable/payable totals over a period
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FinancialSummary {
    /// Sum of receivable amounts (money in)
    pub receivable: f64,
    /// Sum of payable amounts, as a positive magnitude (money out)
    pub payable: f64,
    /// receivable - payable
    pub net: f64,
    pub transactions: i64,
}

impl Database {
    /// Sum receivable and payable amounts, optionally bounded by date range
    /// and segment
    pub fn financial_summary(
        &self,
        date_range: Option<(NaiveDate, NaiveDate)>,
        segment_id: Option<i64>,
    ) -> Result<FinancialSummary> {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some((from, to)) = date_range {
            conditions.push("date >= ? AND date <= ?");
            params.push(Box::new(from.to_string()));
            params.push(Box::new(to.to_string()));
        }
        if let Some(segment) = segment_id {
            conditions.push("segment_id = ?");
            params.push(Box::new(segment));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // payable amounts are usually negative, but an explicit debit flag
        // can leave them positive; sum the magnitude either way
        let sql = format!(
            "SELECT \
                COALESCE(SUM(CASE WHEN direction = 'receivable' THEN amount ELSE 0 END), 0), \
                COALESCE(SUM(CASE WHEN direction = 'payable' THEN ABS(amount) ELSE 0 END), 0), \
                COUNT(*) \
             FROM transactions {}",
            where_clause
        );

        let conn = self.conn()?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let (receivable, payable, transactions) =
            conn.query_row(&sql, params_refs.as_slice(), |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;

        Ok(FinancialSummary {
            receivable,
            payable,
            net: receivable - payable,
            transactions,
        })
    }
}
