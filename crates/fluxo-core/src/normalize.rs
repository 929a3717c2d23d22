//! Normalization of third-party bank transactions
//!
//! Converts heterogeneous source records (Pluggy, Belvo, parsed statement
//! lines) into the single internal `NormalizedTransaction` shape. Every
//! resolver here is total: missing optional data degrades to `None` or a
//! placeholder, never an error. The one hard rule is the external id —
//! records without one are dropped from the batch before persistence.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::{Direction, NormalizedTransaction, ProviderKind, TxnKind};

/// Placeholder when no institution can be resolved from source metadata
pub const UNKNOWN_INSTITUTION: &str = "unknown";

/// A transaction as returned by the Pluggy API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluggyTransaction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Signed amount: negative = outflow
    #[serde(default)]
    pub amount: Option<f64>,
    /// "CREDIT" or "DEBIT"
    #[serde(rename = "type", default)]
    pub txn_type: Option<String>,
    /// ISO-8601 datetime string
    #[serde(default)]
    pub date: Option<String>,
    /// Running balance; Pluggy sends a number, some connectors a string
    #[serde(default)]
    pub balance: Option<Value>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Connector metadata when expanded on the item
    #[serde(default)]
    pub connector: Option<PluggyConnector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluggyConnector {
    #[serde(default)]
    pub name: Option<String>,
}

/// A transaction as returned by the Belvo API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BelvoTransaction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Unsigned magnitude; sign comes from `type`
    #[serde(default)]
    pub amount: Option<f64>,
    /// "INFLOW" or "OUTFLOW"
    #[serde(rename = "type", default)]
    pub txn_type: Option<String>,
    /// "YYYY-MM-DD"
    #[serde(default)]
    pub value_date: Option<String>,
    #[serde(default)]
    pub balance: Option<Value>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub account: Option<BelvoAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BelvoAccount {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub institution: Option<BelvoInstitution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BelvoInstitution {
    #[serde(default)]
    pub name: Option<String>,
}

/// One line of a parsed CSV/OFX/QIF bank statement
///
/// Statement files carry no provider identifier, so the parser assigns a
/// synthetic `external_id` (see `statement::line_id`) before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementLine {
    pub external_id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Signed amount: negative = outflow
    pub amount: f64,
    pub balance: Option<f64>,
    /// Bank name hint from the file, when present (OFX ORG tag)
    pub institution: Option<String>,
    /// Explicit credit/debit marker, when the format provides one
    pub txn_type: Option<String>,
}

/// Tagged union over the supported transaction sources
#[derive(Debug, Clone)]
pub enum SourceRecord {
    Pluggy(PluggyTransaction),
    Belvo(BelvoTransaction),
    Statement(StatementLine),
}

impl SourceRecord {
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::Pluggy(_) => ProviderKind::Pluggy,
            Self::Belvo(_) => ProviderKind::Belvo,
            Self::Statement(_) => ProviderKind::Statement,
        }
    }
}

/// Result of normalizing a batch: usable transactions plus the drop count
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub transactions: Vec<NormalizedTransaction>,
    /// Records excluded for lacking a usable external id
    pub skipped: i64,
}

/// Trim and strip non-printable characters from a description
///
/// Empty input yields an empty string, not an error.
pub fn sanitize_description(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Round an amount to 2 fraction digits
pub fn round_amount(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Classify a transaction as receivable or payable
///
/// An explicit source type flag takes precedence; otherwise the amount sign
/// decides (zero counts as receivable). Total for any string and any amount.
pub fn map_type_to_direction(source_type: Option<&str>, amount: f64) -> Direction {
    if let Some(t) = source_type {
        match t.trim().to_lowercase().as_str() {
            "credit" | "inflow" | "c" | "cr" => return Direction::Receivable,
            "debit" | "outflow" | "d" | "db" => return Direction::Payable,
            _ => {}
        }
    }
    if amount < 0.0 {
        Direction::Payable
    } else {
        Direction::Receivable
    }
}

/// Internal credit/debit view of a direction
pub fn direction_to_kind(direction: Direction) -> TxnKind {
    match direction {
        Direction::Receivable => TxnKind::Credit,
        Direction::Payable => TxnKind::Debit,
    }
}

/// Best-effort source account identifier; `None` when absent
pub fn resolve_account_id(record: &SourceRecord) -> Option<String> {
    let id = match record {
        SourceRecord::Pluggy(t) => t.account_id.clone(),
        SourceRecord::Belvo(t) => t.account.as_ref().and_then(|a| a.id.clone()),
        SourceRecord::Statement(_) => None,
    };
    id.filter(|s| !s.trim().is_empty())
}

/// Optional running balance; `None` when absent or non-numeric
pub fn resolve_balance(record: &SourceRecord) -> Option<f64> {
    let value = match record {
        SourceRecord::Pluggy(t) => t.balance.as_ref(),
        SourceRecord::Belvo(t) => t.balance.as_ref(),
        SourceRecord::Statement(l) => return l.balance,
    };
    value.and_then(parse_numeric)
}

/// Best-effort institution label, with a generic placeholder fallback
pub fn infer_institution(record: &SourceRecord) -> String {
    let name = match record {
        SourceRecord::Pluggy(t) => t.connector.as_ref().and_then(|c| c.name.clone()),
        SourceRecord::Belvo(t) => t
            .account
            .as_ref()
            .and_then(|a| a.institution.as_ref())
            .and_then(|i| i.name.clone()),
        SourceRecord::Statement(l) => l.institution.clone(),
    };
    name.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_INSTITUTION.to_string())
}

/// Keyword-based category inference from a sanitized description
pub fn infer_category(description: &str) -> Option<String> {
    const KEYWORDS: &[(&str, &str)] = &[
        ("supermercado", "groceries"),
        ("mercado", "groceries"),
        ("restaurante", "dining"),
        ("ifood", "dining"),
        ("uber", "transport"),
        ("99app", "transport"),
        ("posto", "fuel"),
        ("combustivel", "fuel"),
        ("farmacia", "health"),
        ("drogaria", "health"),
        ("aluguel", "rent"),
        ("salario", "payroll"),
        ("folha de pagamento", "payroll"),
        ("energia", "utilities"),
        ("agua", "utilities"),
        ("internet", "utilities"),
        ("telefone", "utilities"),
        ("imposto", "taxes"),
        ("darf", "taxes"),
        ("tarifa", "bank fees"),
        ("juros", "interest"),
        ("transferencia", "transfer"),
        ("ted ", "transfer"),
        ("pix", "transfer"),
    ];

    let lower = description.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, category)| (*category).to_string())
}

/// Convert one source record into the internal shape
///
/// Returns `None` exactly when the record lacks a non-empty external id;
/// every other missing field degrades to a default.
pub fn normalize(record: &SourceRecord, segment_id: Option<i64>) -> Option<NormalizedTransaction> {
    let external_id = external_id(record)?;

    let provider = record.provider();
    let (raw_description, amount, source_type, category) = match record {
        SourceRecord::Pluggy(t) => (
            t.description.clone().unwrap_or_default(),
            t.amount.unwrap_or(0.0),
            t.txn_type.clone(),
            t.category.clone(),
        ),
        SourceRecord::Belvo(t) => {
            // Belvo amounts are magnitudes; OUTFLOW means money out
            let magnitude = t.amount.unwrap_or(0.0).abs();
            let signed = match t.txn_type.as_deref() {
                Some(ty) if ty.eq_ignore_ascii_case("outflow") => -magnitude,
                _ => magnitude,
            };
            (
                t.description.clone().unwrap_or_default(),
                signed,
                t.txn_type.clone(),
                t.category.clone(),
            )
        }
        SourceRecord::Statement(l) => (
            l.description.clone(),
            l.amount,
            l.txn_type.clone(),
            None,
        ),
    };

    let description = sanitize_description(&raw_description);
    let amount = round_amount(amount);
    let direction = map_type_to_direction(source_type.as_deref(), amount);
    let category = category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .or_else(|| infer_category(&description));

    Some(NormalizedTransaction {
        external_id,
        date: resolve_date(record),
        description,
        amount,
        kind: direction_to_kind(direction),
        direction,
        institution: infer_institution(record),
        account_id: resolve_account_id(record),
        balance: resolve_balance(record),
        segment_id,
        category,
        provider,
        raw: raw_json(record),
    })
}

/// Normalize a batch, dropping records without a usable external id
pub fn normalize_batch(records: &[SourceRecord], segment_id: Option<i64>) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for record in records {
        match normalize(record, segment_id) {
            Some(tx) => batch.transactions.push(tx),
            None => batch.skipped += 1,
        }
    }
    if batch.skipped > 0 {
        debug!(
            skipped = batch.skipped,
            kept = batch.transactions.len(),
            "Dropped records without external id"
        );
    }
    batch
}

fn external_id(record: &SourceRecord) -> Option<String> {
    let id = match record {
        SourceRecord::Pluggy(t) => t.id.clone(),
        SourceRecord::Belvo(t) => t.id.clone(),
        SourceRecord::Statement(l) => Some(l.external_id.clone()),
    };
    id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn resolve_date(record: &SourceRecord) -> NaiveDate {
    let parsed = match record {
        SourceRecord::Pluggy(t) => t.date.as_deref().and_then(parse_iso_date),
        SourceRecord::Belvo(t) => t.value_date.as_deref().and_then(parse_iso_date),
        SourceRecord::Statement(l) => Some(l.date),
    };
    parsed.unwrap_or_else(|| Utc::now().date_naive())
}

/// Parse "YYYY-MM-DD" with or without a trailing time component
fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn parse_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn raw_json(record: &SourceRecord) -> Option<String> {
    let value = match record {
        SourceRecord::Pluggy(t) => serde_json::to_string(t),
        SourceRecord::Belvo(t) => serde_json::to_string(t),
        SourceRecord::Statement(l) => serde_json::to_string(l),
    };
    value.ok()
}
