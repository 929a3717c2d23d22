//! Domain models for Fluxo

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Business-facing classification of a transaction: money-in or money-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Receivable,
    Payable,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receivable => "receivable",
            Self::Payable => "payable",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "receivable" => Ok(Self::Receivable),
            "payable" => Ok(Self::Payable),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Internal sign/category-derived classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnKind {
    Credit,
    Debit,
}

impl TxnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl std::str::FromStr for TxnKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TxnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source a transaction was ingested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Pluggy open-finance connector
    Pluggy,
    /// Belvo open-finance connector
    Belvo,
    /// Parsed bank statement file (CSV/OFX/QIF)
    Statement,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pluggy => "pluggy",
            Self::Belvo => "belvo",
            Self::Statement => "statement",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pluggy" => Ok(Self::Pluggy),
            "belvo" => Ok(Self::Belvo),
            "statement" => Ok(Self::Statement),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared status for financial documents and transactions
///
/// One enum used everywhere instead of per-module string tables, so the
/// distinct statuses stay distinct all the way into storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    /// Total mapping from legacy status strings (Portuguese values included)
    ///
    /// Unknown values fall back to `Pending` with a warning; known distinct
    /// statuses are never merged.
    pub fn from_legacy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" | "pendente" | "aberto" | "open" => Self::Pending,
            "paid" | "pago" | "paga" | "liquidado" => Self::Paid,
            "overdue" | "vencido" | "vencida" | "atrasado" => Self::Overdue,
            "cancelled" | "canceled" | "cancelado" | "cancelada" => Self::Cancelled,
            other => {
                tracing::warn!(status = other, "Unknown legacy status, defaulting to pending");
                Self::Pending
            }
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown document status: {}", s)),
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bank statement file formats accepted for import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementFormat {
    Csv,
    Ofx,
    Qif,
}

impl StatementFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Ofx => "ofx",
            Self::Qif => "qif",
        }
    }
}

impl std::str::FromStr for StatementFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "ofx" => Ok(Self::Ofx),
            "qif" => Ok(Self::Qif),
            _ => Err(format!("Unknown statement format: {}", s)),
        }
    }
}

impl std::fmt::Display for StatementFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized bank transaction, ready for persistence
///
/// Output of the normalizer; `external_id` is the dedup key. Records whose
/// source lacks a usable identifier never reach this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    /// Source system's transaction identifier, unique per provider
    pub external_id: String,
    /// Transaction value date
    pub date: NaiveDate,
    /// Sanitized free-text description
    pub description: String,
    /// Signed amount, rounded to 2 fraction digits
    pub amount: f64,
    pub kind: TxnKind,
    pub direction: Direction,
    /// Bank/connector name, best-effort
    pub institution: String,
    /// Resolved source account identifier
    pub account_id: Option<String>,
    /// Running balance if the source provides one
    pub balance: Option<f64>,
    /// Tenant scope, carried from the sync context (null = global)
    pub segment_id: Option<i64>,
    /// Keyword-inferred category
    pub category: Option<String>,
    pub provider: ProviderKind,
    /// Original source record as JSON
    pub raw: Option<String>,
}

/// A stored transaction row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: i64,
    pub external_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub kind: TxnKind,
    pub direction: Direction,
    pub institution: String,
    pub account_id: Option<String>,
    pub balance: Option<f64>,
    pub segment_id: Option<i64>,
    pub category: Option<String>,
    pub provider: ProviderKind,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tenant/business-unit scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One sync or statement-import invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: i64,
    pub provider: ProviderKind,
    /// Account/link/file scope this run covered
    pub scope: Option<String>,
    pub segment_id: Option<i64>,
    pub total: i64,
    pub imported: i64,
    pub updated: i64,
    pub skipped: i64,
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Counts reported by a deduplicating upsert
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Records received from the source
    pub total: i64,
    /// Rows inserted for the first time
    pub imported: i64,
    /// Rows that already existed and were refreshed in place
    pub updated: i64,
    /// Records dropped for lacking a usable external id
    pub skipped: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trip() {
        assert_eq!("receivable".parse::<Direction>().unwrap(), Direction::Receivable);
        assert_eq!(Direction::Payable.to_string(), "payable");
        assert!("entrada".parse::<Direction>().is_err());
    }

    #[test]
    fn test_legacy_status_mapping_keeps_statuses_distinct() {
        assert_eq!(DocumentStatus::from_legacy("pendente"), DocumentStatus::Pending);
        assert_eq!(DocumentStatus::from_legacy("pago"), DocumentStatus::Paid);
        assert_eq!(DocumentStatus::from_legacy("VENCIDO"), DocumentStatus::Overdue);
        assert_eq!(DocumentStatus::from_legacy("cancelado"), DocumentStatus::Cancelled);
        // only genuinely unknown values collapse to pending
        assert_eq!(DocumentStatus::from_legacy("???"), DocumentStatus::Pending);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("Pluggy".parse::<ProviderKind>().unwrap(), ProviderKind::Pluggy);
        assert_eq!("belvo".parse::<ProviderKind>().unwrap(), ProviderKind::Belvo);
        assert!("nubank".parse::<ProviderKind>().is_err());
    }
}
