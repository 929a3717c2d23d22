//! Fluxo Core Library
//!
//! Shared functionality for the Fluxo bank transaction ingestion service:
//! - Database access and migrations
//! - Source record normalization (Pluggy, Belvo, statement files)
//! - Deduplicating upsert keyed on provider external ids
//! - Statement parsers (CSV, OFX, QIF) with format auto-detection
//! - Open-finance provider clients
//! - Sync engine tying fetch, normalize, and persist together

pub mod db;
pub mod error;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod statement;
pub mod sync;

pub use db::{AuditEntry, Database, FinancialSummary, TransactionFilter};
pub use error::{Error, Result};
pub use models::{
    Direction, DocumentStatus, NormalizedTransaction, ProviderKind, Segment, StatementFormat,
    StoredTransaction, SyncOutcome, SyncRun, TxnKind,
};
pub use normalize::{NormalizedBatch, SourceRecord};
#[cfg(any(test, feature = "test-utils"))]
pub use providers::MockProvider;
pub use providers::{BankProvider, BelvoClient, FetchScope, PluggyClient, ProviderClient};
pub use sync::SyncEngine;
