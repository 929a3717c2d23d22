//! Mock provider for testing
//!
//! Returns scripted source records without touching the network. Useful for
//! sync engine tests and development without provider credentials.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ProviderKind;
use crate::normalize::SourceRecord;

use super::{BankProvider, FetchScope};

/// Scripted bank provider for tests
#[derive(Clone)]
pub struct MockProvider {
    records: Vec<SourceRecord>,
    /// Whether health_check should return true
    pub healthy: bool,
    /// Which provider this mock impersonates
    pub kind: ProviderKind,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create an empty, healthy mock impersonating Pluggy
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            healthy: true,
            kind: ProviderKind::Pluggy,
        }
    }

    /// Create a mock that returns the given records
    pub fn with_records(records: Vec<SourceRecord>) -> Self {
        Self {
            records,
            healthy: true,
            kind: ProviderKind::Pluggy,
        }
    }

    /// Create an unhealthy mock
    pub fn unhealthy() -> Self {
        Self {
            records: Vec::new(),
            healthy: false,
            kind: ProviderKind::Pluggy,
        }
    }
}

#[async_trait]
impl BankProvider for MockProvider {
    async fn fetch_transactions(&self, _scope: &FetchScope) -> Result<Vec<SourceRecord>> {
        Ok(self.records.clone())
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
