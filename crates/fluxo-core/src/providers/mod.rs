//! Open-finance provider clients
//!
//! Backend-agnostic interface for fetching bank transactions from
//! aggregators. Each provider returns raw source records; normalization
//! happens downstream in `normalize`.
//!
//! - `BankProvider` trait: the interface every provider implements
//! - `ProviderClient` enum: concrete wrapper providing Clone + compile-time
//!   dispatch
//! - Implementations: `PluggyClient`, `BelvoClient`, `MockProvider`
//!
//! # Configuration
//!
//! Environment variables:
//! - `PLUGGY_BASE_URL`: API base URL (default: https://api.pluggy.ai)
//! - `PLUGGY_CLIENT_ID` / `PLUGGY_CLIENT_SECRET`: credentials (required)
//! - `BELVO_BASE_URL`: API base URL (default: https://sandbox.belvo.com)
//! - `BELVO_SECRET_ID` / `BELVO_SECRET_PASSWORD`: credentials (required)

mod belvo;
#[cfg(any(test, feature = "test-utils"))]
mod mock;
mod pluggy;

pub use belvo::BelvoClient;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockProvider;
pub use pluggy::PluggyClient;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::models::ProviderKind;
use crate::normalize::SourceRecord;

/// What to fetch from a provider
#[derive(Debug, Clone)]
pub struct FetchScope {
    /// Pluggy account id or Belvo link id
    pub scope: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl FetchScope {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            from: None,
            to: None,
        }
    }

    pub fn with_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }
}

/// Trait defining the interface for all bank providers
///
/// Providers should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait BankProvider: Send + Sync {
    /// Fetch raw transactions for an account/link scope
    async fn fetch_transactions(&self, scope: &FetchScope) -> Result<Vec<SourceRecord>>;

    /// Check if the provider API is reachable
    async fn health_check(&self) -> bool;

    /// Which provider this is (for sync run records)
    fn kind(&self) -> ProviderKind;

    /// Base URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete provider client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum ProviderClient {
    Pluggy(PluggyClient),
    Belvo(BelvoClient),
    /// Scripted provider for testing
    #[cfg(any(test, feature = "test-utils"))]
    Mock(MockProvider),
}

impl ProviderClient {
    /// Create a client for the given provider from environment variables
    ///
    /// Returns an error when the provider's credentials are not configured
    /// or the provider has no remote API (statement imports).
    pub fn from_env(kind: ProviderKind) -> Result<Self> {
        match kind {
            ProviderKind::Pluggy => PluggyClient::from_env()
                .map(ProviderClient::Pluggy)
                .ok_or_else(|| {
                    Error::Provider(
                        "Pluggy credentials not configured (PLUGGY_CLIENT_ID, PLUGGY_CLIENT_SECRET)"
                            .into(),
                    )
                }),
            ProviderKind::Belvo => BelvoClient::from_env()
                .map(ProviderClient::Belvo)
                .ok_or_else(|| {
                    Error::Provider(
                        "Belvo credentials not configured (BELVO_SECRET_ID, BELVO_SECRET_PASSWORD)"
                            .into(),
                    )
                }),
            ProviderKind::Statement => Err(Error::Provider(
                "Statement imports have no remote provider".into(),
            )),
        }
    }
}

#[async_trait]
impl BankProvider for ProviderClient {
    async fn fetch_transactions(&self, scope: &FetchScope) -> Result<Vec<SourceRecord>> {
        match self {
            ProviderClient::Pluggy(p) => p.fetch_transactions(scope).await,
            ProviderClient::Belvo(p) => p.fetch_transactions(scope).await,
            #[cfg(any(test, feature = "test-utils"))]
            ProviderClient::Mock(p) => p.fetch_transactions(scope).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ProviderClient::Pluggy(p) => p.health_check().await,
            ProviderClient::Belvo(p) => p.health_check().await,
            #[cfg(any(test, feature = "test-utils"))]
            ProviderClient::Mock(p) => p.health_check().await,
        }
    }

    fn kind(&self) -> ProviderKind {
        match self {
            ProviderClient::Pluggy(p) => p.kind(),
            ProviderClient::Belvo(p) => p.kind(),
            #[cfg(any(test, feature = "test-utils"))]
            ProviderClient::Mock(p) => p.kind(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ProviderClient::Pluggy(p) => p.host(),
            ProviderClient::Belvo(p) => p.host(),
            #[cfg(any(test, feature = "test-utils"))]
            ProviderClient::Mock(p) => p.host(),
        }
    }
}
