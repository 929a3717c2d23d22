//! Belvo client implementation
//!
//! HTTP client for the Belvo open-finance API. Authenticates every request
//! with the secret id/password pair (HTTP basic auth) and follows the
//! cursor-style `next` links for pagination.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::ProviderKind;
use crate::normalize::{BelvoTransaction, SourceRecord};

use super::{BankProvider, FetchScope};

const DEFAULT_BASE_URL: &str = "https://sandbox.belvo.com";

/// Belvo API client
#[derive(Clone)]
pub struct BelvoClient {
    http_client: Client,
    base_url: String,
    secret_id: String,
    secret_password: String,
}

impl BelvoClient {
    pub fn new(base_url: &str, secret_id: &str, secret_password: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_id: secret_id.to_string(),
            secret_password: secret_password.to_string(),
        }
    }

    /// Create from environment variables
    ///
    /// Returns None if `BELVO_SECRET_ID` or `BELVO_SECRET_PASSWORD` is unset.
    pub fn from_env() -> Option<Self> {
        let secret_id = std::env::var("BELVO_SECRET_ID").ok()?;
        let secret_password = std::env::var("BELVO_SECRET_PASSWORD").ok()?;
        let base_url =
            std::env::var("BELVO_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Some(Self::new(&base_url, &secret_id, &secret_password))
    }
}

/// Paginated transaction listing response
#[derive(Debug, Deserialize)]
struct TransactionPage {
    #[serde(default)]
    count: u64,
    next: Option<String>,
    results: Vec<BelvoTransaction>,
}

#[async_trait]
impl BankProvider for BelvoClient {
    async fn fetch_transactions(&self, scope: &FetchScope) -> Result<Vec<SourceRecord>> {
        let mut records = Vec::new();
        let mut url = {
            let mut request = self
                .http_client
                .get(format!("{}/api/transactions/", self.base_url))
                .query(&[("link", scope.scope.as_str()), ("page_size", "100")]);
            if let Some(from) = scope.from {
                request = request.query(&[("value_date__gte", from.to_string())]);
            }
            if let Some(to) = scope.to {
                request = request.query(&[("value_date__lte", to.to_string())]);
            }
            Some(request.build()?.url().clone())
        };

        while let Some(page_url) = url.take() {
            let response = self
                .http_client
                .get(page_url)
                .basic_auth(&self.secret_id, Some(&self.secret_password))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Error::Provider(format!(
                    "Belvo transaction listing failed with status {}",
                    response.status()
                )));
            }

            let body: TransactionPage = response.json().await?;
            debug!(
                link = %scope.scope,
                count = body.count,
                page_len = body.results.len(),
                has_next = body.next.is_some(),
                "Fetched Belvo transaction page"
            );
            records.extend(body.results.into_iter().map(SourceRecord::Belvo));

            url = match body.next.as_deref() {
                Some(next) => Some(next.parse().map_err(|_| {
                    Error::Provider(format!("Belvo returned an invalid next URL: {}", next))
                })?),
                None => None,
            };
        }

        Ok(records)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/", self.base_url))
            .basic_auth(&self.secret_id, Some(&self.secret_password))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Belvo
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
