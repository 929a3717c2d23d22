//! Pluggy client implementation
//!
//! HTTP client for the Pluggy open-finance API. The client id/secret pair is
//! exchanged for a short-lived API key, cached in-process and refreshed on
//! rejection.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::ProviderKind;
use crate::normalize::{PluggyTransaction, SourceRecord};

use super::{BankProvider, FetchScope};

const DEFAULT_BASE_URL: &str = "https://api.pluggy.ai";
const PAGE_SIZE: u32 = 500;

/// Pluggy API client
pub struct PluggyClient {
    http_client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    api_key: Arc<RwLock<Option<String>>>,
}

impl Clone for PluggyClient {
    fn clone(&self) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

impl PluggyClient {
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            api_key: Arc::new(RwLock::new(None)),
        }
    }

    /// Create from environment variables
    ///
    /// Returns None if `PLUGGY_CLIENT_ID` or `PLUGGY_CLIENT_SECRET` is unset.
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("PLUGGY_CLIENT_ID").ok()?;
        let client_secret = std::env::var("PLUGGY_CLIENT_SECRET").ok()?;
        let base_url =
            std::env::var("PLUGGY_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Some(Self::new(&base_url, &client_id, &client_secret))
    }

    fn cached_key(&self) -> Result<Option<String>> {
        let guard = self
            .api_key
            .read()
            .map_err(|_| Error::Provider("API key cache lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn store_key(&self, key: Option<String>) -> Result<()> {
        let mut guard = self
            .api_key
            .write()
            .map_err(|_| Error::Provider("API key cache lock poisoned".into()))?;
        *guard = key;
        Ok(())
    }

    /// Exchange the client credentials for an API key
    async fn authenticate(&self) -> Result<String> {
        let response = self
            .http_client
            .post(format!("{}/auth", self.base_url))
            .json(&AuthRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "Pluggy auth failed with status {}",
                response.status()
            )));
        }

        let auth: AuthResponse = response.json().await?;
        self.store_key(Some(auth.api_key.clone()))?;
        Ok(auth.api_key)
    }

    async fn api_key(&self) -> Result<String> {
        if let Some(key) = self.cached_key()? {
            return Ok(key);
        }
        self.authenticate().await
    }

    async fn fetch_page(
        &self,
        api_key: &str,
        scope: &FetchScope,
        page: u32,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .http_client
            .get(format!("{}/transactions", self.base_url))
            .header("X-API-KEY", api_key)
            .query(&[
                ("accountId", scope.scope.as_str()),
                ("pageSize", &PAGE_SIZE.to_string()),
                ("page", &page.to_string()),
            ]);
        if let Some(from) = scope.from {
            request = request.query(&[("from", from.to_string())]);
        }
        if let Some(to) = scope.to {
            request = request.query(&[("to", to.to_string())]);
        }
        Ok(request.send().await?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    api_key: String,
}

/// Paginated transaction listing response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionPage {
    results: Vec<PluggyTransaction>,
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[async_trait]
impl BankProvider for PluggyClient {
    async fn fetch_transactions(&self, scope: &FetchScope) -> Result<Vec<SourceRecord>> {
        let mut api_key = self.api_key().await?;
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let mut response = self.fetch_page(&api_key, scope, page).await?;

            // expired key: refresh once and retry the page
            if response.status() == StatusCode::UNAUTHORIZED {
                self.store_key(None)?;
                api_key = self.authenticate().await?;
                response = self.fetch_page(&api_key, scope, page).await?;
            }

            if !response.status().is_success() {
                return Err(Error::Provider(format!(
                    "Pluggy transaction listing failed with status {}",
                    response.status()
                )));
            }

            let body: TransactionPage = response.json().await?;
            debug!(
                account = %scope.scope,
                page = body.page,
                total_pages = body.total_pages,
                count = body.results.len(),
                "Fetched Pluggy transaction page"
            );
            records.extend(body.results.into_iter().map(SourceRecord::Pluggy));

            if body.page >= body.total_pages || body.total_pages == 0 {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Pluggy
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = PluggyClient::new("https://api.pluggy.ai/", "id", "secret");
        assert_eq!(client.host(), "https://api.pluggy.ai");
        assert_eq!(client.kind(), ProviderKind::Pluggy);
    }

    #[test]
    fn test_auth_response_parses() {
        let auth: AuthResponse = serde_json::from_str(r#"{"apiKey":"k-123"}"#).unwrap();
        assert_eq!(auth.api_key, "k-123");
    }

    #[test]
    fn test_transaction_page_parses() {
        let body = r#"{
            "results": [
                {"id": "t-1", "description": "PIX", "amount": 10.5,
                 "type": "CREDIT", "date": "2024-01-15T00:00:00.000Z",
                 "accountId": "acc-1"}
            ],
            "page": 1,
            "totalPages": 1
        }"#;
        let page: TransactionPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.total_pages, 1);
    }
}
