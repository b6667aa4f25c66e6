//! Generic REST table client for the hosted row store.
//!
//! Speaks the hosted-Postgres REST dialect: `GET/POST/PATCH
//! {base}/rest/v1/{table}` with `column=eq.value` filters, `order=` clauses
//! and a representation preference on writes so inserted/updated rows come
//! back in the response body.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::StoreConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors on the store boundary.
///
/// Callers do not distinguish transient from permanent failures - every
/// variant is terminal for the attempt.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("store returned no rows for a representation request")]
    EmptyRepresentation,

    #[error("invalid store url: {0}")]
    InvalidUrl(String),
}

/// Client for one hosted store instance.
pub struct StoreClient {
    http: Client,
    base: String,
    api_key: String,
}

/// Shared store handle; `None` upstream means the hub runs store-less (demo).
pub type SharedStore = Option<Arc<StoreClient>>;

impl StoreClient {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        // Validate early so a bad URL fails at startup, not on first write
        Url::parse(&config.url).map_err(|_| StoreError::InvalidUrl(config.url.clone()))?;

        Ok(Self {
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Start a query against one table
    pub fn table(&self, name: &str) -> TableQuery<'_> {
        TableQuery {
            client: self,
            table: name.to_string(),
            filters: Vec::new(),
            order: None,
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

/// Builder for a single table operation.
///
/// Filters and ordering accumulate, then one of `select`/`insert`/`update`
/// executes the request.
pub struct TableQuery<'a> {
    client: &'a StoreClient,
    table: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
}

impl TableQuery<'_> {
    /// Add an equality filter (`column=eq.value`)
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Order results by a column
    pub fn order(mut self, column: &str, descending: bool) -> Self {
        let direction = if descending { "desc" } else { "asc" };
        self.order = Some(format!("{}.{}", column, direction));
        self
    }

    /// Build the request URL including filters and ordering
    pub fn build_url(&self) -> String {
        let mut query: Vec<String> = self
            .filters
            .iter()
            .map(|(column, filter)| format!("{}={}", column, urlencoding::encode(filter)))
            .collect();
        if let Some(order) = &self.order {
            query.push(format!("order={}", order));
        }

        let base = format!("{}/rest/v1/{}", self.client.base, self.table);
        if query.is_empty() {
            base
        } else {
            format!("{}?{}", base, query.join("&"))
        }
    }

    /// Fetch matching rows
    pub async fn select<T: DeserializeOwned>(self) -> Result<Vec<T>, StoreError> {
        let url = self.build_url();
        let response = self
            .client
            .request(reqwest::Method::GET, &url)
            .send()
            .await?;
        decode_rows(response).await
    }

    /// Insert a row, returning the stored representation (server-assigned id,
    /// timestamps)
    pub async fn insert<T, R>(self, row: &T) -> Result<R, StoreError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.build_url();
        let response = self
            .client
            .request(reqwest::Method::POST, &url)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let mut rows: Vec<R> = decode_rows(response).await?;
        rows.pop().ok_or(StoreError::EmptyRepresentation)
    }

    /// Patch matching rows, returning the updated representations.
    /// An empty result means no row matched the filters.
    pub async fn update<T, R>(self, patch: &T) -> Result<Vec<R>, StoreError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.build_url();
        let response = self
            .client
            .request(reqwest::Method::PATCH, &url)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        decode_rows(response).await
    }
}

async fn decode_rows<T: DeserializeOwned>(response: reqwest::Response) -> Result<Vec<T>, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> StoreClient {
        StoreClient::new(&StoreConfig {
            url: "https://hub.example.co/".to_string(),
            api_key: "test-key".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn build_url_plain_table() {
        let client = test_client();
        let url = client.table("device_connections").build_url();
        assert_eq!(url, "https://hub.example.co/rest/v1/device_connections");
    }

    #[test]
    fn build_url_with_eq_filter() {
        let client = test_client();
        let url = client
            .table("automation_rules")
            .eq("id", "abc-123")
            .build_url();
        assert_eq!(
            url,
            "https://hub.example.co/rest/v1/automation_rules?id=eq.abc-123"
        );
    }

    #[test]
    fn build_url_encodes_filter_values() {
        let client = test_client();
        let url = client
            .table("device_connections")
            .eq("device_name", "Tesla Model S")
            .build_url();
        assert!(url.ends_with("device_name=eq.Tesla%20Model%20S"));
    }

    #[test]
    fn build_url_with_order() {
        let client = test_client();
        let url = client
            .table("voice_commands")
            .order("created_at", true)
            .build_url();
        assert_eq!(
            url,
            "https://hub.example.co/rest/v1/voice_commands?order=created_at.desc"
        );
    }

    #[test]
    fn invalid_url_rejected_at_construction() {
        let result = StoreClient::new(&StoreConfig {
            url: "not a url".to_string(),
            api_key: "k".to_string(),
        });
        assert!(matches!(result, Err(StoreError::InvalidUrl(_))));
    }
}
