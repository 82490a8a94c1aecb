//! Elasticsearch HTTP client.
//!
//! Endpoints used:
//!   prepare: PUT  {url}/{collection}          (mapping; "already exists" is fine)
//!   index:   POST {url}/{collection}/_doc
//!   search:  POST {url}/{collection}/_search
//!
//! Connection-refused style failures are retried here, below the
//! gateway's own write retry.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::client::{collection_mapping, DocumentStore};
use crate::error::{Result, StoreError};

const DEFAULT_PORT: u16 = 9200;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ElasticConfig {
    /// Base URL, e.g. `http://localhost:9200`.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Extra attempts on connection errors.
    pub connect_retries: u32,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: format!("http://localhost:{DEFAULT_PORT}"),
            timeout: Duration::from_secs(30),
            connect_retries: 3,
        }
    }
}

/// `localhost` → `http://localhost:9200`, `es:9300` → `http://es:9300`,
/// full URLs are kept (minus a trailing slash).
pub fn normalise_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else if host.contains(':') {
        format!("http://{host}")
    } else {
        format!("http://{host}:{DEFAULT_PORT}")
    }
}

pub struct ElasticClient {
    client: Client,
    base_url: String,
    connect_retries: u32,
}

impl ElasticClient {
    pub fn new(config: &ElasticConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(concat!("medindex/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: normalise_url(&config.url),
            connect_retries: config.connect_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a JSON body, retrying only when the connection itself fails.
    async fn send(&self, method: Method, url: &str, body: &Value) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            match self.client.request(method.clone(), url).json(body).send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_connect() && attempt < self.connect_retries => {
                    attempt += 1;
                    warn!(url, attempt, error = %e, "Connection to document store failed, retrying");
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Classify a non-success status. Only timeout statuses are transient.
fn status_error(status: StatusCode, body: String) -> StoreError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => StoreError::Timeout(body),
        _ => StoreError::Http { status: status.as_u16(), body },
    }
}

async fn error_for_status(resp: reqwest::Response) -> StoreError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    status_error(status, body)
}

/// Index creation raced with another writer or an earlier run.
fn is_already_exists(status: StatusCode, body: &str) -> bool {
    status == StatusCode::BAD_REQUEST && body.contains("resource_already_exists_exception")
}

#[async_trait]
impl DocumentStore for ElasticClient {
    #[instrument(skip(self))]
    async fn prepare(&self, collection: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url, collection);
        let resp = self.send(Method::PUT, &url, &collection_mapping()).await?;
        let status = resp.status();
        if status.is_success() {
            info!(collection, "Collection created");
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        if is_already_exists(status, &body) {
            debug!(collection, "Collection already exists");
            return Ok(());
        }
        Err(status_error(status, body))
    }

    #[instrument(skip(self, document))]
    async fn index(&self, collection: &str, document: &Value) -> Result<()> {
        let url = format!("{}/{}/_doc", self.base_url, collection);
        let resp = self.send(Method::POST, &url, document).await?;
        if !resp.status().is_success() {
            return Err(error_for_status(resp).await);
        }
        debug!(collection, "Document indexed");
        Ok(())
    }

    #[instrument(skip(self, query))]
    async fn search(&self, collection: &str, query: &Value) -> Result<Vec<Value>> {
        let url = format!("{}/{}/_search", self.base_url, collection);
        let resp = self.send(Method::POST, &url, query).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            // Index not created yet: nothing has been ingested.
            return Ok(vec![]);
        }
        if !resp.status().is_success() {
            return Err(error_for_status(resp).await);
        }

        let body: Value = resp.json().await?;
        Ok(extract_hits(&body))
    }
}

/// Pull `_source` bodies out of a search response.
fn extract_hits(body: &Value) -> Vec<Value> {
    body["hits"]["hits"]
        .as_array()
        .map(|hits| hits.iter().map(|h| h["_source"].clone()).collect())
        .unwrap_or_default()
}
