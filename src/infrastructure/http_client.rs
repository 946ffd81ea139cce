//! HTTP client for the gallery
//!
//! Thin wrapper over `reqwest` that sends the configured User-Agent on every request
//! and bounds each request with a single timeout. There is no retry and no rate
//! limiting: one attempt per URL.

use anyhow::{Context, Result};
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;
use tracing::debug;

use crate::infrastructure::config::{CrawlerConfig, defaults};

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// User agent string
    pub user_agent: String,
    /// Request timeout, covering connect through the end of the body
    pub timeout: Duration,
}

impl HttpClientConfig {
    pub fn from_crawler_config(config: &CrawlerConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.request_timeout_seconds),
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECONDS),
        }
    }
}

/// Shared HTTP client; cloning is cheap and reuses the connection pool
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn from_crawler_config(config: &CrawlerConfig) -> Result<Self> {
        Self::with_config(HttpClientConfig::from_crawler_config(config))
    }

    /// GET a URL, turning non-success statuses into errors
    pub async fn fetch_response(&self, url: &str) -> reqwest::Result<Response> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        debug!("Fetched {} ({})", url, response.status());
        Ok(response)
    }

    /// GET a URL and return the body as text
    pub async fn fetch_text(&self, url: &str) -> reqwest::Result<String> {
        self.fetch_response(url).await?.text().await
    }

    /// GET a URL and return the raw body
    pub async fn fetch_bytes(&self, url: &str) -> reqwest::Result<Vec<u8>> {
        let bytes = self.fetch_response(url).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Get the configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}
