//! # Image Fetcher
//!
//! Resolves an artwork's image from its detail page, downloads it with a single
//! timeout-bounded attempt and writes it to disk.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::crawling::counter::SharedCounter;
use crate::infrastructure::HttpClient;
use crate::infrastructure::gallery_parser::parse_image_url;
use crate::infrastructure::parsing_error::ParsingError;

/// One download the coordinator hands to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Artwork detail page
    pub item_url: String,
    /// Canonical title, used for progress messages
    pub title: String,
    /// Where the image bytes go
    pub destination: PathBuf,
}

/// Result of a fetch that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Image written; `sequence` is the counter value after this download
    Success { sequence: u64 },
    /// A request exceeded the timeout; nothing was written
    TimedOut { title: String },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParsingError),

    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fetch task aborted: {0}")]
    Aborted(String),
}

/// Seam between the coordinator and the network
#[async_trait]
pub trait ImageFetcher: Send + Sync + 'static {
    async fn fetch(&self, request: &FetchRequest, counter: &SharedCounter) -> Result<FetchOutcome, FetchError>;
}

/// Either the response body or the information that the request timed out
enum Fetched<T> {
    Body(T),
    TimedOut,
}

fn classify<T>(url: &str, result: reqwest::Result<T>) -> Result<Fetched<T>, FetchError> {
    match result {
        Ok(body) => Ok(Fetched::Body(body)),
        Err(e) if e.is_timeout() => Ok(Fetched::TimedOut),
        Err(source) => Err(FetchError::Network {
            url: url.to_string(),
            source,
        }),
    }
}

/// Fetcher backed by the shared HTTP client
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: HttpClient,
}

impl HttpImageFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, request: &FetchRequest, counter: &SharedCounter) -> Result<FetchOutcome, FetchError> {
        let timed_out = || -> Result<FetchOutcome, FetchError> {
            warn!("Timeout when downloading: {}", request.title);
            Ok(FetchOutcome::TimedOut {
                title: request.title.clone(),
            })
        };

        let Fetched::Body(detail_html) = classify(&request.item_url, self.client.fetch_text(&request.item_url).await)?
        else {
            return timed_out();
        };
        let image_url = parse_image_url(&detail_html, &request.item_url)?;

        let Fetched::Body(bytes) = classify(&image_url, self.client.fetch_bytes(&image_url).await)? else {
            return timed_out();
        };

        tokio::fs::write(&request.destination, &bytes)
            .await
            .map_err(|source| FetchError::Io {
                path: request.destination.clone(),
                source,
            })?;

        let sequence = counter.increment();
        info!("No.{} {}", sequence, request.title);
        Ok(FetchOutcome::Success { sequence })
    }
}
