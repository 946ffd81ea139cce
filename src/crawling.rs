//! # Crawling
//!
//! One crawl run: listing enumeration, dedup filtering, bounded concurrent image
//! downloads and the closing face-detection stage.

use std::path::PathBuf;
use thiserror::Error;

pub mod coordinator;
pub mod counter;
pub mod detection;
pub mod fetcher;
pub mod gallery_source;

pub use coordinator::{
    CoordinatorConfig, CrawlReport, DownloadCoordinator, ItemOutcome, RunState, listing_page_for,
};
pub use counter::SharedCounter;
pub use detection::{
    CommandDetectionStage, DetectionStage, LoggingDetectionStage, detection_stage_from_config, image_titles,
};
pub use fetcher::{FetchError, FetchOutcome, FetchRequest, HttpImageFetcher, ImageFetcher};
pub use gallery_source::{GallerySource, HttpGallerySource};

use crate::infrastructure::{ParsingError, StoreError};

/// Errors that end the enumerate/dispatch phase of a crawl
#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("Failed to retrieve listing page {url}: {source}")]
    ListingUnavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    ListingMalformed(#[from] ParsingError),

    #[error("Dedup lookup failed for {title}: {source}")]
    Store {
        title: String,
        #[source]
        source: StoreError,
    },

    #[error("Dispatch aborted: {0}")]
    Aborted(String),

    #[error("Failed to create image directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
