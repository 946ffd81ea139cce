//! Application layer
//!
//! Wires the configured infrastructure into a [`DownloadCoordinator`] and owns the
//! lifetime of the stores for one harvest run.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::crawling::{
    CoordinatorConfig, CrawlReport, DetectionStage, DownloadCoordinator, HttpGallerySource, HttpImageFetcher,
    detection_stage_from_config,
};
use crate::infrastructure::{AppConfig, DedupStore, HttpClient, LandmarkStore, StoreResult};

/// Overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct HarvestOverrides {
    pub directory: Option<PathBuf>,
    pub max_items: Option<u32>,
    pub concurrency: Option<usize>,
}

impl HarvestOverrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(directory) = &self.directory {
            config.crawler.directory = directory.clone();
        }
        if let Some(max_items) = self.max_items {
            config.crawler.max_items = max_items;
        }
        if let Some(concurrency) = self.concurrency {
            config.crawler.max_concurrent_downloads = Some(concurrency);
        }
    }
}

/// One end-to-end harvest run
pub struct HarvestUseCase {
    config: AppConfig,
}

impl HarvestUseCase {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<CrawlReport> {
        let crawler = &self.config.crawler;
        let storage = &self.config.storage;

        LandmarkStore::ensure_schema(&storage.model_database_url)
            .await
            .with_context(|| format!("Failed to prepare model store {}", storage.model_database_url))?;

        let store = Arc::new(
            DedupStore::open(&storage.paintings_database_url)
                .await
                .with_context(|| format!("Failed to open paintings store {}", storage.paintings_database_url))?,
        );

        let client = HttpClient::from_crawler_config(crawler).context("Failed to build HTTP client")?;
        let source = Arc::new(HttpGallerySource::new(client.clone(), crawler.listing_url_template.clone()));
        let fetcher = Arc::new(HttpImageFetcher::new(client));
        let detection: Arc<dyn DetectionStage> = Arc::from(detection_stage_from_config(&self.config.detection));

        let coordinator = DownloadCoordinator::new(
            source,
            fetcher,
            detection,
            Arc::clone(&store),
            CoordinatorConfig::from_crawler_config(crawler),
        );

        let report = coordinator.crawl(&crawler.directory, crawler.max_items).await;

        finish_store(store.commit(), store.close()).await?;
        info!("Harvest finished for {:?}", report.directory);

        Ok(report)
    }
}

/// Commit, then close even when the commit failed; the commit error wins
async fn finish_store(
    commit: impl Future<Output = StoreResult<()>>,
    close: impl Future<Output = StoreResult<()>>,
) -> Result<()> {
    let committed = commit.await;
    let closed = close.await;
    committed.context("Failed to commit paintings store")?;
    closed.context("Failed to close paintings store")?;
    Ok(())
}
