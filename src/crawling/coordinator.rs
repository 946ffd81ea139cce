//! # Download Coordinator
//!
//! Drives one crawl: selects the listing page, filters entries already known to the
//! paintings store, fans the rest out to a bounded pool of fetch tasks, waits for
//! all of them and finally runs face detection over the image directory.
//!
//! ```text
//! Init -> Enumerating -> Dispatching -> Draining -> Finalizing -> Done
//!              \______________\______ error ______/
//! ```
//!
//! An error or panic while enumerating or dispatching is logged and recorded; tasks
//! already dispatched are still drained and detection still runs exactly once.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::crawling::OrchestrationError;
use crate::crawling::counter::SharedCounter;
use crate::crawling::detection::DetectionStage;
use crate::crawling::fetcher::{FetchError, FetchOutcome, FetchRequest, ImageFetcher};
use crate::crawling::gallery_source::GallerySource;
use crate::infrastructure::{CrawlerConfig, DedupStore};

/// Listing page that holds the `max_items`-th entry
///
/// Only this single page is fetched; earlier pages are not revisited.
pub fn listing_page_for(max_items: u32, page_size: u32) -> u32 {
    max_items.div_ceil(page_size.max(1)).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Enumerating,
    Dispatching,
    Draining,
    Finalizing,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::Enumerating => "enumerating",
            RunState::Dispatching => "dispatching",
            RunState::Draining => "draining",
            RunState::Finalizing => "finalizing",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}

/// What happened to one dispatched item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Downloaded { title: String, sequence: u64 },
    TimedOut { title: String },
    Failed { title: String, error: String },
}

impl ItemOutcome {
    pub fn title(&self) -> &str {
        match self {
            ItemOutcome::Downloaded { title, .. } | ItemOutcome::TimedOut { title } | ItemOutcome::Failed { title, .. } => {
                title
            }
        }
    }
}

/// Summary of a single crawl
#[derive(Debug)]
pub struct CrawlReport {
    pub directory: PathBuf,
    pub page: u32,
    /// Entries the listing page produced
    pub entries_seen: usize,
    /// Titles already present in the paintings store
    pub skipped: Vec<String>,
    /// Entries whose title normalized to nothing
    pub untitled: usize,
    pub dispatched: usize,
    /// One entry per dispatched item, in dispatch order
    pub outcomes: Vec<ItemOutcome>,
    /// Final value of the shared download counter
    pub downloaded: u64,
    pub orchestration_error: Option<OrchestrationError>,
    pub detection_error: Option<String>,
    /// States visited, in order
    pub states: Vec<RunState>,
}

impl CrawlReport {
    fn new(directory: &Path, page: u32) -> Self {
        Self {
            directory: directory.to_path_buf(),
            page,
            entries_seen: 0,
            skipped: Vec::new(),
            untitled: 0,
            dispatched: 0,
            outcomes: Vec::new(),
            downloaded: 0,
            orchestration_error: None,
            detection_error: None,
            states: Vec::new(),
        }
    }

    pub fn timed_out(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, ItemOutcome::TimedOut { .. })).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, ItemOutcome::Failed { .. })).count()
    }

    /// No orchestration, item or detection errors
    pub fn is_clean(&self) -> bool {
        self.orchestration_error.is_none() && self.detection_error.is_none() && self.failed() == 0
    }

    fn enter(&mut self, state: RunState) {
        debug!("Crawl state -> {}", state);
        self.states.push(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub page_size: u32,
    /// Upper bound on in-flight fetch tasks
    pub concurrency: usize,
}

impl CoordinatorConfig {
    pub fn from_crawler_config(config: &CrawlerConfig) -> Self {
        Self {
            page_size: config.page_size,
            concurrency: config.download_concurrency(),
        }
    }
}

type PendingDownload = (String, JoinHandle<Result<FetchOutcome, FetchError>>);

/// Progress the dispatch task reports back to the coordinating task
enum DispatchEvent {
    Entered(RunState),
    Listed(usize),
    Untitled,
    Skipped(String),
    Dispatched(PendingDownload),
}

/// Enumerate and dispatch phase, run as its own task so that a panic in the
/// source or the store still leaves the coordinator to drain and finalize
struct Dispatcher {
    source: Arc<dyn GallerySource>,
    fetcher: Arc<dyn ImageFetcher>,
    store: Arc<DedupStore>,
    concurrency: usize,
    directory: PathBuf,
    page: u32,
    counter: SharedCounter,
    events: UnboundedSender<DispatchEvent>,
}

impl Dispatcher {
    fn emit(&self, event: DispatchEvent) {
        // The receiver outlives this task
        let _ = self.events.send(event);
    }

    fn enter(&self, state: RunState) {
        debug!("Crawl state -> {}", state);
        self.emit(DispatchEvent::Entered(state));
    }

    async fn run(self) -> Result<(), OrchestrationError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| OrchestrationError::Directory {
                path: self.directory.clone(),
                source,
            })?;

        self.enter(RunState::Enumerating);
        let items = self.source.list_page(self.page).await?;
        info!("Listing page {} has {} entries", self.page, items.len());
        self.emit(DispatchEvent::Listed(items.len()));

        self.enter(RunState::Dispatching);
        let slots = Arc::new(Semaphore::new(self.concurrency.max(1)));

        for item in items {
            let normalized = item.normalized_title();
            if normalized.is_empty() {
                warn!("Skipping entry without a usable title: {:?}", item.raw_title);
                self.emit(DispatchEvent::Untitled);
                continue;
            }

            let known = self
                .store
                .exists(&normalized.canonical)
                .await
                .map_err(|source| OrchestrationError::Store {
                    title: normalized.canonical.clone(),
                    source,
                })?;
            if known {
                info!("Already exists: {}", normalized.canonical);
                self.emit(DispatchEvent::Skipped(normalized.canonical));
                continue;
            }

            let request = FetchRequest {
                item_url: item.source_url,
                destination: self.directory.join(&normalized.filename),
                title: normalized.canonical.clone(),
            };
            let fetcher = Arc::clone(&self.fetcher);
            let slots = Arc::clone(&slots);
            let counter = self.counter.clone();

            let handle = tokio::spawn(async move {
                let _permit = slots
                    .acquire_owned()
                    .await
                    .map_err(|e| FetchError::Aborted(e.to_string()))?;
                fetcher.fetch(&request, &counter).await
            });

            self.emit(DispatchEvent::Dispatched((normalized.canonical, handle)));
        }

        Ok(())
    }
}

pub struct DownloadCoordinator {
    source: Arc<dyn GallerySource>,
    fetcher: Arc<dyn ImageFetcher>,
    detection: Arc<dyn DetectionStage>,
    store: Arc<DedupStore>,
    config: CoordinatorConfig,
}

impl DownloadCoordinator {
    pub fn new(
        source: Arc<dyn GallerySource>,
        fetcher: Arc<dyn ImageFetcher>,
        detection: Arc<dyn DetectionStage>,
        store: Arc<DedupStore>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            source,
            fetcher,
            detection,
            store,
            config,
        }
    }

    pub async fn crawl(&self, directory: &Path, max_items: u32) -> CrawlReport {
        let page = listing_page_for(max_items, self.config.page_size);
        let mut report = CrawlReport::new(directory, page);
        report.enter(RunState::Init);
        info!(
            "Starting crawl: page {} into {:?} with {} download slots",
            page, directory, self.config.concurrency
        );

        let counter = SharedCounter::new();
        let (events, mut received) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher {
            source: Arc::clone(&self.source),
            fetcher: Arc::clone(&self.fetcher),
            store: Arc::clone(&self.store),
            concurrency: self.config.concurrency,
            directory: directory.to_path_buf(),
            page,
            counter: counter.clone(),
            events,
        };

        match tokio::spawn(dispatcher.run()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Error in download: {}", e);
                report.orchestration_error = Some(e);
            }
            Err(join_error) => {
                error!("Dispatch did not complete: {}", join_error);
                report.orchestration_error = Some(OrchestrationError::Aborted(join_error.to_string()));
            }
        }

        // The dispatch task is gone, so every event it sent is already queued.
        let mut pending: Vec<PendingDownload> = Vec::new();
        while let Ok(event) = received.try_recv() {
            match event {
                DispatchEvent::Entered(state) => report.states.push(state),
                DispatchEvent::Listed(count) => report.entries_seen = count,
                DispatchEvent::Untitled => report.untitled += 1,
                DispatchEvent::Skipped(title) => report.skipped.push(title),
                DispatchEvent::Dispatched(download) => {
                    report.dispatched += 1;
                    pending.push(download);
                }
            }
        }

        report.enter(RunState::Draining);
        for (title, handle) in pending {
            let outcome = match handle.await {
                Ok(Ok(FetchOutcome::Success { sequence })) => ItemOutcome::Downloaded { title, sequence },
                Ok(Ok(FetchOutcome::TimedOut { .. })) => ItemOutcome::TimedOut { title },
                Ok(Err(e)) => {
                    error!("Failed to download {}: {}", title, e);
                    ItemOutcome::Failed { title, error: e.to_string() }
                }
                Err(join_error) => {
                    error!("Download task for {} did not complete: {}", title, join_error);
                    ItemOutcome::Failed {
                        title,
                        error: join_error.to_string(),
                    }
                }
            };
            report.outcomes.push(outcome);
        }
        report.downloaded = counter.get();
        info!("Download finished.");

        report.enter(RunState::Finalizing);
        if let Err(e) = self.detection.detect(directory).await {
            error!("Face detection failed: {:#}", e);
            report.detection_error = Some(format!("{e:#}"));
        }

        report.enter(RunState::Done);
        info!(
            "Crawl done: {} seen, {} skipped, {} dispatched, {} downloaded, {} timed out, {} failed",
            report.entries_seen,
            report.skipped.len(),
            report.dispatched,
            report.downloaded,
            report.timed_out(),
            report.failed()
        );
        report
    }
}
