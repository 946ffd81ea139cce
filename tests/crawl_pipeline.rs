//! End-to-end coordinator behaviour against in-process fakes

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

use artwork_harvester::crawling::{
    CoordinatorConfig, DetectionStage, DownloadCoordinator, FetchError, FetchOutcome, FetchRequest, GallerySource,
    ImageFetcher, ItemOutcome, OrchestrationError, RunState, SharedCounter,
};
use artwork_harvester::domain::{CrawlItem, normalize};
use artwork_harvester::infrastructure::{DedupStore, ParsingError};

struct FakeSource {
    items: Vec<CrawlItem>,
    fail: bool,
    requested_pages: Mutex<Vec<u32>>,
}

impl FakeSource {
    fn with_items(items: Vec<CrawlItem>) -> Self {
        Self {
            items,
            fail: false,
            requested_pages: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            items: Vec::new(),
            fail: true,
            requested_pages: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GallerySource for FakeSource {
    async fn list_page(&self, page: u32) -> Result<Vec<CrawlItem>, OrchestrationError> {
        self.requested_pages.lock().unwrap().push(page);
        if self.fail {
            return Err(ParsingError::ListingNotFound {
                url: format!("fake://page/{page}"),
            }
            .into());
        }
        Ok(self.items.clone())
    }
}

#[derive(Default)]
struct FakeFetcher {
    time_out: HashSet<String>,
    delay: Duration,
    requests: Mutex<Vec<FetchRequest>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, request: &FetchRequest, counter: &SharedCounter) -> Result<FetchOutcome, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let outcome = if self.time_out.contains(&request.title) {
            FetchOutcome::TimedOut {
                title: request.title.clone(),
            }
        } else {
            tokio::fs::write(&request.destination, b"jpeg")
                .await
                .map_err(|source| FetchError::Io {
                    path: request.destination.clone(),
                    source,
                })?;
            FetchOutcome::Success {
                sequence: counter.increment(),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(outcome)
    }
}

/// Counts invocations and snapshots the directory contents at call time
#[derive(Default)]
struct FakeDetection {
    calls: AtomicUsize,
    files_seen: Mutex<Vec<usize>>,
    fail: bool,
}

#[async_trait]
impl DetectionStage for FakeDetection {
    async fn detect(&self, directory: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let files = std::fs::read_dir(directory).map(|entries| entries.count()).unwrap_or(0);
        self.files_seen.lock().unwrap().push(files);
        if self.fail {
            return Err(anyhow!("detector crashed"));
        }
        Ok(())
    }
}

fn listing(count: usize) -> Vec<CrawlItem> {
    (0..count)
        .map(|i| CrawlItem::new(format!("https://gallery.test/artworks/{i}"), format!("Portrait no. {i} (18{i:02})")))
        .collect()
}

struct Harness {
    source: Arc<FakeSource>,
    fetcher: Arc<FakeFetcher>,
    detection: Arc<FakeDetection>,
    store: Arc<DedupStore>,
}

impl Harness {
    async fn new(source: FakeSource, fetcher: FakeFetcher, detection: FakeDetection) -> Self {
        Self {
            source: Arc::new(source),
            fetcher: Arc::new(fetcher),
            detection: Arc::new(detection),
            store: Arc::new(DedupStore::in_memory().await.unwrap()),
        }
    }

    fn coordinator(&self, concurrency: usize) -> DownloadCoordinator {
        DownloadCoordinator::new(
            self.source.clone(),
            self.fetcher.clone(),
            self.detection.clone(),
            self.store.clone(),
            CoordinatorConfig {
                page_size: 20,
                concurrency,
            },
        )
    }
}

#[tokio::test]
async fn known_titles_are_skipped_and_timeouts_do_not_stop_the_run() {
    let items = listing(25);
    let known: Vec<String> = items[..3].iter().map(|item| item.normalized_title().canonical).collect();
    let timed_out_title = items[10].normalized_title().canonical;

    let fetcher = FakeFetcher {
        time_out: HashSet::from([timed_out_title.clone()]),
        ..FakeFetcher::default()
    };
    let harness = Harness::new(FakeSource::with_items(items), fetcher, FakeDetection::default()).await;
    for title in &known {
        harness.store.record_no_face(title).await.unwrap();
    }

    let dir = tempdir().unwrap();
    let images = dir.path().join("images");
    let report = harness.coordinator(4).crawl(&images, 1000).await;

    assert_eq!(report.page, 50);
    assert_eq!(*harness.source.requested_pages.lock().unwrap(), vec![50]);
    assert_eq!(report.entries_seen, 25);
    assert_eq!(report.skipped, known);
    assert_eq!(report.dispatched, 22);
    assert_eq!(report.outcomes.len(), 22);
    assert_eq!(report.downloaded, 21);
    assert_eq!(report.timed_out(), 1);
    assert!(report.is_clean());
    assert!(
        report
            .outcomes
            .contains(&ItemOutcome::TimedOut { title: timed_out_title })
    );

    // Detection ran once, after every dispatched fetch had finished.
    assert_eq!(harness.detection.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*harness.detection.files_seen.lock().unwrap(), vec![21]);

    let requested: HashSet<String> = harness
        .fetcher
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|request| request.title.clone())
        .collect();
    for title in &known {
        assert!(!requested.contains(title), "{title} should not have been fetched");
    }
}

#[tokio::test]
async fn sequence_numbers_are_distinct_and_dense() {
    let harness = Harness::new(
        FakeSource::with_items(listing(12)),
        FakeFetcher::default(),
        FakeDetection::default(),
    )
    .await;
    let dir = tempdir().unwrap();

    let report = harness.coordinator(3).crawl(dir.path(), 20).await;

    let mut sequences: Vec<u64> = report
        .outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            ItemOutcome::Downloaded { sequence, .. } => Some(*sequence),
            _ => None,
        })
        .collect();
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=12).collect::<Vec<_>>());
    assert_eq!(report.downloaded, 12);
}

#[tokio::test]
async fn images_are_written_under_their_normalized_filenames() {
    let items = vec![CrawlItem::new("https://gallery.test/a", "  The Hay Wain, (1821)  ")];
    let harness = Harness::new(FakeSource::with_items(items), FakeFetcher::default(), FakeDetection::default()).await;
    let dir = tempdir().unwrap();

    harness.coordinator(1).crawl(dir.path(), 1).await;

    let expected = normalize("The Hay Wain, (1821)");
    assert_eq!(expected.filename, "The_Hay_Wain_1821.jpg");
    assert!(dir.path().join(&expected.filename).exists());
    let requests = harness.fetcher.requests.lock().unwrap();
    assert_eq!(requests[0].destination, dir.path().join("The_Hay_Wain_1821.jpg"));
    assert_eq!(requests[0].title, "The Hay Wain 1821");
}

#[tokio::test]
async fn listing_failure_still_runs_detection_once() {
    let harness = Harness::new(FakeSource::failing(), FakeFetcher::default(), FakeDetection::default()).await;
    let dir = tempdir().unwrap();

    let report = harness.coordinator(2).crawl(dir.path(), 40).await;

    assert!(matches!(
        report.orchestration_error,
        Some(OrchestrationError::ListingMalformed(ParsingError::ListingNotFound { .. }))
    ));
    assert_eq!(report.dispatched, 0);
    assert_eq!(report.downloaded, 0);
    assert_eq!(harness.detection.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        report.states,
        vec![
            RunState::Init,
            RunState::Enumerating,
            RunState::Draining,
            RunState::Finalizing,
            RunState::Done
        ]
    );
}

#[tokio::test]
async fn detection_failure_is_reported_without_losing_downloads() {
    let detection = FakeDetection {
        fail: true,
        ..FakeDetection::default()
    };
    let harness = Harness::new(FakeSource::with_items(listing(5)), FakeFetcher::default(), detection).await;
    let dir = tempdir().unwrap();

    let report = harness.coordinator(2).crawl(dir.path(), 5).await;

    assert_eq!(report.downloaded, 5);
    assert!(report.orchestration_error.is_none());
    assert!(report.detection_error.as_deref().unwrap_or_default().contains("detector crashed"));
    assert!(!report.is_clean());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_fetches_never_exceed_the_concurrency_bound() {
    let fetcher = FakeFetcher {
        delay: Duration::from_millis(20),
        ..FakeFetcher::default()
    };
    let harness = Harness::new(FakeSource::with_items(listing(16)), fetcher, FakeDetection::default()).await;
    let dir = tempdir().unwrap();

    let report = harness.coordinator(2).crawl(dir.path(), 16).await;

    assert_eq!(report.downloaded, 16);
    assert!(harness.fetcher.peak_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn untitled_entries_are_not_dispatched() {
    let items = vec![
        CrawlItem::new("https://gallery.test/1", "!!! ???"),
        CrawlItem::new("https://gallery.test/2", "Sunflowers"),
    ];
    let harness = Harness::new(FakeSource::with_items(items), FakeFetcher::default(), FakeDetection::default()).await;
    let dir = tempdir().unwrap();

    let report = harness.coordinator(2).crawl(dir.path(), 2).await;

    assert_eq!(report.untitled, 1);
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.outcomes[0].title(), "Sunflowers");
}

#[tokio::test]
async fn unusable_image_directory_is_an_orchestration_error() {
    let harness = Harness::new(
        FakeSource::with_items(listing(3)),
        FakeFetcher::default(),
        FakeDetection::default(),
    )
    .await;
    let dir = tempdir().unwrap();
    let blocker: PathBuf = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let report = harness.coordinator(2).crawl(&blocker.join("images"), 3).await;

    assert!(matches!(report.orchestration_error, Some(OrchestrationError::Directory { .. })));
    assert!(harness.source.requested_pages.lock().unwrap().is_empty());
    assert_eq!(harness.detection.calls.load(Ordering::SeqCst), 1);
}

struct PanickingSource;

#[async_trait]
impl GallerySource for PanickingSource {
    async fn list_page(&self, page: u32) -> Result<Vec<CrawlItem>, OrchestrationError> {
        panic!("listing page {page} blew up");
    }
}

#[tokio::test]
async fn panicking_source_still_finalizes_with_detection() {
    let detection = Arc::new(FakeDetection::default());
    let coordinator = DownloadCoordinator::new(
        Arc::new(PanickingSource),
        Arc::new(FakeFetcher::default()),
        detection.clone(),
        Arc::new(DedupStore::in_memory().await.unwrap()),
        CoordinatorConfig {
            page_size: 20,
            concurrency: 2,
        },
    );
    let dir = tempdir().unwrap();

    let report = coordinator.crawl(dir.path(), 20).await;

    assert!(matches!(report.orchestration_error, Some(OrchestrationError::Aborted(_))));
    assert_eq!(report.dispatched, 0);
    assert_eq!(detection.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        report.states,
        vec![
            RunState::Init,
            RunState::Enumerating,
            RunState::Draining,
            RunState::Finalizing,
            RunState::Done
        ]
    );
}
