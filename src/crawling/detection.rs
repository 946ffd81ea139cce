//! Face-detection stage
//!
//! Runs once at the end of every crawl over the whole image directory. The detector
//! itself is an external program; it is expected to record its results in the
//! paintings store, which is what later crawls consult.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::{IMAGE_EXTENSION, title_from_filename};
use crate::infrastructure::DetectionConfig;

#[async_trait]
pub trait DetectionStage: Send + Sync {
    async fn detect(&self, directory: &Path) -> Result<()>;
}

/// Canonical titles of the images in `directory`, sorted
pub async fn image_titles(directory: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(directory)
        .await
        .with_context(|| format!("Failed to read image directory {directory:?}"))?;

    let mut titles = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else { continue };
        if name.ends_with(IMAGE_EXTENSION) && entry.file_type().await?.is_file() {
            titles.push(title_from_filename(name));
        }
    }
    titles.sort();
    Ok(titles)
}

async fn log_images(directory: &Path) {
    match image_titles(directory).await {
        Ok(titles) => {
            info!("{} images in {:?}", titles.len(), directory);
            debug!("Images: {:?}", titles);
        }
        Err(e) => warn!("{:#}", e),
    }
}

/// Used when no detector is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDetectionStage;

#[async_trait]
impl DetectionStage for LoggingDetectionStage {
    async fn detect(&self, directory: &Path) -> Result<()> {
        log_images(directory).await;
        info!("No face detector configured; skipping detection over {:?}", directory);
        Ok(())
    }
}

/// Runs `program args... <directory>` and requires a zero exit status
#[derive(Debug, Clone)]
pub struct CommandDetectionStage {
    program: String,
    args: Vec<String>,
}

impl CommandDetectionStage {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl DetectionStage for CommandDetectionStage {
    async fn detect(&self, directory: &Path) -> Result<()> {
        log_images(directory).await;
        info!("Running face detection: {} {:?} {:?}", self.program, self.args, directory);

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(directory)
            .status()
            .await
            .with_context(|| format!("Failed to start detector {}", self.program))?;

        if !status.success() {
            bail!("Detector {} exited with {}", self.program, status);
        }

        info!("Face detection finished for {:?}", directory);
        Ok(())
    }
}

/// Detection stage described by the configuration
pub fn detection_stage_from_config(config: &DetectionConfig) -> Box<dyn DetectionStage> {
    match &config.command {
        Some(program) => Box::new(CommandDetectionStage::new(program.clone(), config.args.clone())),
        None => Box::new(LoggingDetectionStage),
    }
}
