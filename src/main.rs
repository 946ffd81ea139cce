use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use artwork_harvester::application::{HarvestOverrides, HarvestUseCase};
use artwork_harvester::infrastructure::logging::{init_logging_with_config, log_system_info};
use artwork_harvester::infrastructure::ConfigManager;

/// Download gallery artworks and run face detection over them
#[derive(Parser, Debug)]
#[command(name = "artwork-harvester", version, about)]
struct Cli {
    /// Configuration file; defaults to the per-user config directory
    #[arg(long, env = "ARTWORK_HARVESTER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the images are written to
    #[arg(long, short = 'd')]
    directory: Option<PathBuf>,

    /// Number of listing entries the crawl targets
    #[arg(long, short = 'n')]
    max_items: Option<u32>,

    /// Maximum simultaneous downloads
    #[arg(long, short = 'j')]
    concurrency: Option<usize>,
}

impl Cli {
    fn overrides(&self) -> HarvestOverrides {
        HarvestOverrides {
            directory: self.directory.clone(),
            max_items: self.max_items,
            concurrency: self.concurrency,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let mut config = config_manager
        .load_config()
        .await
        .with_context(|| format!("Failed to load configuration from {:?}", config_manager.config_path))?;
    cli.overrides().apply(&mut config);

    init_logging_with_config(&config.logging)?;
    log_system_info();
    info!("Configuration loaded from {:?}", config_manager.config_path);

    let report = HarvestUseCase::new(config).run().await?;

    if let Some(e) = report.orchestration_error {
        error!("Crawl stopped early: {}", e);
        return Err(e.into());
    }
    Ok(())
}
