//! Infrastructure layer: configuration, logging, HTTP, HTML extraction and the
//! relational stores.

pub mod config;
pub mod database_connection;
pub mod dedup_store;
pub mod gallery_parser;
pub mod http_client;
pub mod landmark_store;
pub mod logging;
pub mod parsing_error;
pub mod store_error;
pub mod store_session;

pub use config::{AppConfig, ConfigManager, CrawlerConfig, DetectionConfig, LoggingConfig, StorageConfig};
pub use database_connection::DatabaseConnection;
pub use dedup_store::DedupStore;
pub use http_client::{HttpClient, HttpClientConfig};
pub use landmark_store::{DEFAULT_BRANCH, LandmarkStore};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing_error::{ParsingError, ParsingResult};
pub use store_error::{StoreError, StoreResult};
