//! Domain module - core values of the harvester
//!
//! Title normalization, the transient crawl item, and the metadata records the
//! stores persist. Nothing in here performs I/O.

pub mod crawl_item;
pub mod records;
pub mod title;

pub use crawl_item::CrawlItem;
pub use records::{BoundingBoxRecord, FaceBox, Geometry, LandmarkRecord, Point};
pub use title::{IMAGE_EXTENSION, MAX_TITLE_LEN, NormalizedTitle, normalize, title_from_filename};
