//! Artwork Harvester
//!
//! Crawls an online art gallery, downloads artwork images that the paintings store
//! has not seen yet and hands the image directory to a face-detection stage.

pub mod application;
pub mod crawling;
pub mod domain;
pub mod infrastructure;
