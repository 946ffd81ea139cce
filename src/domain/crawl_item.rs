use serde::{Deserialize, Serialize};

use super::title::{NormalizedTitle, normalize};

/// One gallery entry as it appears on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlItem {
    /// Absolute URL of the artwork detail page
    pub source_url: String,
    /// Display title with any date annotation already removed
    pub raw_title: String,
}

impl CrawlItem {
    pub fn new(source_url: impl Into<String>, raw_title: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            raw_title: raw_title.into(),
        }
    }

    pub fn normalized_title(&self) -> NormalizedTitle {
        normalize(&self.raw_title)
    }
}
