use async_trait::async_trait;
use tracing::info;

use crate::crawling::OrchestrationError;
use crate::domain::CrawlItem;
use crate::infrastructure::HttpClient;
use crate::infrastructure::gallery_parser::parse_listing;

/// Produces the entries of one gallery listing page
#[async_trait]
pub trait GallerySource: Send + Sync {
    async fn list_page(&self, page: u32) -> Result<Vec<CrawlItem>, OrchestrationError>;
}

/// Listing pages fetched over HTTP from a `{page}` URL template
#[derive(Debug, Clone)]
pub struct HttpGallerySource {
    client: HttpClient,
    listing_url_template: String,
}

impl HttpGallerySource {
    pub fn new(client: HttpClient, listing_url_template: impl Into<String>) -> Self {
        Self {
            client,
            listing_url_template: listing_url_template.into(),
        }
    }

    pub fn page_url(&self, page: u32) -> String {
        self.listing_url_template.replace("{page}", &page.to_string())
    }
}

#[async_trait]
impl GallerySource for HttpGallerySource {
    async fn list_page(&self, page: u32) -> Result<Vec<CrawlItem>, OrchestrationError> {
        let url = self.page_url(page);
        info!("Requesting listing page {}: {}", page, url);

        let html = self
            .client
            .fetch_text(&url)
            .await
            .map_err(|source| OrchestrationError::ListingUnavailable { url: url.clone(), source })?;

        Ok(parse_listing(&html, &url)?)
    }
}
