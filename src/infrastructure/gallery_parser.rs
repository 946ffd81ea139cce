//! HTML extraction for the gallery site
//!
//! Listing pages render a grid of `<li>` entries inside `ul.listing-grid`. Each entry
//! links to a detail page and carries a `span.title`, optionally with a nested
//! `span.date` that is not part of the title. Detail pages show the artwork inside
//! `div.artwork`.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::domain::CrawlItem;
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

lazy_static! {
    static ref LISTING_GRID: Selector = Selector::parse("ul.listing-grid").expect("static selector");
    static ref LISTING_ENTRY: Selector = Selector::parse("li").expect("static selector");
    static ref ENTRY_LINK: Selector = Selector::parse("a[href]").expect("static selector");
    static ref ENTRY_TITLE: Selector = Selector::parse("span.title").expect("static selector");
    static ref ARTWORK_IMAGE: Selector = Selector::parse("div.artwork img[src]").expect("static selector");
}

fn resolve_url(href: &str, base_url: &str) -> ParsingResult<String> {
    let base = Url::parse(base_url).map_err(|e| ParsingError::url_resolution_failed(base_url, e))?;
    base.join(href.trim())
        .map(String::from)
        .map_err(|e| ParsingError::url_resolution_failed(href, e))
}

fn is_date_annotation(element: &scraper::node::Element) -> bool {
    element.name() == "span" && element.classes().any(|class| class == "date")
}

/// Text of a title element, leaving out any nested date annotation
pub fn title_text(title: ElementRef<'_>) -> String {
    let text: String = title
        .descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != title.id())
                .any(|ancestor| ancestor.value().as_element().is_some_and(is_date_annotation))
        })
        .map(|(_, text)| &**text)
        .collect();
    text.trim().to_string()
}

/// Extract every entry of a listing page
pub fn parse_listing(html: &str, page_url: &str) -> ParsingResult<Vec<CrawlItem>> {
    let document = Html::parse_document(html);

    let grid = document
        .select(&LISTING_GRID)
        .next()
        .ok_or_else(|| ParsingError::ListingNotFound { url: page_url.to_string() })?;

    let mut items = Vec::new();
    for (index, entry) in grid.select(&LISTING_ENTRY).enumerate() {
        let Some(href) = entry.select(&ENTRY_LINK).next().and_then(|a| a.value().attr("href")) else {
            warn!("Listing entry #{} on {} has no link, skipping", index, page_url);
            continue;
        };
        let Some(title) = entry.select(&ENTRY_TITLE).next() else {
            warn!("Listing entry #{} on {} has no title, skipping", index, page_url);
            continue;
        };

        let source_url = match resolve_url(href, page_url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Listing entry #{} on {}: {}, skipping", index, page_url, e);
                continue;
            }
        };

        items.push(CrawlItem::new(source_url, title_text(title)));
    }

    debug!("Extracted {} entries from {}", items.len(), page_url);
    Ok(items)
}

/// Extract the absolute image URL from an artwork detail page
pub fn parse_image_url(html: &str, page_url: &str) -> ParsingResult<String> {
    let document = Html::parse_document(html);
    let src = document
        .select(&ARTWORK_IMAGE)
        .next()
        .and_then(|img| img.value().attr("src"))
        .ok_or_else(|| ParsingError::ImageNotFound { url: page_url.to_string() })?;

    resolve_url(src, page_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::normalize;

    const PAGE_URL: &str = "https://artuk.org/discover/artworks/view_as/grid//page/1";

    const LISTING_HTML: &str = r#"
        <html><body>
        <ul class="listing-grid listing masonary-grid">
            <li>
                <a href="/discover/artworks/starry-night-1">
                    <span class="title">Starry Night <span class="date">(1889)</span></span>
                </a>
            </li>
            <li>
                <a href="https://artuk.org/discover/artworks/the-hay-wain-2">
                    <span class="title">The Hay-Wain</span>
                </a>
            </li>
            <li><span class="title">Entry without a link</span></li>
        </ul>
        </body></html>
    "#;

    #[test]
    fn test_listing_entries_are_extracted() {
        let items = parse_listing(LISTING_HTML, PAGE_URL).unwrap();
        assert_eq!(
            items,
            vec![
                CrawlItem::new("https://artuk.org/discover/artworks/starry-night-1", "Starry Night"),
                CrawlItem::new("https://artuk.org/discover/artworks/the-hay-wain-2", "The Hay-Wain"),
            ]
        );
    }

    #[test]
    fn test_date_annotation_is_stripped_before_normalizing() {
        let items = parse_listing(LISTING_HTML, PAGE_URL).unwrap();
        let normalized = normalize(&items[0].raw_title);
        assert_eq!(normalized.canonical, "Starry Night");
        assert_eq!(normalized.filename, "Starry_Night.jpg");
    }

    #[test]
    fn test_unresolvable_link_skips_only_that_entry() {
        let html = r#"<ul class="listing-grid">
            <li><a href="http://[broken"><span class="title">Broken Link</span></a></li>
            <li><a href="/discover/artworks/sunflowers-3"><span class="title">Sunflowers</span></a></li>
        </ul>"#;
        let items = parse_listing(html, PAGE_URL).unwrap();
        assert_eq!(
            items,
            vec![CrawlItem::new("https://artuk.org/discover/artworks/sunflowers-3", "Sunflowers")]
        );
    }

    #[test]
    fn test_missing_grid_is_an_error() {
        let err = parse_listing("<html><body><p>maintenance</p></body></html>", PAGE_URL).unwrap_err();
        assert_eq!(err, ParsingError::ListingNotFound { url: PAGE_URL.to_string() });
    }

    #[test]
    fn test_image_url_is_resolved_against_page() {
        let html = r#"<div class="artwork"><img src="/images/starry.jpg" alt=""></div>"#;
        let url = parse_image_url(html, "https://artuk.org/discover/artworks/starry-night-1").unwrap();
        assert_eq!(url, "https://artuk.org/images/starry.jpg");
    }

    #[test]
    fn test_detail_page_without_artwork_fails() {
        let html = r#"<div class="other"><img src="/logo.png"></div>"#;
        let err = parse_image_url(html, PAGE_URL).unwrap_err();
        assert!(matches!(err, ParsingError::ImageNotFound { .. }));
    }
}
