//! Fetches the events listing and each event's page

pub mod detail;
pub mod listing;

pub use detail::parse_detail;
pub use listing::parse_listing;

use crate::components::events::{collapse_whitespace, RawEvent};
use crate::config::Config;
use crate::error::{network_error, AppResult};
use reqwest::Client;
use scraper::ElementRef;
use tracing::{debug, info, warn};
use url::Url;

/// Elements whose text is never page content
const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// Visible text nodes under `element`, whitespace-collapsed, empty ones dropped
pub(crate) fn text_chunks(element: ElementRef<'_>) -> Vec<String> {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?.value().as_element()?;
            if SKIPPED_ELEMENTS.contains(&parent.name()) {
                return None;
            }
            let chunk = collapse_whitespace(text);
            (!chunk.is_empty()).then_some(chunk)
        })
        .collect()
}

/// Whitespace-collapsed text of an element
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    text_chunks(element).join(" ")
}

/// HTTP side of scraping
#[derive(Debug, Clone)]
pub struct Scraper {
    client: Client,
    source_url: Url,
}

impl Scraper {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| network_error(&format!("Failed to build HTTP client: {}", e)))?;
        let source_url = Url::parse(&config.source_url)
            .map_err(|e| network_error(&format!("Invalid source URL: {}", e)))?;
        Ok(Self { client, source_url })
    }

    async fn fetch(&self, url: &str) -> AppResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(&format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(network_error(&format!(
                "Failed to fetch {}: HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| network_error(&format!("Failed to read {}: {}", url, e)))
    }

    /// Listing cards without their detail pages
    pub async fn fetch_listing(&self) -> AppResult<Vec<RawEvent>> {
        let html = self.fetch(self.source_url.as_str()).await?;
        let raws = parse_listing(&html, &self.source_url);
        info!("Found {} events on {}", raws.len(), self.source_url);
        Ok(raws)
    }

    /// Listing cards completed with their detail pages.
    ///
    /// Only the listing fetch is fatal; a detail page that cannot be fetched
    /// leaves its card as it was.
    pub async fn scrape(&self) -> AppResult<Vec<RawEvent>> {
        let mut raws = self.fetch_listing().await?;

        for raw in raws.iter_mut() {
            let Some(url) = raw.url.clone() else { continue };
            match self.fetch(&url).await {
                Ok(html) => {
                    debug!("Fetched details for {}", url);
                    raw.detail = Some(parse_detail(&html));
                }
                Err(e) => warn!("Skipping details for {}: {}", url, e),
            }
        }

        Ok(raws)
    }
}
