//! Medium scraper.
//!
//! Candidates come from the story cards of Medium's search page. Cards marked as member-only
//! stories are skipped, since their body is not served to anonymous readers.

use super::{page_title, push_candidate, search_url, SiteDriver};
use crate::session::Session;
use crate::types::ExtractedItem;
use crate::Result;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

pub const MEDIUM_BASE_URL: &str = "https://medium.com";

const MEMBER_ONLY_SELECTOR: &str = "button[aria-label='Member-only story']";
const PARAGRAPH_SELECTOR: &str = "[data-selectable-paragraph]";

#[derive(Debug, Clone)]
pub struct MediumDriver {
    base_url: String,
}

impl Default for MediumDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MediumDriver {
    pub fn new() -> Self {
        Self::with_base_url(MEDIUM_BASE_URL)
    }

    /// A driver reading from another host, e.g. a local test server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn card_selector(&self) -> String {
        format!("div[data-href^='{}/']", self.base_url)
    }
}

#[async_trait]
impl SiteDriver for MediumDriver {
    #[instrument(level = "info", skip(self, session))]
    async fn discover_candidates(
        &self,
        session: &mut dyn Session,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        session
            .navigate(&search_url(&self.base_url, "/search?q=", keyword))
            .await?;

        let mut urls = Vec::new();
        for card in session.find_all(&self.card_selector())? {
            if !card.select(MEMBER_ONLY_SELECTOR)?.is_empty() {
                debug!(href = ?card.attribute("data-href"), "Skipping member-only story");
                continue;
            }
            if let Some(href) = card.attribute("data-href") {
                push_candidate(&mut urls, href.to_string(), limit);
            }
        }

        info!(count = urls.len(), "Indexed Medium story URLs");
        Ok(urls)
    }

    #[instrument(level = "info", skip(self, session))]
    async fn fetch_and_extract(
        &self,
        session: &mut dyn Session,
        url: &str,
    ) -> Result<ExtractedItem> {
        session.navigate(url).await?;

        let text = session
            .find_all(PARAGRAPH_SELECTOR)?
            .into_iter()
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        debug!(bytes = text.len(), "Parsed Medium story");
        Ok(ExtractedItem {
            url: url.to_string(),
            title: page_title(session)?,
            text,
        })
    }
}
