//! Wix Blog scraper.

use super::{page_title, push_candidate, resolve_href, search_url, SiteDriver};
use crate::session::Session;
use crate::types::ExtractedItem;
use crate::Result;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

pub const WIX_BASE_URL: &str = "https://www.wix.com";

const TITLE_LINK_SELECTOR: &str = "a[data-hook='item-title']";
const PARAGRAPH_SELECTOR: &str = "div.blog-post-content p";
const NO_CONTENT: &str = "No content found in blog-post-content";

#[derive(Debug, Clone)]
pub struct WixDriver {
    base_url: String,
}

impl Default for WixDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl WixDriver {
    pub fn new() -> Self {
        Self::with_base_url(WIX_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SiteDriver for WixDriver {
    #[instrument(level = "info", skip(self, session))]
    async fn discover_candidates(
        &self,
        session: &mut dyn Session,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        session
            .navigate(&search_url(&self.base_url, "/blog/search-results?q=", keyword))
            .await?;

        let mut urls = Vec::new();
        for link in session.find_all(TITLE_LINK_SELECTOR)? {
            if let Some(url) = link
                .attribute("href")
                .and_then(|href| resolve_href(session, href))
            {
                push_candidate(&mut urls, url, limit);
            }
        }

        info!(count = urls.len(), "Indexed Wix blog URLs");
        Ok(urls)
    }

    #[instrument(level = "info", skip(self, session))]
    async fn fetch_and_extract(
        &self,
        session: &mut dyn Session,
        url: &str,
    ) -> Result<ExtractedItem> {
        session.navigate(url).await?;

        let mut text = session
            .find_all(PARAGRAPH_SELECTOR)?
            .into_iter()
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            debug!(%url, "Blog post has no content container");
            text = NO_CONTENT.to_string();
        }

        Ok(ExtractedItem {
            url: url.to_string(),
            title: page_title(session)?,
            text,
        })
    }
}
