//! DEV Community (dev.to) scraper.
//!
//! Article bodies live in `#article-body`. Headings, paragraphs and links inside it are read in
//! document order; links keep their target next to their text.

use super::{page_title, push_candidate, resolve_href, search_url, SiteDriver};
use crate::session::Session;
use crate::types::ExtractedItem;
use crate::Result;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

pub const DEVTO_BASE_URL: &str = "https://dev.to";

/// Only the first few story titles of a search page are considered.
const MAX_STORY_TITLES: usize = 5;
const STORY_TITLE_SELECTOR: &str = "h3.crayons-story__title";
const ARTICLE_BODY_SELECTOR: &str = "#article-body";
const TEXT_BLOCK_SELECTOR: &str = "p, h1, h2, h3, a";
const NO_ARTICLE_BODY: &str = "No div with id='article-body' found";
const EMPTY_ARTICLE_BODY: &str = "No content found in article-body";

#[derive(Debug, Clone)]
pub struct DevtoDriver {
    base_url: String,
}

impl Default for DevtoDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DevtoDriver {
    pub fn new() -> Self {
        Self::with_base_url(DEVTO_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SiteDriver for DevtoDriver {
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
        for title in session
            .find_all(STORY_TITLE_SELECTOR)?
            .into_iter()
            .take(MAX_STORY_TITLES)
        {
            // titles without a link are skipped
            let Some(link) = title.select("a")?.into_iter().next() else {
                continue;
            };
            if let Some(url) = link
                .attribute("href")
                .and_then(|href| resolve_href(session, href))
            {
                push_candidate(&mut urls, url, limit);
            }
        }

        info!(count = urls.len(), "Indexed DEV article URLs");
        Ok(urls)
    }

    #[instrument(level = "info", skip(self, session))]
    async fn fetch_and_extract(
        &self,
        session: &mut dyn Session,
        url: &str,
    ) -> Result<ExtractedItem> {
        session.navigate(url).await?;
        let title = page_title(session)?;

        let Some(body) = session.find_all(ARTICLE_BODY_SELECTOR)?.into_iter().next() else {
            debug!(%url, "Article has no body container");
            return Ok(ExtractedItem {
                url: url.to_string(),
                title,
                text: NO_ARTICLE_BODY.to_string(),
            });
        };

        let blocks: Vec<String> = body
            .select(TEXT_BLOCK_SELECTOR)?
            .into_iter()
            .filter(|e| !e.text.is_empty())
            .map(|e| match e.attribute("href") {
                Some(href) => format!("{} ({})", e.text, href),
                None => e.text,
            })
            .collect();

        let text = if blocks.is_empty() {
            EMPTY_ARTICLE_BODY.to_string()
        } else {
            blocks.join(" ")
        };

        debug!(bytes = text.len(), "Parsed DEV article");
        Ok(ExtractedItem {
            url: url.to_string(),
            title,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{HttpSessionProvider, SessionProvider};
    use crate::sources::testing::CannedSession;
    use crate::DigestConfig;

    #[tokio::test]
    async fn test_discovery_reads_story_titles() {
        let search = r#"
            <h3 class="crayons-story__title"><a href="/ana/async-rust-1a2b">Async Rust</a></h3>
            <h3 class="crayons-story__title">No link here</h3>
            <h3 class="crayons-story__title"><a href="/ana/async-rust-1a2b">Async Rust again</a></h3>
            <h3 class="crayons-story__title"><a href="https://dev.to/bo/tokio-3c4d">Tokio</a></h3>
        "#;
        let mut session =
            CannedSession::default().with_page("https://dev.to/search?q=async", search);

        let urls = DevtoDriver::new()
            .discover_candidates(&mut session, "async", 10)
            .await
            .unwrap();

        assert_eq!(
            urls,
            vec!["https://dev.to/ana/async-rust-1a2b", "https://dev.to/bo/tokio-3c4d"]
        );
    }

    #[tokio::test]
    async fn test_extract_keeps_document_order_and_links() {
        let article = r#"
            <h1>Async Rust</h1>
            <div id="article-body">
                <h2>Intro</h2>
                <p>Futures are lazy.</p>
                <a href="https://tokio.rs">Tokio</a>
                <p>Executors poll them.</p>
            </div>
        "#;
        let url = "https://dev.to/ana/async-rust-1a2b";
        let mut session = CannedSession::default().with_page(url, article);

        let item = DevtoDriver::new()
            .fetch_and_extract(&mut session, url)
            .await
            .unwrap();

        assert_eq!(
            item.text,
            "Intro Futures are lazy. Tokio (https://tokio.rs) Executors poll them."
        );
        assert_eq!(item.title.as_deref(), Some("Async Rust"));
    }

    #[tokio::test]
    async fn test_missing_and_empty_body_are_placeholders() {
        let mut session = CannedSession::default()
            .with_page("https://dev.to/a", "<p>no body</p>")
            .with_page("https://dev.to/b", "<div id=\"article-body\"><p> </p></div>");
        let driver = DevtoDriver::new();

        let missing = driver.fetch_and_extract(&mut session, "https://dev.to/a").await.unwrap();
        let empty = driver.fetch_and_extract(&mut session, "https://dev.to/b").await.unwrap();

        assert_eq!(missing.text, NO_ARTICLE_BODY);
        assert_eq!(empty.text, EMPTY_ARTICLE_BODY);
    }

    /// Tests discovery and extraction over HTTP against a local server.
    #[tokio::test]
    async fn test_http_session_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/search?q=rust")
            .with_status(200)
            .with_body(r#"<h3 class="crayons-story__title"><a href="/ana/rust-1">Rust</a></h3>"#)
            .create_async()
            .await;
        let _article = server
            .mock("GET", "/ana/rust-1")
            .with_status(200)
            .with_body(r#"<h1>Rust</h1><div id="article-body"><p>Ownership rules.</p></div>"#)
            .create_async()
            .await;

        let provider = HttpSessionProvider::new(&DigestConfig::default()).unwrap();
        let mut session = provider.acquire().await.unwrap();
        let driver = DevtoDriver::with_base_url(server.url());

        let urls = driver
            .discover_candidates(session.as_mut(), "rust", 10)
            .await
            .unwrap();
        assert_eq!(urls, vec![format!("{}/ana/rust-1", server.url())]);

        let item = driver
            .fetch_and_extract(session.as_mut(), &urls[0])
            .await
            .unwrap();
        assert_eq!(item.text, "Ownership rules.");
        session.release().await.unwrap();
    }
}
