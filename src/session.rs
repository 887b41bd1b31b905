//! Automation sessions used by source drivers to load pages and query their elements.
//!
//! A [`SessionProvider`] hands out one exclusively owned [`Session`] per site task. The
//! default provider, [`HttpSessionProvider`], loads pages over HTTP with `reqwest` and answers
//! element queries with `scraper`; drivers only depend on the trait.

use crate::config::DigestConfig;
use crate::scraper::{Element, PageDocument};
use crate::{DigestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

/// A single automation session, owned by exactly one task for its whole lifetime.
#[async_trait]
pub trait Session: Send + Sync {
    /// Loads `url`, waiting a bounded time for it to become ready.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// URL of the currently loaded page, if any.
    fn current_url(&self) -> Option<&str>;

    /// All elements of the current page matching `selector`, in document order.
    fn find_all(&self, selector: &str) -> Result<Vec<Element>>;

    /// Releases the session's resources.
    async fn release(self: Box<Self>) -> Result<()>;
}

/// Creates sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn Session>>;
}

/// The `HttpSessionProvider` creates sessions sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct HttpSessionProvider {
    /// The HTTP client used for making requests.
    client: Client,
}

impl HttpSessionProvider {
    /// Creates a new `HttpSessionProvider` with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the user agent and the per-navigation timeout.
    ///
    /// # Returns
    ///
    /// A `Result` containing the provider, or an error if the client could not be created.
    pub fn new(config: &DigestConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.navigation_timeout())
            .gzip(true)
            .build()
            .map_err(DigestError::RequestError)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn acquire(&self) -> Result<Box<dyn Session>> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            page: None,
        }))
    }
}

/// A session that loads pages with plain HTTP requests.
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    page: Option<PageDocument>,
}

#[async_trait]
impl Session for HttpSession {
    #[instrument(skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Connection", "keep-alive")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Sec-Fetch-User", "?1")
            .send()
            .await?;

        let status = response.status();
        debug!(%status, "Response status");
        if !status.is_success() {
            return Err(DigestError::NavigationError(format!(
                "{} returned {}",
                url, status
            )));
        }

        let final_url = response.url().to_string();
        let html = response.text().await?;
        self.page = Some(PageDocument::new(final_url, html));
        Ok(())
    }

    fn current_url(&self) -> Option<&str> {
        self.page.as_ref().map(PageDocument::url)
    }

    fn find_all(&self, selector: &str) -> Result<Vec<Element>> {
        match &self.page {
            Some(page) => page.select(selector),
            None => Err(DigestError::NavigationError(
                "no page loaded in session".to_string(),
            )),
        }
    }

    async fn release(self: Box<Self>) -> Result<()> {
        debug!(last_url = ?self.current_url(), "Released HTTP session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that a navigated page can be queried.
    #[tokio::test]
    async fn test_navigate_and_find() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/post")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body><p>One</p><p>Two</p></body></html>")
            .create_async()
            .await;

        let provider = HttpSessionProvider::new(&DigestConfig::default()).unwrap();
        let mut session = provider.acquire().await.unwrap();
        let url = format!("{}/post", server.url());
        session.navigate(&url).await.unwrap();

        let texts: Vec<String> = session
            .find_all("p")
            .unwrap()
            .into_iter()
            .map(|e| e.text)
            .collect();
        assert_eq!(texts, vec!["One", "Two"]);
        assert_eq!(session.current_url(), Some(url.as_str()));

        session.release().await.unwrap();
        page.assert_async().await;
    }

    /// Tests that error statuses are navigation failures.
    #[tokio::test]
    async fn test_error_status_fails_navigation() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/gone")
            .with_status(404)
            .create_async()
            .await;

        let provider = HttpSessionProvider::new(&DigestConfig::default()).unwrap();
        let mut session = provider.acquire().await.unwrap();
        let result = session.navigate(&format!("{}/gone", server.url())).await;

        assert!(matches!(result, Err(DigestError::NavigationError(_))));
        assert!(session.find_all("p").is_err());
    }
}
