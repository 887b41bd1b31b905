//! Source drivers for the supported blog sites and the registry that selects them.
//!
//! Every driver follows the same two-phase pattern:
//!
//! 1. **Discovery**: search the site for a keyword and return candidate article URLs
//! 2. **Extraction**: visit one URL and return its title and text
//!
//! # Supported Sites
//!
//! | Site | Module | Listing | Content |
//! |------|--------|---------|---------|
//! | Medium | [`medium`] | `/search?q=` cards, member-only stories skipped | `[data-selectable-paragraph]` |
//! | Wix Blog | [`wix`] | `/blog/search-results?q=` titles | `div.blog-post-content p` |
//! | DEV | [`devto`] | `/search?q=` story titles | `#article-body` text blocks |
//!
//! Drivers never own a session. [`SessionDriver`] pairs a driver with the session acquired for
//! one task and is the only thing the orchestrator talks to.

pub mod devto;
pub mod medium;
pub mod wix;

use crate::session::{Session, SessionProvider};
use crate::types::{ExtractedItem, SiteId};
use crate::{DigestError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

pub use devto::DevtoDriver;
pub use medium::MediumDriver;
pub use wix::WixDriver;

/// Site-specific navigation and extraction logic.
#[async_trait]
pub trait SiteDriver: Send + Sync {
    /// Searches the site for `keyword` and returns at most `limit` candidate URLs.
    ///
    /// Finding nothing is an empty vector, not an error.
    async fn discover_candidates(
        &self,
        session: &mut dyn Session,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<String>>;

    /// Visits `url` and extracts its content.
    ///
    /// A page missing the expected content container yields an item with placeholder or empty
    /// text rather than an error.
    async fn fetch_and_extract(&self, session: &mut dyn Session, url: &str)
        -> Result<ExtractedItem>;
}

/// Builds a fresh driver for one task.
pub type DriverConstructor = Arc<dyn Fn() -> Box<dyn SiteDriver> + Send + Sync>;

/// The `Registry` maps site identifiers to driver constructors.
///
/// The table is fixed once built; sites are added with [`Registry::with_driver`] before the
/// registry is handed to a pipeline.
#[derive(Clone)]
pub struct Registry {
    drivers: BTreeMap<SiteId, DriverConstructor>,
}

impl Default for Registry {
    /// The registry of all built-in sites.
    fn default() -> Self {
        Self::empty()
            .with_driver("medium", || Box::new(MediumDriver::new()))
            .with_driver("wix", || Box::new(WixDriver::new()))
            .with_driver("devto", || Box::new(DevtoDriver::new()))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("sites", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// A registry without any site.
    pub fn empty() -> Self {
        Self {
            drivers: BTreeMap::new(),
        }
    }

    /// Registers `constructor` for `site`, replacing any previous registration.
    pub fn with_driver<F>(mut self, site: impl Into<SiteId>, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn SiteDriver> + Send + Sync + 'static,
    {
        self.drivers.insert(site.into(), Arc::new(constructor));
        self
    }

    /// Looks up the constructor for `site`.
    ///
    /// # Returns
    ///
    /// The registered constructor, or `DigestError::UnsupportedSite` when `site` is unknown.
    pub fn resolve(&self, site: &SiteId) -> Result<DriverConstructor> {
        self.drivers
            .get(site)
            .cloned()
            .ok_or_else(|| DigestError::UnsupportedSite(site.to_string()))
    }

    /// Registered sites, in sorted order.
    pub fn sites(&self) -> impl Iterator<Item = &SiteId> {
        self.drivers.keys()
    }
}

/// A driver bound to the session acquired for it.
///
/// Created per (request, site) and consumed by [`SessionDriver::release`].
pub struct SessionDriver {
    site: SiteId,
    driver: Box<dyn SiteDriver>,
    session: Box<dyn Session>,
}

impl SessionDriver {
    /// Acquires a session and binds it to a freshly constructed driver.
    ///
    /// # Errors
    ///
    /// Returns `DigestError::SessionError` when no session can be acquired.
    #[instrument(level = "debug", skip(constructor, provider), fields(%site))]
    pub async fn open(
        site: SiteId,
        constructor: &DriverConstructor,
        provider: &dyn SessionProvider,
    ) -> Result<Self> {
        let session = provider.acquire().await.map_err(|e| match e {
            DigestError::SessionError(_) => e,
            other => DigestError::SessionError(other.to_string()),
        })?;
        debug!("Acquired session");

        Ok(Self {
            site,
            driver: constructor(),
            session,
        })
    }

    pub fn site(&self) -> &SiteId {
        &self.site
    }

    pub async fn discover_candidates(&mut self, keyword: &str, limit: usize) -> Result<Vec<String>> {
        self.driver
            .discover_candidates(self.session.as_mut(), keyword, limit)
            .await
    }

    pub async fn fetch_and_extract(&mut self, url: &str) -> Result<ExtractedItem> {
        self.driver.fetch_and_extract(self.session.as_mut(), url).await
    }

    /// Releases the session. Release failures are logged, never returned.
    pub async fn release(self) {
        let site = self.site;
        match self.session.release().await {
            Ok(()) => debug!(%site, "Session released"),
            Err(e) => warn!(%site, error = %e, "Failed to release session"),
        }
    }
}

/// Builds a search URL with the keyword percent-encoded.
pub(crate) fn search_url(base_url: &str, path_and_query: &str, keyword: &str) -> String {
    format!(
        "{}{}{}",
        base_url.trim_end_matches('/'),
        path_and_query,
        urlencoding::encode(keyword.trim())
    )
}

/// Resolves `href` against the session's current page.
pub(crate) fn resolve_href(session: &dyn Session, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    match Url::parse(href) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(_) => {
            let base = Url::parse(session.current_url()?).ok()?;
            base.join(href).ok().map(|u| u.to_string())
        }
    }
}

/// Appends `url` unless it is already present or `urls` is full.
pub(crate) fn push_candidate(urls: &mut Vec<String>, url: String, limit: usize) {
    if urls.len() < limit && !urls.contains(&url) {
        urls.push(url);
    }
}

/// Title of the current page: the first non-empty `h1`, else `<title>`.
pub(crate) fn page_title(session: &dyn Session) -> Result<Option<String>> {
    for selector in ["h1", "title"] {
        if let Some(title) = session
            .find_all(selector)?
            .into_iter()
            .map(|e| e.text)
            .find(|text| !text.is_empty())
        {
            return Ok(Some(title));
        }
    }
    Ok(None)
}
