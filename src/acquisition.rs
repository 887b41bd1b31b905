//! Concurrent acquisition of raw content from several sites.
//!
//! Every supported site gets its own task which acquires a session, runs the site's driver and
//! releases the session again, whatever the outcome. Tasks run on a bounded pool and
//! [`AcquisitionOrchestrator::run`] returns only after all of them finished; a failing, panicking
//! or stalled site only ever affects its own entry.

use crate::config::DigestConfig;
use crate::session::SessionProvider;
use crate::sources::{DriverConstructor, Registry, SessionDriver};
use crate::types::{AcquisitionResult, SiteId, SourceItem};
use crate::{Result, UNSUPPORTED_SITE};
use futures::{stream, FutureExt, StreamExt};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout_at;
use tracing::{debug, error, info, instrument, warn};

/// Limits applied to every site task.
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionSettings {
    /// Candidates kept from discovery.
    pub max_candidates: usize,
    /// Candidates visited for extraction.
    pub max_items_per_site: usize,
    /// Sites processed at the same time.
    pub max_site_workers: usize,
    /// Upper bound for one site task, session release excluded.
    pub site_timeout: Duration,
}

impl From<&DigestConfig> for AcquisitionSettings {
    fn from(config: &DigestConfig) -> Self {
        Self {
            max_candidates: config.max_candidates,
            max_items_per_site: config.max_items_per_site,
            max_site_workers: config.max_site_workers,
            site_timeout: config.site_timeout(),
        }
    }
}

/// The `AcquisitionOrchestrator` fans a keyword out to one driver per site and collects the results.
#[derive(Clone)]
pub struct AcquisitionOrchestrator {
    registry: Arc<Registry>,
    provider: Arc<dyn SessionProvider>,
    settings: AcquisitionSettings,
}

impl AcquisitionOrchestrator {
    pub fn new(
        registry: Arc<Registry>,
        provider: Arc<dyn SessionProvider>,
        settings: AcquisitionSettings,
    ) -> Self {
        Self {
            registry,
            provider,
            settings,
        }
    }

    /// Acquires content about `keyword` from every site in `sites`.
    ///
    /// # Returns
    ///
    /// One entry per distinct site. Sites without a driver are marked unsupported without any
    /// work being started; every other failure is recorded in the site's own entry.
    #[instrument(level = "info", skip(self, sites), fields(sites = sites.len()))]
    pub async fn run(&self, keyword: &str, sites: &[SiteId]) -> BTreeMap<SiteId, AcquisitionResult> {
        let t0 = Instant::now();
        let mut results = BTreeMap::new();
        let mut supported: Vec<(SiteId, DriverConstructor)> = Vec::new();

        for site in sites {
            if results.contains_key(site) || supported.iter().any(|(s, _)| s == site) {
                continue;
            }
            match self.registry.resolve(site) {
                Ok(constructor) => supported.push((site.clone(), constructor)),
                Err(e) => {
                    warn!(%site, error = %e, "Skipping unsupported site");
                    results.insert(
                        site.clone(),
                        AcquisitionResult::failure(site.clone(), UNSUPPORTED_SITE),
                    );
                }
            }
        }

        let workers = self.settings.max_site_workers.min(supported.len()).max(1);
        info!(supported = supported.len(), workers, "Starting acquisition");

        let finished: Vec<AcquisitionResult> = stream::iter(supported)
            .map(|(site, constructor)| {
                let provider = Arc::clone(&self.provider);
                let settings = self.settings;
                let keyword = keyword.to_string();
                async move {
                    let task = tokio::spawn(acquire_site(
                        site.clone(),
                        constructor,
                        provider,
                        keyword,
                        settings,
                    ));
                    match task.await {
                        Ok(result) => result,
                        Err(e) => {
                            error!(%site, error = %e, "Site task aborted");
                            AcquisitionResult::failure(site, format!("Site task aborted: {}", e))
                        }
                    }
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        for result in finished {
            results.insert(result.site.clone(), result);
        }

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            failed = results.values().filter(|r| r.error.is_some()).count(),
            "Acquisition completed"
        );
        results
    }
}

/// Runs one site from session acquisition to release.
///
/// `site_timeout` bounds session acquisition and collection together. Once a session is held it
/// is released whether collection succeeds, fails, times out or panics.
#[instrument(level = "info", skip(constructor, provider, keyword, settings), fields(%site))]
async fn acquire_site(
    site: SiteId,
    constructor: DriverConstructor,
    provider: Arc<dyn SessionProvider>,
    keyword: String,
    settings: AcquisitionSettings,
) -> AcquisitionResult {
    let t0 = Instant::now();
    let deadline = tokio::time::Instant::now() + settings.site_timeout;

    let opened = timeout_at(
        deadline,
        SessionDriver::open(site.clone(), &constructor, provider.as_ref()),
    )
    .await;
    let mut driver = match opened {
        Ok(Ok(driver)) => driver,
        Ok(Err(e)) => {
            error!(error = %e, "Could not start site driver");
            return AcquisitionResult::failure(site, e.to_string());
        }
        Err(_) => {
            warn!(timeout = ?settings.site_timeout, "Timed out acquiring a session");
            return timed_out(site, &settings);
        }
    };

    let outcome = AssertUnwindSafe(timeout_at(
        deadline,
        collect(&mut driver, &keyword, &settings),
    ))
    .catch_unwind()
    .await;
    driver.release().await;

    let result = match outcome {
        Ok(Ok(Ok(result))) => result,
        Ok(Ok(Err(e))) => {
            error!(error = %e, "Scraping failed");
            AcquisitionResult::failure(site, e.to_string())
        }
        Ok(Err(_)) => {
            warn!(timeout = ?settings.site_timeout, "Site task timed out");
            timed_out(site, &settings)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(panic = %message, "Site driver panicked");
            AcquisitionResult::failure(site, format!("Site driver panicked: {}", message))
        }
    };

    info!(
        elapsed_ms = t0.elapsed().as_millis() as u64,
        chars = result.text.len(),
        sources = result.sources.len(),
        "Site acquisition finished"
    );
    result
}

fn timed_out(site: SiteId, settings: &AcquisitionSettings) -> AcquisitionResult {
    AcquisitionResult::failure(
        site,
        format!("Timed out after {}s", settings.site_timeout.as_secs()),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Discovers candidates and extracts the first `max_items_per_site` of them.
async fn collect(
    driver: &mut SessionDriver,
    keyword: &str,
    settings: &AcquisitionSettings,
) -> Result<AcquisitionResult> {
    let site = driver.site().clone();
    let candidates = driver
        .discover_candidates(keyword, settings.max_candidates)
        .await?;
    if candidates.is_empty() {
        info!(%site, "No candidates found");
    }

    let mut texts = Vec::new();
    let mut sources: Vec<SourceItem> = Vec::new();
    for url in candidates.iter().take(settings.max_items_per_site) {
        let item = driver.fetch_and_extract(url).await?;
        debug!(%url, chars = item.text.len(), "Extracted item");

        let text = item.text.trim();
        if !text.is_empty() {
            texts.push(text.to_string());
        }
        if let Some(source) = SourceItem::from_extracted(&item, &site) {
            if !sources.iter().any(|s| s.url == source.url) {
                sources.push(source);
            }
        }
    }

    Ok(AcquisitionResult::success(site, texts.join(" "), sources))
}
