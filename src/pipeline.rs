use crate::acquisition::{AcquisitionOrchestrator, AcquisitionSettings};
use crate::config::DigestConfig;
use crate::session::{HttpSessionProvider, SessionProvider};
use crate::sources::Registry;
use crate::summarize::{OllamaSummarizer, Summarizer, SummaryReducer};
use crate::types::{AcquisitionResult, PipelineResult, SiteId, SiteSummary};
use crate::{DigestError, Result, NO_CONTENT_SCRAPED};
use futures::{stream, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

/// The `Pipeline` turns a keyword and a list of sites into one summary per site.
///
/// Acquisition and summarization run as two consecutive stages, each one task per site on a
/// pool no larger than the number of sites.
#[derive(Clone)]
pub struct Pipeline {
    acquisition: AcquisitionOrchestrator,
    reducer: SummaryReducer,
    max_site_workers: usize,
    default_sites: Vec<SiteId>,
}

impl Pipeline {
    /// Creates a pipeline from explicit collaborators.
    ///
    /// # Arguments
    ///
    /// * `config` - Limits, reducer settings and default sites.
    /// * `registry` - The drivers available to requests.
    /// * `provider` - Hands out one session per site task.
    /// * `summarizer` - The shared summarization model.
    pub fn new(
        config: &DigestConfig,
        registry: Registry,
        provider: Arc<dyn SessionProvider>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            acquisition: AcquisitionOrchestrator::new(
                Arc::new(registry),
                provider,
                AcquisitionSettings::from(config),
            ),
            reducer: SummaryReducer::new(summarizer, config.reducer.clone()),
            max_site_workers: config.max_site_workers,
            default_sites: config.default_sites.iter().map(SiteId::new).collect(),
        }
    }

    /// Creates a pipeline with the built-in sites, HTTP sessions and the configured Ollama model.
    pub fn from_config(config: &DigestConfig) -> Result<Self> {
        let provider = HttpSessionProvider::new(config)?;
        let summarizer = OllamaSummarizer::new(config.llm.clone());
        Ok(Self::new(
            config,
            Registry::default(),
            Arc::new(provider),
            Arc::new(summarizer),
        ))
    }

    /// Runs a request given as a keyword and an optional comma-separated site list.
    pub async fn run_request(&self, keyword: &str, sites: Option<&str>) -> Result<PipelineResult> {
        let sites = sites.map(SiteId::parse_list).unwrap_or_default();
        self.run(keyword, &sites).await
    }

    /// Scrapes and summarizes `keyword` on every site in `sites`.
    ///
    /// An empty site list means the configured default sites.
    ///
    /// # Returns
    ///
    /// A `PipelineResult` with exactly one entry per distinct site. Per-site failures are
    /// entries with an error; the only error returned is `DigestError::InvalidRequest` for a
    /// blank keyword.
    #[instrument(level = "info", skip(self, sites))]
    pub async fn run(&self, keyword: &str, sites: &[SiteId]) -> Result<PipelineResult> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(DigestError::InvalidRequest(
                "keyword must not be empty".to_string(),
            ));
        }
        let sites = if sites.is_empty() {
            self.default_sites.as_slice()
        } else {
            sites
        };

        let t0 = Instant::now();
        info!(%keyword, sites = ?sites, "Received request");

        let acquired = self.acquisition.run(keyword, sites).await;
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Scraping completed"
        );

        let workers = self.max_site_workers.min(acquired.len()).max(1);
        let summaries: Vec<SiteSummary> = stream::iter(acquired.into_values())
            .map(|acquisition| {
                let reducer = self.reducer.clone();
                async move {
                    let site = acquisition.site.clone();
                    match tokio::spawn(summarize_site(reducer, acquisition)).await {
                        Ok(summary) => summary,
                        Err(e) => {
                            error!(%site, error = %e, "Summarization task aborted");
                            SiteSummary::failed(site, format!("Summarization aborted: {}", e))
                        }
                    }
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        let results: BTreeMap<SiteId, SiteSummary> = summaries
            .into_iter()
            .filter_map(|summary| summary.site.clone().map(|site| (site, summary)))
            .collect();

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            results = results.len(),
            "Returning summary results"
        );
        Ok(PipelineResult {
            keyword: keyword.to_string(),
            results,
        })
    }
}

/// Reduces one site's acquisition to its final record.
async fn summarize_site(reducer: SummaryReducer, acquisition: AcquisitionResult) -> SiteSummary {
    let AcquisitionResult {
        site,
        text,
        sources,
        error,
    } = acquisition;

    if let Some(error) = error {
        return SiteSummary::failed(site, error);
    }
    if text.trim().is_empty() {
        return SiteSummary::failed(site, NO_CONTENT_SCRAPED);
    }

    let summary = reducer.summarize(&text).await;
    SiteSummary::summarized(site, summary, sources)
}
