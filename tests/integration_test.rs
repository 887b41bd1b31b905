use async_trait::async_trait;
use blogdigest::{
    config::{DigestConfig, ReducerConfig},
    scraper::Element,
    session::{Session, SessionProvider},
    sources::{Registry, SiteDriver},
    summarize::Summarizer,
    types::ExtractedItem,
    DigestError, Pipeline, Result, SiteId,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A session that never loads anything; the stub drivers below do not need one.
struct IdleSession;

#[async_trait]
impl Session for IdleSession {
    async fn navigate(&mut self, _url: &str) -> Result<()> {
        Ok(())
    }

    fn current_url(&self) -> Option<&str> {
        None
    }

    fn find_all(&self, _selector: &str) -> Result<Vec<Element>> {
        Ok(Vec::new())
    }

    async fn release(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

struct IdleProvider;

#[async_trait]
impl SessionProvider for IdleProvider {
    async fn acquire(&self) -> Result<Box<dyn Session>> {
        Ok(Box::new(IdleSession))
    }
}

/// Returns one article with fixed text, or fails when `text` is `None`.
struct FixedDriver {
    text: Option<&'static str>,
}

#[async_trait]
impl SiteDriver for FixedDriver {
    async fn discover_candidates(
        &self,
        _session: &mut dyn Session,
        keyword: &str,
        _limit: usize,
    ) -> Result<Vec<String>> {
        match self.text {
            Some(_) => Ok(vec![format!("https://blog.test/{}", keyword)]),
            None => Err(DigestError::NavigationError("search page crashed".to_string())),
        }
    }

    async fn fetch_and_extract(
        &self,
        _session: &mut dyn Session,
        url: &str,
    ) -> Result<ExtractedItem> {
        Ok(ExtractedItem {
            url: url.to_string(),
            title: Some("Stub article".to_string()),
            text: self.text.unwrap_or_default().to_string(),
        })
    }
}

/// Echoes its input truncated to 50 characters and counts calls.
#[derive(Default)]
struct EchoSummarizer {
    calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for EchoSummarizer {
    async fn summarize(&self, text: &str, _max_length: usize, _min_length: usize) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.chars().take(50).collect())
    }
}

/// Echoes the first word after a delay derived from the input.
struct JitterSummarizer;

#[async_trait]
impl Summarizer for JitterSummarizer {
    async fn summarize(&self, text: &str, _max_length: usize, _min_length: usize) -> Result<String> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        tokio::time::sleep(Duration::from_millis(hasher.finish() % 40)).await;
        Ok(text.split_whitespace().next().unwrap_or_default().to_string())
    }
}

fn registry(sites: &[(&'static str, Option<&'static str>)]) -> Registry {
    sites.iter().fold(Registry::empty(), |registry, &(site, text)| {
        registry.with_driver(site, move || Box::new(FixedDriver { text }))
    })
}

fn pipeline(
    registry: Registry,
    summarizer: Arc<dyn Summarizer>,
    reducer: ReducerConfig,
) -> Pipeline {
    let config = DigestConfig {
        reducer,
        ..DigestConfig::default()
    };
    Pipeline::new(&config, registry, Arc::new(IdleProvider), summarizer)
}

#[tokio::test]
async fn test_supported_and_unsupported_sites() {
    let summarizer = Arc::new(EchoSummarizer::default());
    let pipeline = pipeline(
        registry(&[("medium", Some("Rust is a systems language."))]),
        summarizer.clone(),
        ReducerConfig::default(),
    );

    let result = pipeline.run_request("rust", Some("medium,bogus")).await.unwrap();

    assert_eq!(result.keyword, "rust");
    let medium = &result.results[&SiteId::new("medium")];
    assert_eq!(medium.summary.as_deref(), Some("Rust is a systems language."));
    assert!(medium.error.is_none());
    assert_eq!(medium.sources.len(), 1);
    assert_eq!(medium.sources[0].url, "https://blog.test/rust");
    assert_eq!(medium.sources[0].title, "Stub article");

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        json["results"]["bogus"],
        serde_json::json!({"error": "Unsupported site", "sources": []})
    );
    assert_eq!(json["results"]["medium"]["sources"][0]["website"], "medium");
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_text_is_reported_without_summarizing() {
    let summarizer = Arc::new(EchoSummarizer::default());
    let pipeline = pipeline(
        registry(&[("wix", Some("   "))]),
        summarizer.clone(),
        ReducerConfig::default(),
    );

    let result = pipeline.run_request("rust", Some("wix")).await.unwrap();
    let wix = &result.results[&SiteId::new("wix")];

    assert_eq!(wix.error.as_deref(), Some("No valid content scraped"));
    assert!(wix.summary.is_none());
    assert!(wix.sources.is_empty());
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failing_site_does_not_affect_others() {
    let pipeline = pipeline(
        registry(&[
            ("devto", None),
            ("medium", Some("Ownership and borrowing keep memory safe without a collector.")),
        ]),
        Arc::new(EchoSummarizer::default()),
        ReducerConfig::default(),
    );

    let result = pipeline.run_request("rust", Some("devto,medium")).await.unwrap();

    let devto = &result.results[&SiteId::new("devto")];
    assert!(devto.error.as_deref().unwrap().contains("search page crashed"));
    assert!(devto.summary.is_none());
    assert!(devto.sources.is_empty());

    let medium = &result.results[&SiteId::new("medium")];
    assert!(medium.summary.is_some());
    assert!(medium.error.is_none());
}

#[tokio::test]
async fn test_one_entry_per_distinct_site() {
    let pipeline = pipeline(
        registry(&[("medium", Some("Rust is a systems language."))]),
        Arc::new(EchoSummarizer::default()),
        ReducerConfig::default(),
    );

    let result = pipeline
        .run_request("rust", Some("medium, MEDIUM ,bogus,Bogus,other"))
        .await
        .unwrap();

    let sites: Vec<&str> = result.results.keys().map(SiteId::as_str).collect();
    assert_eq!(sites, vec!["bogus", "medium", "other"]);
    for summary in result.results.values() {
        assert_ne!(summary.summary.is_some(), summary.error.is_some());
    }
}

#[tokio::test]
async fn test_identical_requests_give_identical_results() {
    let pipeline = pipeline(
        registry(&[
            ("medium", Some("Rust is a systems language.")),
            ("devto", None),
        ]),
        Arc::new(EchoSummarizer::default()),
        ReducerConfig::default(),
    );

    let first = pipeline.run_request("rust", Some("medium,devto,bogus")).await.unwrap();
    let second = pipeline.run_request("rust", Some("medium,devto,bogus")).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_chunk_order_survives_parallel_completion() {
    let text: &'static str = Box::leak(
        (0..24)
            .map(|n| format!("part{:02} of the long article body. ", n))
            .collect::<String>()
            .into_boxed_str(),
    );
    let reducer = ReducerConfig {
        chunk_size: 33,
        short_input_threshold: 10,
        ..ReducerConfig::default()
    };

    let parallel = pipeline(
        registry(&[("medium", Some(text))]),
        Arc::new(JitterSummarizer),
        reducer.clone(),
    );
    let sequential = pipeline(
        registry(&[("medium", Some(text))]),
        Arc::new(JitterSummarizer),
        ReducerConfig {
            max_chunk_workers: 1,
            ..reducer
        },
    );

    let parallel = parallel.run_request("rust", Some("medium")).await.unwrap();
    let sequential = sequential.run_request("rust", Some("medium")).await.unwrap();

    let expected = (0..24)
        .map(|n| format!("part{:02}", n))
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(parallel, sequential);
    assert_eq!(
        parallel.results[&SiteId::new("medium")].summary.as_deref(),
        Some(expected.as_str())
    );
}

#[tokio::test]
async fn test_default_site_and_blank_keyword() {
    let pipeline = pipeline(
        registry(&[("medium", Some("Rust is a systems language."))]),
        Arc::new(EchoSummarizer::default()),
        ReducerConfig::default(),
    );

    let result = pipeline.run_request("rust", None).await.unwrap();
    assert_eq!(result.results.len(), 1);
    assert!(result.results.contains_key(&SiteId::new("medium")));

    let blank = pipeline.run_request("   ", Some("medium")).await;
    assert!(matches!(blank, Err(DigestError::InvalidRequest(_))));
}
