use crate::Result;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "blogdigest.toml";
/// Prefix of environment variables overriding configuration values.
pub const ENV_PREFIX: &str = "BLOGDIGEST";

/// The `DigestConfig` struct holds the configuration settings for the pipeline.
/// It covers navigation limits, worker pool sizes, the chunk reducer and the LLM backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Sites scraped when a request does not name any.
    pub default_sites: Vec<String>,
    /// The user agent string sent with every navigation.
    pub user_agent: String,
    /// Upper bound for a single navigation, in seconds.
    pub navigation_timeout_secs: u64,
    /// Upper bound for one site's complete acquisition, in seconds.
    pub site_timeout_secs: u64,
    /// Number of candidate locations kept from a site's listing.
    pub max_candidates: usize,
    /// Number of candidates actually visited per site.
    pub max_items_per_site: usize,
    /// Cap on sites processed at the same time.
    pub max_site_workers: usize,
    /// The settings of the chunk-and-reduce summarizer.
    pub reducer: ReducerConfig,
    /// The configuration settings for the Language Model (LLM).
    pub llm: LLMConfig,
}

/// The `ReducerConfig` struct controls how long texts are split and summarized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    /// Maximum chunk length, in characters.
    pub chunk_size: usize,
    /// Texts shorter than this many characters are summarized in one call.
    pub short_input_threshold: usize,
    /// Chunks with fewer words are not sent to the model.
    pub min_chunk_words: usize,
    /// Upper length hint passed to the model.
    pub max_length: usize,
    /// Lower length hint passed to the model.
    pub min_length: usize,
    /// Cap on chunks summarized at the same time.
    pub max_chunk_workers: usize,
}

/// The `LLMConfig` struct holds the configuration settings for the Language Model (LLM).
/// It includes the endpoint URL, model name and temperature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// The endpoint URL for the LLM API.
    pub endpoint: String,
    /// The model used for summaries.
    pub model: String,
    /// The temperature setting for the LLM, controlling the randomness of the output.
    pub temperature: f32,
}

impl Default for DigestConfig {
    /// Provides default values for the `DigestConfig` struct.
    fn default() -> Self {
        Self {
            default_sites: vec![String::from("medium")],
            user_agent: String::from(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
            ),
            navigation_timeout_secs: crate::DEFAULT_NAVIGATION_TIMEOUT.as_secs(),
            site_timeout_secs: crate::DEFAULT_SITE_TIMEOUT.as_secs(),
            max_candidates: 10,
            max_items_per_site: 1,
            max_site_workers: crate::DEFAULT_SITE_WORKERS,
            reducer: ReducerConfig::default(),
            llm: LLMConfig::default(),
        }
    }
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 3000,
            short_input_threshold: 200,
            min_chunk_words: 5,
            max_length: 100,
            min_length: 30,
            max_chunk_workers: crate::DEFAULT_CHUNK_WORKERS,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("http://localhost:11434/api/generate"),
            model: String::from("llama3.2:latest"),
            temperature: 0.1,
        }
    }
}

impl DigestConfig {
    /// Loads the configuration from defaults, an optional file and the environment.
    ///
    /// # Arguments
    ///
    /// * `path` - Configuration file to read. When `None`, `blogdigest.toml` is used if present.
    ///
    /// # Returns
    ///
    /// A `Result` containing the merged configuration. An explicitly named file that does not exist is an error.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("default_sites"),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        debug!(?loaded, "Loaded configuration");
        Ok(loaded)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn site_timeout(&self) -> Duration {
        Duration::from_secs(self.site_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DigestConfig::default();
        assert_eq!(config.default_sites, vec!["medium"]);
        assert_eq!(config.max_items_per_site, 1);
        assert_eq!(config.reducer.chunk_size, 3000);
        assert_eq!(config.reducer.short_input_threshold, 200);
        assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_from_file_keeps_unset_defaults() {
        let path = std::env::temp_dir().join(format!("blogdigest-test-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "max_items_per_site = 3\n[reducer]\nchunk_size = 500").unwrap();

        let config = DigestConfig::load(path.to_str()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.max_items_per_site, 3);
        assert_eq!(config.reducer.chunk_size, 500);
        assert_eq!(config.reducer.max_chunk_workers, 6);
        assert_eq!(config.llm.model, "llama3.2:latest");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = DigestConfig::load(Some("/nonexistent/blogdigest-config"));
        assert!(result.is_err());
    }
}
