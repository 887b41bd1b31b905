//! Summarization: the model-backed capability and the chunk-and-reduce pipeline on top of it.
//!
//! [`Summarizer`] is the opaque `text -> summary` capability. [`OllamaSummarizer`] implements it
//! against an Ollama `/api/generate` endpoint. [`SummaryReducer`] handles texts of any length:
//! short texts go to the model in a single call, long ones are split with the
//! [`chunker`](crate::chunker), summarized chunk by chunk on a bounded number of workers and
//! joined back in chunk order.

use crate::chunker::TextChunker;
use crate::config::{LLMConfig, ReducerConfig};
use crate::{DigestError, Result};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Returned when the whole input is empty.
pub const NO_VALID_CONTENT_PROVIDED: &str = "No valid content provided.";
/// Returned for an empty chunk.
pub const NO_VALID_CONTENT: &str = "No valid content.";
/// Returned for a chunk with too few words to summarize.
pub const TOO_SHORT: &str = "Too short to summarize.";

/// A model able to condense text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarizes `text`, aiming for a length between `min_length` and `max_length` words.
    async fn summarize(&self, text: &str, max_length: usize, min_length: usize) -> Result<String>;
}

/// Request body of Ollama's generate endpoint.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// The `OllamaSummarizer` asks a local Ollama model for summaries.
///
/// It is created once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct OllamaSummarizer {
    client: Client,
    config: LLMConfig,
}

impl OllamaSummarizer {
    /// Creates a new `OllamaSummarizer` with the given LLM configuration.
    pub fn new(config: LLMConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn prompt(text: &str, max_length: usize, min_length: usize) -> String {
        format!(
            "Summarize the following text in {} to {} words. Reply with the summary only.\n\n{}",
            min_length, max_length, text
        )
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    #[instrument(level = "debug", skip(self, text), fields(model = %self.config.model, chars = text.len()))]
    async fn summarize(&self, text: &str, max_length: usize, min_length: usize) -> Result<String> {
        let t0 = Instant::now();
        let request = GenerateRequest {
            model: &self.config.model,
            prompt: Self::prompt(text, max_length, min_length),
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                // a word is usually more than one token
                num_predict: max_length * 2,
            },
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DigestError::SummarizationError(format!(
                "model endpoint returned {}: {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response.json().await?;
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "Model call finished");
        Ok(generated.response.trim().to_string())
    }
}

/// The `SummaryReducer` summarizes texts of any length with a [`Summarizer`].
#[derive(Clone)]
pub struct SummaryReducer {
    summarizer: Arc<dyn Summarizer>,
    config: ReducerConfig,
}

impl SummaryReducer {
    pub fn new(summarizer: Arc<dyn Summarizer>, config: ReducerConfig) -> Self {
        Self { summarizer, config }
    }

    /// Summarizes `text`.
    ///
    /// Never fails: empty input and failing chunks are represented by marker strings, and the
    /// chunk summaries are joined with single spaces in their original order.
    #[instrument(level = "info", skip_all, fields(chars = text.chars().count()))]
    pub async fn summarize(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return NO_VALID_CONTENT_PROVIDED.to_string();
        }

        if text.chars().count() < self.config.short_input_threshold {
            debug!("Short input; summarizing without chunking");
            return summarize_chunk(
                Arc::clone(&self.summarizer),
                self.config.clone(),
                text.to_string(),
            )
            .await;
        }

        let chunks = TextChunker::new(self.config.chunk_size).split(text);
        let workers = self.config.max_chunk_workers.min(chunks.len()).max(1);
        info!(chunks = chunks.len(), workers, "Summarizing chunks");

        let mut summaries: Vec<(usize, String)> = stream::iter(chunks)
            .map(|chunk| {
                let summarizer = Arc::clone(&self.summarizer);
                let config = self.config.clone();
                async move {
                    let index = chunk.index;
                    let summary =
                        match tokio::spawn(summarize_chunk(summarizer, config, chunk.text)).await {
                            Ok(summary) => summary,
                            Err(e) => {
                                warn!(index, error = %e, "Chunk task aborted");
                                format!("Error: {}", e)
                            }
                        };
                    debug!(index, "Chunk summarized");
                    (index, summary)
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        summaries.sort_by_key(|(index, _)| *index);
        summaries
            .into_iter()
            .map(|(_, summary)| summary)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Summarizes one chunk, turning degenerate input and model failures into markers.
async fn summarize_chunk(
    summarizer: Arc<dyn Summarizer>,
    config: ReducerConfig,
    text: String,
) -> String {
    if text.trim().is_empty() {
        return NO_VALID_CONTENT.to_string();
    }
    if text.split_whitespace().count() < config.min_chunk_words {
        return TOO_SHORT.to_string();
    }

    match summarizer
        .summarize(&text, config.max_length, config.min_length)
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, "Chunk summarization failed");
            format!("Error: {}", e)
        }
    }
}
