use anyhow::{bail, Context};
use blogdigest::{DigestConfig, Pipeline};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// The main entry point of the application.
///
/// Usage: `blogdigest <keyword> [sites] [--config <path>]`, where `sites` is a comma-separated
/// list such as `medium,devto`. The per-site summaries are printed to stdout as JSON.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let mut positional = Vec::new();
    let mut config_path = None;
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config_path = Some(args.next().context("--config requires a path")?);
        } else {
            positional.push(arg);
        }
    }

    let keyword = positional.first().map(|k| k.trim()).unwrap_or_default();
    if keyword.is_empty() {
        bail!("usage: blogdigest <keyword> [sites] [--config <path>]");
    }
    let sites = positional.get(1).map(String::as_str);

    // Load configuration
    let config = DigestConfig::load(config_path.as_deref()).context("failed to load configuration")?;
    let pipeline = Pipeline::from_config(&config).context("failed to start pipeline")?;

    let start_time = Instant::now();
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Scraping and summarizing '{}'...", keyword));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = pipeline.run_request(keyword, sites).await;
    spinner.finish_and_clear();
    let result = result?;

    info!(elapsed = ?start_time.elapsed(), sites = result.results.len(), "Done");
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
