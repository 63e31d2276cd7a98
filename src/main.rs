//! # News Keyword Digest
//!
//! Reads a fixed set of RSS/Atom news feeds, keeps the headlines that mention
//! any of the requested keywords within a recent window, collapses
//! near-duplicate headlines, and prints a numbered digest with a short
//! snippet of each article.
//!
//! ## Usage
//!
//! ```sh
//! news_keyword_digest --keywords sebs --days 3
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: CLI flags layered over an optional YAML file
//! 2. **Feeds**: fetched concurrently, consumed in configured order
//! 3. **Filtering**: link resolution, date cutoff, near-duplicate check, keyword match
//! 4. **Snippets**: article pages fetched concurrently, description extracted
//! 5. **Output**: numbered text report on stdout, optional JSON copy

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod dates;
mod dedup;
mod error;
mod feeds;
mod fetch;
mod keywords;
mod links;
mod models;
mod outputs;
mod pipeline;
mod snippet;
mod utils;

use cli::Cli;
use config::{FileConfig, Settings};
use fetch::{HttpFetcher, RetryFetch};
use keywords::KeywordSet;
use outputs::{json, report};
use pipeline::Pipeline;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init (stderr keeps stdout for the report) ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    info!("news_keyword_digest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, days = args.days, "Parsed CLI arguments");

    // ---- Configuration (fatal before any network activity) ----
    let tokens = args.keyword_tokens()?;
    let keywords = KeywordSet::expand(&tokens);
    if keywords.is_empty() {
        error!(raw = %args.keywords, "No keywords left after alias expansion");
        return Err(error::ConfigError::MissingKeywords.into());
    }
    info!(%keywords, count = keywords.len(), "Resolved keywords");

    let file_config = match args.config.as_deref() {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(file_config, &args)?;
    info!(
        feeds = settings.feeds.len(),
        concurrency = settings.concurrency,
        max_retries = settings.max_retries,
        timeout = ?settings.request_timeout,
        "Resolved settings"
    );

    // ---- Run ----
    let fetcher = RetryFetch::new(
        HttpFetcher::new(settings.request_timeout, &settings.user_agent)?,
        settings.max_retries,
        settings.retry_base_delay,
    );
    let pipeline = Pipeline::new(
        fetcher,
        settings.feeds,
        settings.concurrency,
        settings.item_deadline,
    );
    let digest = pipeline.run(&keywords, args.days).await;

    // ---- Output ----
    report::print_report(&digest)?;

    if let Some(path) = args.json_output.as_deref() {
        if let Err(e) = json::write_report(&digest, path).await {
            error!(%path, error = %e, "Failed to write JSON output");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        items = digest.items.len(),
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
