//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most options can also be provided via environment variables.

use crate::error::ConfigError;
use crate::keywords::split_keyword_arg;
use clap::Parser;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Disease surveillance alias over the last 3 days
/// news_keyword_digest --keywords sebs
///
/// # Literal keywords plus an alias, 7 day window
/// news_keyword_digest -k "sốt xuất huyết, bạch hầu, sgain" -d 7
///
/// # Custom feeds and a JSON copy of the report
/// news_keyword_digest -k sebs -c feeds.yaml --json-output ./out/report.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Comma-separated keywords or alias names (e.g. "sốt xuất huyết, bạch hầu" or "sebs")
    #[arg(short, long, env = "NEWS_KEYWORDS")]
    pub keywords: String,

    /// Number of past days to include in the search
    #[arg(short, long, default_value_t = 3)]
    pub days: u32,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "NEWS_FILTER_CONFIG")]
    pub config: Option<String>,

    /// Also write the report as JSON to this file
    #[arg(long)]
    pub json_output: Option<String>,

    /// Per-request timeout in seconds (overrides the config file)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Maximum concurrent fetches (overrides the config file)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Retries for transient fetch failures (overrides the config file)
    #[arg(long)]
    pub max_retries: Option<usize>,
}

impl Cli {
    /// Raw keyword tokens. Errors if none remain after trimming.
    pub fn keyword_tokens(&self) -> Result<Vec<String>, ConfigError> {
        let tokens = split_keyword_arg(&self.keywords);
        if tokens.is_empty() {
            return Err(ConfigError::MissingKeywords);
        }
        Ok(tokens)
    }
}
