//! Run configuration.
//!
//! Settings come from three layers, later ones winning:
//! 1. Built-in defaults
//! 2. An optional YAML file (`--config`)
//! 3. Command-line overrides
//!
//! ```yaml
//! feeds:
//!   - name: VnExpress
//!     url: https://vnexpress.net/rss/tin-moi-nhat.rss
//! request_timeout_secs: 15
//! item_deadline_secs: 45
//! concurrency: 8
//! max_retries: 2
//! retry_base_delay_ms: 500
//! user_agent: news_keyword_digest/0.1
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::feeds::default_feeds;
use crate::models::FeedSource;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument};

/// Optional keys of the YAML file. Anything missing falls back to [`Settings::default`].
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub feeds: Option<Vec<FeedSource>>,
    pub request_timeout_secs: Option<u64>,
    pub item_deadline_secs: Option<u64>,
    pub concurrency: Option<usize>,
    pub max_retries: Option<usize>,
    pub retry_base_delay_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl FileConfig {
    pub fn from_yaml(path: &str, text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })
    }

    #[instrument(level = "info")]
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_yaml(path, &text)?;
        info!("Loaded configuration file");
        Ok(config)
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Feeds in numbering order.
    pub feeds: Vec<FeedSource>,
    /// Timeout for a single HTTP request.
    pub request_timeout: Duration,
    /// Bound on one feed or page fetch, retries included.
    pub item_deadline: Duration,
    /// Maximum fetches in flight.
    pub concurrency: usize,
    /// Retries after the first attempt for transient failures.
    pub max_retries: usize,
    /// First backoff delay; doubles per retry.
    pub retry_base_delay: Duration,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            request_timeout: Duration::from_secs(15),
            item_deadline: Duration::from_secs(45),
            concurrency: 8,
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Settings {
    /// Layer the file config and CLI overrides over the defaults and validate.
    pub fn resolve(file: FileConfig, cli: &Cli) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        if let Some(feeds) = file.feeds {
            settings.feeds = feeds;
        }
        if let Some(secs) = cli.timeout_secs.or(file.request_timeout_secs) {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.item_deadline_secs {
            settings.item_deadline = Duration::from_secs(secs);
        }
        if let Some(n) = cli.concurrency.or(file.concurrency) {
            settings.concurrency = n;
        }
        if let Some(n) = cli.max_retries.or(file.max_retries) {
            settings.max_retries = n;
        }
        if let Some(ms) = file.retry_base_delay_ms {
            settings.retry_base_delay = Duration::from_millis(ms);
        }
        if let Some(agent) = file.user_agent {
            settings.user_agent = agent;
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.feeds.is_empty() {
            return Err(ConfigError::Invalid("feed list is empty".into()));
        }
        if let Some(bad) = self.feeds.iter().find(|f| url::Url::parse(&f.url).is_err()) {
            return Err(ConfigError::Invalid(format!(
                "feed '{}' has an invalid URL: {}",
                bad.name, bad.url
            )));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.request_timeout.is_zero() || self.item_deadline.is_zero() {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}
