//! Error types for fetching, feed parsing, and configuration.
//!
//! Only [`ConfigError`] ever ends a run. Fetch and feed errors are contained
//! at the source or item level by the pipeline.

use thiserror::Error;

/// Errors from a single HTTP retrieval.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS, timeout, or other transport failure.
    #[error("Request failed: {0}")]
    Transport(String),

    /// Server answered with a non-success status.
    #[error("HTTP status {status} for {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Response body could not be read.
    #[error("Failed to read body: {0}")]
    Body(String),

    /// The per-item deadline elapsed before the fetch (and its retries) finished.
    #[error("Deadline of {0:?} exceeded")]
    Deadline(std::time::Duration),
}

impl FetchError {
    /// Whether a retry has a reasonable chance of succeeding.
    ///
    /// Transport failures, `429`, and `5xx` are transient. Every other status
    /// is a definitive answer from the server.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Body(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Deadline(_) => false,
        }
    }
}

/// Errors from retrieving or decoding one feed source.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Body was neither RSS nor Atom.
    #[error("Unparseable feed at {url}: {reason}")]
    Unparseable { url: String, reason: String },
}

/// Run-fatal configuration problems, raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No keywords given; pass --keywords with at least one keyword or alias")]
    MissingKeywords,

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
