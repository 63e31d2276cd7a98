//! Data models for feed entries and report items.
//!
//! This module defines the values that flow through the pipeline:
//! - [`FeedSource`]: A configured feed endpoint
//! - [`FeedEntry`]: One raw entry as read from a feed, every field optional
//! - [`ResolvedItem`]: An entry whose link and date have been normalized
//! - [`ReportItem`]: A numbered item that passed every filter
//! - [`Report`]: The output of one run

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A feed endpoint to read.
///
/// The order of sources in the configuration is the order items are numbered in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedSource {
    /// Display name used in logs.
    pub name: String,
    /// RSS or Atom URL.
    pub url: String,
}

impl FeedSource {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// A raw feed entry. Lives for one pipeline pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// Headline, if the entry has a non-blank one.
    pub title: Option<String>,
    /// Link as published by the feed, possibly wrapped.
    pub link: Option<String>,
    /// Publication date text, unparsed.
    pub published: Option<String>,
}

/// A feed entry with a canonical link and an absolute publication time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItem {
    /// Headline as published (trimmed).
    pub title: String,
    /// Scheme, host, and path of the article. No query or fragment.
    pub canonical_link: String,
    /// Publication instant with the offset it was resolved in.
    pub published_at: DateTime<FixedOffset>,
    normalized_title: String,
}

impl ResolvedItem {
    pub fn new(title: &str, canonical_link: String, published_at: DateTime<FixedOffset>) -> Self {
        let title = title.trim().to_string();
        Self {
            normalized_title: normalize_title(&title),
            title,
            canonical_link,
            published_at,
        }
    }

    /// Lower-cased, trimmed title used for keyword matching and deduplication.
    pub fn normalized_title(&self) -> &str {
        &self.normalized_title
    }
}

/// Lower-case and trim a headline.
pub fn normalize_title(title: &str) -> String {
    title.to_lowercase().trim().to_string()
}

/// A numbered report entry. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportItem {
    /// 1-based position in discovery order.
    pub index: usize,
    pub title: String,
    pub published_at: DateTime<FixedOffset>,
    pub link: String,
    pub snippet: String,
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Caller tokens as given, aliases unexpanded.
    pub query: Vec<String>,
    /// Keywords after alias expansion.
    pub keywords: Vec<String>,
    /// Lookback window in days.
    pub days: u32,
    /// Oldest publication time accepted.
    pub cutoff: DateTime<FixedOffset>,
    pub items: Vec<ReportItem>,
}
