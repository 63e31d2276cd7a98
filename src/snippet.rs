//! Article snippet extraction.
//!
//! A snippet is the page's own description, cut to a few sentences. Sources
//! are tried in order and the first non-empty one wins:
//!
//! | Priority | Source |
//! |----------|--------|
//! | 1 | `<meta name="description">` |
//! | 2 | `<meta property="og:description">` |
//! | 3 | `<meta name="twitter:description">` |
//! | 4 | first `<p>` with more than [`MIN_PARAGRAPH_WORDS`] words |
//!
//! Extraction is a pure function over HTML; [`fetch_snippet`] adds the
//! retrieval around it.

use crate::fetch::Fetch;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use unicode_segmentation::UnicodeSegmentation;

/// Meta tags holding a page description, highest priority first.
const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"meta[name="description"]"#,
    r#"meta[property="og:description"]"#,
    r#"meta[name="twitter:description"]"#,
];

/// A fallback paragraph must have strictly more words than this.
pub const MIN_PARAGRAPH_WORDS: usize = 10;

/// Sentences kept in a snippet.
pub const MAX_SENTENCES: usize = 3;

/// Count word tokens in `text`.
///
/// Tokens are Unicode word-boundary segments that are not whitespace, so
/// punctuation marks count as tokens of their own.
pub fn word_count(text: &str) -> usize {
    text.split_word_bounds()
        .filter(|token| !token.trim().is_empty())
        .count()
}

/// Keep the first `max_sentences` sentences of `text`, joined by single spaces.
pub fn summarize(text: &str, max_sentences: usize) -> String {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .take(max_sentences)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best description available in an HTML document, before summarizing.
pub fn extract_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for css in DESCRIPTION_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        let content = document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|content| !content.is_empty());
        if let Some(content) = content {
            debug!(selector = css, "Description found in meta tag");
            return Some(content.to_string());
        }
    }

    let paragraph = Selector::parse("p").ok()?;
    document
        .select(&paragraph)
        .map(|p| p.text().collect::<String>())
        .map(|text| text.trim().to_string())
        .find(|text| word_count(text) > MIN_PARAGRAPH_WORDS)
}

/// Snippet for an already fetched page. Empty when the page has no description.
pub fn snippet_from_html(html: &str) -> String {
    extract_description(html)
        .map(|description| summarize(&description, MAX_SENTENCES))
        .unwrap_or_default()
}

/// Fetch `link` and extract its snippet.
///
/// Returns `None` on any transport or status failure. A page that loads but
/// has no usable description yields `Some("")`.
#[instrument(level = "debug", skip(fetcher))]
pub async fn fetch_snippet<F: Fetch>(fetcher: &F, link: &str) -> Option<String> {
    match fetcher.fetch(link).await {
        Ok(html) => Some(snippet_from_html(&html)),
        Err(e) => {
            debug!(error = %e, "Page fetch failed; no snippet");
            None
        }
    }
}
