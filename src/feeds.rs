//! Feed retrieval and RSS/Atom decoding.
//!
//! Feeds are read with the `rss` crate first and `atom_syndication` second.
//! Entries keep their fields raw and optional; validation happens in the
//! pipeline so a malformed entry never fails the whole feed.

use crate::error::FeedError;
use crate::fetch::Fetch;
use crate::models::{FeedEntry, FeedSource};
use crate::utils::truncate_for_log;
use tracing::{debug, info, instrument};

/// Feeds read when no configuration file overrides them.
pub fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource::new("VnExpress", "https://vnexpress.net/rss/tin-moi-nhat.rss"),
        FeedSource::new("Tuổi Trẻ", "https://tuoitre.vn/rss/tin-moi-nhat.rss"),
        FeedSource::new(
            "Google News VN",
            "https://news.google.com/rss?hl=vi&gl=VN&ceid=VN:vi",
        ),
    ]
}

/// Retrieve and decode one feed.
#[instrument(level = "info", skip(fetcher, source), fields(feed = %source.name, url = %source.url))]
pub async fn fetch_feed<F: Fetch>(
    fetcher: &F,
    source: &FeedSource,
) -> Result<Vec<FeedEntry>, FeedError> {
    let body = fetcher.fetch(&source.url).await?;
    let entries = parse_feed(&source.url, body.as_bytes())?;
    info!(count = entries.len(), "Read feed entries");
    Ok(entries)
}

/// Decode an RSS 2.0 or Atom document into entries, in document order.
pub fn parse_feed(url: &str, body: &[u8]) -> Result<Vec<FeedEntry>, FeedError> {
    let rss_err = match rss::Channel::read_from(body) {
        Ok(channel) => return Ok(channel.items().iter().map(rss_entry).collect()),
        Err(e) => e,
    };
    match atom_syndication::Feed::read_from(body) {
        Ok(feed) => Ok(feed.entries().iter().map(atom_entry).collect()),
        Err(atom_err) => {
            debug!(
                %url,
                %rss_err,
                %atom_err,
                preview = %truncate_for_log(&String::from_utf8_lossy(body), 200),
                "Neither RSS nor Atom"
            );
            Err(FeedError::Unparseable {
                url: url.to_string(),
                reason: format!("rss: {rss_err}; atom: {atom_err}"),
            })
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn rss_entry(item: &rss::Item) -> FeedEntry {
    FeedEntry {
        title: non_blank(item.title()),
        link: non_blank(item.link()),
        published: non_blank(item.pub_date()),
    }
}

fn atom_entry(entry: &atom_syndication::Entry) -> FeedEntry {
    // Prefer the alternate link; fall back to whatever comes first.
    let link = entry
        .links()
        .iter()
        .find(|l| l.rel() == "alternate")
        .or_else(|| entry.links().first())
        .map(|l| l.href());

    FeedEntry {
        title: non_blank(Some(entry.title().as_str())),
        link: non_blank(link),
        published: entry.published().map(|dt| dt.to_rfc3339()),
    }
}
