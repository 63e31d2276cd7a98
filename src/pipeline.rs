//! The ingestion-and-filtering run.
//!
//! One [`Pipeline::run`] call is one finite batch:
//! 1. **Feeds**: fetch every configured feed concurrently, consumed in list order
//! 2. **Filtering**: walk entries in (feed order, entry order) on a single task,
//!    resolving links and dates, checking the cutoff, near-duplicates, and keywords
//! 3. **Snippets**: fetch surviving pages concurrently, results kept in order
//! 4. **Numbering**: items with a long enough snippet are numbered 1..n
//!
//! The seen-set is only touched in step 2, so check-and-insert is atomic per
//! item and the first headline of a story always wins. Network latency can
//! never reorder the output because numbering happens after all fetches.

use crate::dates::parse_date;
use crate::dedup::SeenSet;
use crate::error::{FeedError, FetchError};
use crate::feeds::fetch_feed;
use crate::fetch::Fetch;
use crate::keywords::KeywordSet;
use crate::links::resolve;
use crate::models::{FeedEntry, FeedSource, Report, ReportItem, ResolvedItem};
use crate::snippet::{fetch_snippet, word_count};
use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Snippets with fewer word tokens than this are dropped.
pub const MIN_SNIPPET_WORDS: usize = 10;

/// Why entries were dropped during one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub feeds_failed: usize,
    pub entries_seen: usize,
    pub missing_fields: usize,
    pub undated: usize,
    pub stale: usize,
    pub duplicates: usize,
    pub no_keyword: usize,
    pub no_snippet: usize,
    pub emitted: usize,
}

/// Drives feeds through resolution, filtering, deduplication, and snippet extraction.
#[derive(Debug)]
pub struct Pipeline<F> {
    fetcher: F,
    feeds: Vec<FeedSource>,
    concurrency: usize,
    item_deadline: Duration,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(fetcher: F, feeds: Vec<FeedSource>, concurrency: usize, item_deadline: Duration) -> Self {
        Self {
            fetcher,
            feeds,
            concurrency: concurrency.max(1),
            item_deadline,
        }
    }

    /// Run against the current time.
    pub async fn run(&self, keywords: &KeywordSet, days: u32) -> Report {
        self.run_at(keywords, days, Utc::now()).await
    }

    /// Run as if the current time were `now`.
    #[instrument(level = "info", skip_all, fields(keywords = keywords.len(), days = days))]
    pub async fn run_at(&self, keywords: &KeywordSet, days: u32, now: DateTime<Utc>) -> Report {
        let cutoff = TimeDelta::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
            .fixed_offset();
        let mut stats = FilterStats::default();

        let feeds: Vec<(&FeedSource, Result<Vec<FeedEntry>, FeedError>)> =
            stream::iter(&self.feeds)
                .map(|source| async move { (source, self.read_feed(source).await) })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut seen = SeenSet::new();
        let mut candidates = Vec::new();
        for (source, result) in feeds {
            let entries = match result {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(feed = %source.name, url = %source.url, error = %e, "Failed to read feed; skipping");
                    stats.feeds_failed += 1;
                    continue;
                }
            };
            for entry in entries {
                stats.entries_seen += 1;
                if let Some(item) = admit(entry, keywords, &cutoff, &mut seen, &mut stats) {
                    candidates.push(item);
                }
            }
        }
        info!(
            candidates = candidates.len(),
            seen = seen.len(),
            "Filtering complete; fetching snippets"
        );

        let snippets: Vec<Option<String>> = stream::iter(&candidates)
            .map(|item| self.read_snippet(&item.canonical_link))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut items = Vec::new();
        for (item, snippet) in candidates.into_iter().zip(snippets) {
            match snippet {
                Some(snippet) if word_count(&snippet) >= MIN_SNIPPET_WORDS => {
                    items.push(ReportItem {
                        index: items.len() + 1,
                        title: item.title,
                        published_at: item.published_at,
                        link: item.canonical_link,
                        snippet,
                    });
                }
                _ => {
                    debug!(link = %item.canonical_link, "No usable snippet; dropping");
                    stats.no_snippet += 1;
                }
            }
        }
        stats.emitted = items.len();
        info!(?stats, "Run complete");

        Report {
            query: keywords.tokens().to_vec(),
            keywords: keywords.as_slice().to_vec(),
            days,
            cutoff,
            items,
        }
    }

    async fn read_feed(&self, source: &FeedSource) -> Result<Vec<FeedEntry>, FeedError> {
        match timeout(self.item_deadline, fetch_feed(&self.fetcher, source)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Deadline(self.item_deadline).into()),
        }
    }

    async fn read_snippet(&self, link: &str) -> Option<String> {
        match timeout(self.item_deadline, fetch_snippet(&self.fetcher, link)).await {
            Ok(snippet) => snippet,
            Err(_) => {
                debug!(%link, deadline = ?self.item_deadline, "Snippet fetch exceeded deadline");
                None
            }
        }
    }
}

/// Apply the per-entry filters in order. Marks the title seen when it passes.
fn admit(
    entry: FeedEntry,
    keywords: &KeywordSet,
    cutoff: &DateTime<FixedOffset>,
    seen: &mut SeenSet,
    stats: &mut FilterStats,
) -> Option<ResolvedItem> {
    let (Some(title), Some(link)) = (entry.title, entry.link) else {
        stats.missing_fields += 1;
        return None;
    };

    let canonical_link = resolve(&link);
    let Some(published_at) = entry.published.as_deref().and_then(parse_date) else {
        debug!(%title, published = ?entry.published, "Unparseable date; skipping");
        stats.undated += 1;
        return None;
    };
    if canonical_link.is_empty() {
        stats.missing_fields += 1;
        return None;
    }
    if published_at < *cutoff {
        stats.stale += 1;
        return None;
    }

    let item = ResolvedItem::new(&title, canonical_link, published_at);
    if seen.is_duplicate(item.normalized_title()) {
        debug!(title = %item.title, "Near-duplicate headline; skipping");
        stats.duplicates += 1;
        return None;
    }
    let Some(keyword) = keywords.first_match(item.normalized_title()) else {
        stats.no_keyword += 1;
        return None;
    };

    debug!(title = %item.title, %keyword, "Headline matched");
    seen.insert(item.normalized_title(), &item.title);
    Some(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::StubFetcher;
    use chrono::TimeZone;

    const FEED_A: &str = "https://feeds.test/a.rss";
    const FEED_B: &str = "https://feeds.test/b.rss";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> String {
        (now() - TimeDelta::days(days)).to_rfc2822()
    }

    fn rss(items: &[(&str, &str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, link, published)| {
                format!(
                    "<item><title>{title}</title><link>{link}</link><pubDate>{published}</pubDate></item>"
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title><link>https://feeds.test</link><description>d</description>{body}</channel></rss>"#
        )
    }

    fn page(description: &str) -> String {
        format!(r#"<html><head><meta name="description" content="{description}"></head></html>"#)
    }

    const LONG_SNIPPET: &str = "Cơ quan y tế địa phương đã khoanh vùng và xử lý triệt để ổ dịch trong ngày hôm qua.";

    fn pipeline(stub: StubFetcher, feeds: &[&str]) -> Pipeline<StubFetcher> {
        let feeds = feeds
            .iter()
            .enumerate()
            .map(|(i, url)| FeedSource::new(&format!("feed-{i}"), url))
            .collect();
        Pipeline::new(stub, feeds, 4, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_recent_alias_match_is_reported() {
        let published = days_ago(2);
        let feed = rss(&[(
            "Bộ Y Tế ghi nhận ổ dịch mới",
            "https://news.test/o-dich?utm=rss",
            &published,
        )]);
        let stub = StubFetcher::new()
            .with_body(FEED_A, &feed)
            .with_body("https://news.test/o-dich", &page(LONG_SNIPPET));
        let keywords = KeywordSet::expand(["sebs"]);
        assert_eq!(
            keywords.first_match("bộ y tế ghi nhận ổ dịch mới"),
            Some("ổ dịch")
        );

        let report = pipeline(stub, &[FEED_A]).run_at(&keywords, 3, now()).await;

        assert_eq!(report.items.len(), 1);
        let item = &report.items[0];
        assert_eq!(item.index, 1);
        assert_eq!(item.title, "Bộ Y Tế ghi nhận ổ dịch mới");
        assert_eq!(item.link, "https://news.test/o-dich");
        assert_eq!(item.snippet, LONG_SNIPPET);
        assert_eq!(item.published_at, now() - TimeDelta::days(2));
    }

    #[tokio::test]
    async fn test_case_variant_headlines_collapse() {
        let published = days_ago(1);
        let feed = rss(&[
            ("Dịch bệnh lan rộng tại miền Bắc", "https://news.test/1", &published),
            ("Dịch bệnh lan rộng tại miền bắc", "https://news.test/2", &published),
        ]);
        let stub = StubFetcher::new()
            .with_body(FEED_A, &feed)
            .with_body("https://news.test/1", &page(LONG_SNIPPET))
            .with_body("https://news.test/2", &page(LONG_SNIPPET));
        let pipeline = pipeline(stub, &[FEED_A]);

        let report = pipeline
            .run_at(&KeywordSet::expand(["dịch bệnh"]), 3, now())
            .await;

        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].link, "https://news.test/1");
        assert!(!pipeline.fetcher.calls().contains(&"https://news.test/2".to_string()));
    }

    #[tokio::test]
    async fn test_undated_entries_always_skipped() {
        let feed = rss(&[
            ("ổ dịch không ngày", "https://news.test/1", ""),
            ("ổ dịch ngày hỏng", "https://news.test/2", "sometime last week"),
        ]);
        let stub = StubFetcher::new()
            .with_body(FEED_A, &feed)
            .with_body("https://news.test/1", &page(LONG_SNIPPET))
            .with_body("https://news.test/2", &page(LONG_SNIPPET));
        let pipeline = pipeline(stub, &[FEED_A]);

        let report = pipeline.run_at(&KeywordSet::expand(["sebs"]), 3, now()).await;

        assert!(report.items.is_empty());
        assert_eq!(pipeline.fetcher.calls(), vec![FEED_A.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_page_drops_item_and_keeps_title_seen() {
        let published = days_ago(1);
        let feed = rss(&[
            ("Ổ dịch sởi tại Hà Nội", "https://news.test/gone", &published),
            ("ổ dịch sởi tại hà nội", "https://news.test/mirror", &published),
        ]);
        let stub = StubFetcher::new()
            .with_body(FEED_A, &feed)
            .with_status("https://news.test/gone", 404)
            .with_body("https://news.test/mirror", &page(LONG_SNIPPET));
        let pipeline = pipeline(stub, &[FEED_A]);

        let report = pipeline.run_at(&KeywordSet::expand(["sởi"]), 3, now()).await;

        assert!(report.items.is_empty());
        let calls = pipeline.fetcher.calls();
        assert!(calls.contains(&"https://news.test/gone".to_string()));
        assert!(!calls.contains(&"https://news.test/mirror".to_string()));
    }

    #[tokio::test]
    async fn test_alias_expands_before_matching() {
        let published = days_ago(0);
        let feed = rss(&[("OpenAI công bố ChatGPT thế hệ mới", "https://news.test/ai", &published)]);
        let stub = StubFetcher::new()
            .with_body(FEED_A, &feed)
            .with_body("https://news.test/ai", &page(LONG_SNIPPET));

        let report = pipeline(stub, &[FEED_A])
            .run_at(&KeywordSet::expand(["sgain"]), 3, now())
            .await;

        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].title, "OpenAI công bố ChatGPT thế hệ mới");
    }

    #[tokio::test]
    async fn test_stale_and_unmatched_entries_dropped() {
        let old = days_ago(5);
        let fresh = days_ago(1);
        let feed = rss(&[
            ("ổ dịch cũ", "https://news.test/old", &old),
            ("giá vàng hôm nay", "https://news.test/gold", &fresh),
        ]);
        let stub = StubFetcher::new().with_body(FEED_A, &feed);
        let pipeline = pipeline(stub, &[FEED_A]);

        let report = pipeline.run_at(&KeywordSet::expand(["sebs"]), 3, now()).await;

        assert!(report.items.is_empty());
        assert_eq!(pipeline.fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_short_snippet_dropped() {
        let published = days_ago(1);
        let feed = rss(&[("ổ dịch mới", "https://news.test/short", &published)]);
        let stub = StubFetcher::new()
            .with_body(FEED_A, &feed)
            .with_body("https://news.test/short", &page("Quá ngắn."));

        let report = pipeline(stub, &[FEED_A])
            .run_at(&KeywordSet::expand(["sebs"]), 3, now())
            .await;

        assert!(report.items.is_empty());
    }

    #[tokio::test]
    async fn test_failed_feed_skipped_and_order_follows_sources() {
        let published = days_ago(1);
        let feed_a = rss(&[
            ("ổ dịch thứ nhất ở An Giang", "https://news.test/a1", &published),
            ("ổ dịch thứ hai ở Cà Mau", "https://news.test/a2", &published),
        ]);
        let feed_b = rss(&[("ổ dịch thứ ba ở Lào Cai", "https://news.test/b1", &published)]);
        let stub = StubFetcher::new()
            .with_status("https://feeds.test/broken.rss", 500)
            .with_body(FEED_A, &feed_a)
            .with_body(FEED_B, &feed_b)
            .with_body("https://news.test/a1", &page(LONG_SNIPPET))
            .with_status("https://news.test/a2", 404)
            .with_body("https://news.test/b1", &page(LONG_SNIPPET));

        let report = pipeline(stub, &["https://feeds.test/broken.rss", FEED_A, FEED_B])
            .run_at(&KeywordSet::expand(["ổ dịch"]), 3, now())
            .await;

        let numbered: Vec<(usize, &str)> = report
            .items
            .iter()
            .map(|item| (item.index, item.link.as_str()))
            .collect();
        assert_eq!(
            numbered,
            vec![(1, "https://news.test/a1"), (2, "https://news.test/b1")]
        );
    }

    #[tokio::test]
    async fn test_google_news_link_is_decoded_before_fetch() {
        use base64::Engine;
        let target = "https://news.test/that-article";
        let mut bytes = vec![0x08, 0x13, 0x22, target.len() as u8];
        bytes.extend_from_slice(target.as_bytes());
        bytes.extend_from_slice(&[0xd2, 0x01, 0x00]);
        let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);
        let wrapped = format!("https://news.google.com/rss/articles/{token}?oc=5");

        let published = days_ago(1);
        let feed = rss(&[("ổ dịch ở Quảng Nam", &wrapped, &published)]);
        let stub = StubFetcher::new()
            .with_body(FEED_A, &feed)
            .with_body(target, &page(LONG_SNIPPET));

        let report = pipeline(stub, &[FEED_A])
            .run_at(&KeywordSet::expand(["sebs"]), 3, now())
            .await;

        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].link, target);
    }

    #[test]
    fn test_admit_counts_reasons() {
        let cutoff = (now() - TimeDelta::days(3)).fixed_offset();
        let keywords = KeywordSet::expand(["bão"]);
        let mut seen = SeenSet::new();
        let mut stats = FilterStats::default();

        let missing = FeedEntry {
            title: Some("bão số 5".into()),
            ..Default::default()
        };
        assert!(admit(missing, &keywords, &cutoff, &mut seen, &mut stats).is_none());

        let ok = FeedEntry {
            title: Some("Bão số 5 đổ bộ".into()),
            link: Some("https://news.test/bao".into()),
            published: Some(days_ago(1)),
        };
        assert!(admit(ok.clone(), &keywords, &cutoff, &mut seen, &mut stats).is_some());
        assert!(admit(ok, &keywords, &cutoff, &mut seen, &mut stats).is_none());

        assert_eq!(stats.missing_fields, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test]
    async fn test_huge_window_clamps_cutoff() {
        let stub = StubFetcher::new();
        let report = pipeline(stub, &[FEED_A])
            .run_at(&KeywordSet::expand(["bão"]), u32::MAX, now())
            .await;
        assert_eq!(report.cutoff, DateTime::<Utc>::MIN_UTC);
        assert!(report.items.is_empty());
    }

    /// Answers after a per-URL delay. URLs marked as hanging never answer.
    struct SlowFetcher {
        inner: StubFetcher,
        delays: std::collections::HashMap<String, Option<Duration>>,
    }

    impl SlowFetcher {
        fn new(inner: StubFetcher) -> Self {
            Self {
                inner,
                delays: Default::default(),
            }
        }

        fn delay(mut self, url: &str, millis: u64) -> Self {
            self.delays
                .insert(url.to_string(), Some(Duration::from_millis(millis)));
            self
        }

        fn hang(mut self, url: &str) -> Self {
            self.delays.insert(url.to_string(), None);
            self
        }
    }

    impl Fetch for SlowFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            match self.delays.get(url) {
                Some(Some(delay)) => tokio::time::sleep(*delay).await,
                Some(None) => std::future::pending::<()>().await,
                None => {}
            }
            self.inner.fetch(url).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_uneven_latency_and_hung_fetches() {
        const FEED_HUNG: &str = "https://feeds.test/hung.rss";
        let published = days_ago(1);
        let feed_a = rss(&[
            ("ổ dịch chậm ở Huế", "https://news.test/a1", &published),
            ("ổ dịch treo ở Đà Nẵng", "https://news.test/a2", &published),
            ("ổ dịch thứ ba ở Vinh", "https://news.test/a3", &published),
        ]);
        let feed_b = rss(&[("ổ dịch nhanh ở Cần Thơ", "https://news.test/b1", &published)]);
        let stub = StubFetcher::new()
            .with_body(FEED_A, &feed_a)
            .with_body(FEED_B, &feed_b)
            .with_body("https://news.test/a1", &page(LONG_SNIPPET))
            .with_body("https://news.test/a2", &page(LONG_SNIPPET))
            .with_body("https://news.test/a3", &page(LONG_SNIPPET))
            .with_body("https://news.test/b1", &page(LONG_SNIPPET));
        let fetcher = SlowFetcher::new(stub)
            .delay(FEED_A, 3_000)
            .delay(FEED_B, 10)
            .hang(FEED_HUNG)
            .delay("https://news.test/a1", 4_000)
            .hang("https://news.test/a2")
            .delay("https://news.test/a3", 1)
            .delay("https://news.test/b1", 1);
        let feeds = [FEED_A, FEED_HUNG, FEED_B]
            .iter()
            .map(|url| FeedSource::new(url, url))
            .collect();
        let pipeline = Pipeline::new(fetcher, feeds, 4, Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        let report = pipeline
            .run_at(&KeywordSet::expand(["ổ dịch"]), 3, now())
            .await;

        let numbered: Vec<(usize, &str)> = report
            .items
            .iter()
            .map(|item| (item.index, item.link.as_str()))
            .collect();
        assert_eq!(
            numbered,
            vec![
                (1, "https://news.test/a1"),
                (2, "https://news.test/a3"),
                (3, "https://news.test/b1"),
            ]
        );
        // One deadline for the feed stage, one for the snippet stage.
        assert!(started.elapsed() <= Duration::from_secs(11));
    }

    #[tokio::test]
    async fn test_run_span_records_window() {
        use std::sync::{Arc, Mutex};
        use tracing::field::{Field, Visit};
        use tracing_subscriber::Layer;
        use tracing_subscriber::layer::{Context, SubscriberExt};

        struct SpanFields(Arc<Mutex<Vec<String>>>);

        struct Collect<'a>(&'a mut Vec<String>);

        impl Visit for Collect<'_> {
            fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
                self.0.push(format!("{}={:?}", field.name(), value));
            }
        }

        impl<S: tracing::Subscriber> Layer<S> for SpanFields {
            fn on_new_span(
                &self,
                attrs: &tracing::span::Attributes<'_>,
                _id: &tracing::span::Id,
                _ctx: Context<'_, S>,
            ) {
                let mut fields = self.0.lock().unwrap();
                attrs.record(&mut Collect(&mut fields));
            }
        }

        let recorded = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(SpanFields(recorded.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        pipeline(StubFetcher::new(), &[FEED_A])
            .run_at(&KeywordSet::expand(["bão"]), 7, now())
            .await;

        let recorded = recorded.lock().unwrap();
        assert!(recorded.iter().any(|f| f == "days=7"), "{recorded:?}");
        assert!(recorded.iter().any(|f| f == "keywords=1"), "{recorded:?}");
    }
}
