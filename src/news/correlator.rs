//! Correlates syndication feed entries with index symbols.
//!
//! For a given symbol, every configured feed is fetched and parsed, and the
//! first `feed_scan_depth` entries are tested for a case-insensitive substring
//! match of the symbol against the entry title or summary. Matching is plain
//! containment, so `GAIL` also matches inside `LEGAILITY`.
//!
//! Each feed contributes at most `limit` matches on its own. After every feed
//! has been visited the combined list is sorted newest first and truncated to
//! `limit`, so no feed is favoured just because it is scanned first.
//!
//! A feed that fails to download or parse is logged and skipped. A fixed pause
//! follows every feed, whether it succeeded or not.

use crate::config::{EtlConfig, FeedSource};
use crate::error::FetchError;
use crate::models::{NewsCategory, NewsItem};
use crate::news::feed::{parse_feed, FeedEntry};
use crate::sources::fetcher::SourceFetcher;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use std::cmp::Reverse;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Naive formats seen in exchange feeds, tried after RFC 2822 and RFC 3339.
const NAIVE_FORMATS: [&str; 5] = [
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
];

/// Something that yields news for a symbol, newest first.
pub trait NewsSource {
    async fn news_for(&self, symbol: &str, limit: usize) -> Result<Vec<NewsItem>, FetchError>;
}

/// Scans a fixed list of feeds for mentions of a symbol.
#[derive(Debug, Clone)]
pub struct NewsCorrelator {
    fetcher: SourceFetcher,
    feeds: Vec<FeedSource>,
    scan_depth: usize,
    feed_pause: Duration,
}

impl NewsCorrelator {
    pub fn new(
        fetcher: SourceFetcher,
        feeds: Vec<FeedSource>,
        scan_depth: usize,
        feed_pause: Duration,
    ) -> Self {
        Self {
            fetcher,
            feeds,
            scan_depth,
            feed_pause,
        }
    }

    pub fn from_config(fetcher: SourceFetcher, config: &EtlConfig) -> Self {
        Self::new(
            fetcher,
            config.feeds.clone(),
            config.feed_scan_depth,
            config.feed_pause(),
        )
    }

    /// Return at most `limit` items mentioning `symbol`, newest first.
    ///
    /// Only a blank symbol is an error; feed failures shrink the result instead.
    #[instrument(level = "info", skip(self))]
    pub async fn correlate(&self, symbol: &str, limit: usize) -> Result<Vec<NewsItem>, FetchError> {
        if symbol.trim().is_empty() {
            return Err(FetchError::InvalidSymbol);
        }

        let mut items = Vec::new();
        for feed in &self.feeds {
            match self.scan_feed(feed, symbol, limit).await {
                Ok(found) => {
                    debug!(feed = %feed.name, matches = found.len(), "Scanned feed");
                    items.extend(found);
                }
                Err(e) => {
                    warn!(
                        feed = %feed.name,
                        url = %feed.url,
                        kind = ?e.kind(),
                        reason = e.reason(),
                        error = %e,
                        "Skipping feed"
                    );
                }
            }
            sleep(self.feed_pause).await;
        }

        sort_newest_first(&mut items);
        items.truncate(limit);
        Ok(items)
    }

    async fn scan_feed(
        &self,
        feed: &FeedSource,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<NewsItem>, FetchError> {
        let xml = self.fetcher.get_text(&feed.url).await?;
        let entries = parse_feed(&feed.url, &xml)?;
        Ok(match_entries(
            &entries,
            &feed.name,
            symbol,
            self.scan_depth,
            limit,
        ))
    }
}

impl NewsSource for NewsCorrelator {
    async fn news_for(&self, symbol: &str, limit: usize) -> Result<Vec<NewsItem>, FetchError> {
        self.correlate(symbol, limit).await
    }
}

/// Match the first `depth` entries against `symbol`, keeping at most `limit`.
pub fn match_entries(
    entries: &[FeedEntry],
    feed_name: &str,
    symbol: &str,
    depth: usize,
    limit: usize,
) -> Vec<NewsItem> {
    let needle = symbol.trim().to_lowercase();
    entries
        .iter()
        .take(depth)
        .filter(|entry| {
            entry.title.to_lowercase().contains(&needle)
                || entry.summary.to_lowercase().contains(&needle)
        })
        .take(limit)
        .map(|entry| NewsItem {
            title: entry.title.clone(),
            link: entry.link.clone(),
            published: entry.published.clone(),
            source_feed: feed_name.to_string(),
            category: NewsCategory::classify(&entry.title),
            symbol: symbol.to_string(),
        })
        .collect()
}

/// Parse a feed timestamp. Naive formats are read as UTC.
pub fn parse_published(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Sort by parsed timestamp, newest first. Items whose timestamp does not
/// parse follow the parsed ones, ordered by descending raw string.
pub fn sort_newest_first(items: &mut [NewsItem]) {
    items.sort_by_cached_key(|item| {
        let parsed = parse_published(&item.published);
        (parsed.is_none(), Reverse(parsed), Reverse(item.published.clone()))
    });
}
