//! Runtime configuration for the ETL pipeline.
//!
//! All endpoints, pauses, and limits live in [`EtlConfig`]. The defaults
//! target the Nifty Smallcap250 Momentum Quality 100 index and the NSE
//! archive RSS feeds. A YAML file passed with `--config` may override any
//! subset of the fields; absent keys keep their defaults.
//!
//! # Example
//!
//! ```yaml
//! request_timeout_secs: 10
//! symbol_pause_ms: 500
//! feeds:
//!   - name: financial_results
//!     url: https://nsearchives.nseindia.com/content/RSS/Financial_Results.xml
//! ```

use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// One syndication feed the correlator scans.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    /// Short identifier recorded on every matched news item.
    pub name: String,
    /// Absolute URL of the RSS or Atom document.
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

/// Pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Index page expected to expose a CSV export link or a constituents table.
    pub primary_url: String,
    /// Mirror page with a `name, weight` constituents table.
    pub mirror_url: String,
    /// Feeds scanned for news, in order.
    pub feeds: Vec<FeedSource>,
    /// Timeout applied to every HTTP request.
    pub request_timeout_secs: u64,
    /// Pause after each feed is processed.
    pub feed_pause_ms: u64,
    /// Pause after each symbol is processed.
    pub symbol_pause_ms: u64,
    /// Maximum news items kept per symbol.
    pub news_limit: usize,
    /// Number of leading entries inspected in each feed.
    pub feed_scan_depth: usize,
    /// Label stamped on every output record.
    pub index_name: String,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            primary_url: "https://www.niftyindices.com/indices/equity/strategy-indices/nifty-smallcap250-momentum-quality-100".to_string(),
            mirror_url: "https://www.smart-investing.in/indices-bse-nse.php?index=NFTSML250MOMQ100".to_string(),
            feeds: vec![
                FeedSource::new(
                    "financial_results",
                    "https://nsearchives.nseindia.com/content/RSS/Financial_Results.xml",
                ),
                FeedSource::new(
                    "insider_trading",
                    "https://nsearchives.nseindia.com/content/RSS/Insider_Trading.xml",
                ),
                FeedSource::new(
                    "board_meeting",
                    "https://nsearchives.nseindia.com/content/RSS/Board_Meeting.xml",
                ),
                FeedSource::new(
                    "corporate_announcement",
                    "https://nsearchives.nseindia.com/content/RSS/Corporate_Announcement.xml",
                ),
                FeedSource::new(
                    "new_listing",
                    "https://nsearchives.nseindia.com/content/RSS/New_Listing.xml",
                ),
            ],
            request_timeout_secs: 30,
            feed_pause_ms: 100,
            symbol_pause_ms: 200,
            news_limit: 3,
            feed_scan_depth: 100,
            index_name: "Nifty Smallcap250 Momentum Quality 100".to_string(),
        }
    }
}

impl EtlConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn feed_pause(&self) -> Duration {
        Duration::from_millis(self.feed_pause_ms)
    }

    pub fn symbol_pause(&self) -> Duration {
        Duration::from_millis(self.symbol_pause_ms)
    }

    /// Parse a YAML document into a config, filling gaps with defaults.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Load the config from `path`, or return the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).await?;
        let config = Self::from_yaml(&text)?;
        info!(
            path,
            feeds = config.feeds.len(),
            timeout_secs = config.request_timeout_secs,
            "Loaded configuration"
        );
        Ok(config)
    }
}
