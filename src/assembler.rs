//! Builds the enriched dataset.
//!
//! The assembler resolves constituents once, then asks the news source for
//! each symbol in resolver order. Per-symbol failures are logged and treated
//! as "no news". A fixed pause follows every symbol. Once all symbols are done,
//! every record is stamped with one shared fetch timestamp and the index label.

use crate::config::EtlConfig;
use crate::models::{Constituent, EnrichedRecord, NewsSummary};
use crate::news::correlator::NewsSource;
use crate::sources::resolver::ConstituentSource;
use crate::utils::fetch_timestamp;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument};

/// The assembled output: one record per constituent, in resolver order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<EnrichedRecord>,
    pub fetched_at: String,
    pub index_name: String,
}

impl Dataset {
    pub fn symbols_with_news(&self) -> usize {
        self.records.iter().filter(|r| r.news.has_news()).count()
    }
}

pub struct DatasetAssembler<C, N> {
    constituents: C,
    news: N,
    news_limit: usize,
    symbol_pause: Duration,
    index_name: String,
}

impl<C, N> DatasetAssembler<C, N>
where
    C: ConstituentSource,
    N: NewsSource,
{
    pub fn new(constituents: C, news: N, config: &EtlConfig) -> Self {
        Self {
            constituents,
            news,
            news_limit: config.news_limit,
            symbol_pause: config.symbol_pause(),
            index_name: config.index_name.clone(),
        }
    }

    /// Run the pipeline. `max_symbols` caps how many resolved constituents
    /// are enriched; `Some(0)` means no cap.
    #[instrument(level = "info", skip(self))]
    pub async fn assemble(&self, max_symbols: Option<usize>) -> Dataset {
        let mut constituents = self.constituents.constituents().await;
        if let Some(max) = max_symbols.filter(|&max| max > 0) {
            constituents.truncate(max);
        }
        info!(count = constituents.len(), "Fetching news for constituents");

        let mut enriched: Vec<(Constituent, NewsSummary)> = Vec::with_capacity(constituents.len());
        for constituent in constituents {
            info!(symbol = %constituent.symbol, "Processing constituent");
            let summary = match self.news.news_for(&constituent.symbol, self.news_limit).await {
                Ok(items) => NewsSummary::from_items(&items),
                Err(e) => {
                    error!(
                        symbol = %constituent.symbol,
                        reason = e.reason(),
                        error = %e,
                        "News lookup failed; continuing without news"
                    );
                    NewsSummary::default()
                }
            };
            enriched.push((constituent, summary));
            sleep(self.symbol_pause).await;
        }

        let fetched_at = fetch_timestamp();
        let records = enriched
            .into_iter()
            .map(|(constituent, summary)| {
                EnrichedRecord::new(&constituent, summary, &fetched_at, &self.index_name)
            })
            .collect::<Vec<_>>();

        info!(rows = records.len(), "Dataset built");
        Dataset {
            records,
            fetched_at,
            index_name: self.index_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{NewsCategory, NewsItem};
    use std::cell::RefCell;

    struct FixedConstituents(Vec<Constituent>);

    impl ConstituentSource for FixedConstituents {
        async fn constituents(&self) -> Vec<Constituent> {
            self.0.clone()
        }
    }

    /// Returns two items for every symbol except `FAILS`, recording calls.
    #[derive(Default)]
    struct ScriptedNews {
        calls: RefCell<Vec<(String, usize)>>,
    }

    impl NewsSource for ScriptedNews {
        async fn news_for(&self, symbol: &str, limit: usize) -> Result<Vec<NewsItem>, FetchError> {
            self.calls.borrow_mut().push((symbol.to_string(), limit));
            match symbol {
                "FAILS" => Err(FetchError::Timeout {
                    url: "mem://feed".to_string(),
                }),
                "QUIET" => Ok(Vec::new()),
                _ => Ok(vec![
                    NewsItem {
                        title: format!("{} Q3 Results", symbol),
                        link: "https://example.com/1".to_string(),
                        published: "2025-02-10".to_string(),
                        source_feed: "financial_results".to_string(),
                        category: NewsCategory::FinancialResults,
                        symbol: symbol.to_string(),
                    },
                    NewsItem {
                        title: format!("{} Board Meeting", symbol),
                        link: "https://example.com/2".to_string(),
                        published: "2025-01-10".to_string(),
                        source_feed: "board_meeting".to_string(),
                        category: NewsCategory::BoardMeeting,
                        symbol: symbol.to_string(),
                    },
                ]),
            }
        }
    }

    fn config() -> EtlConfig {
        EtlConfig {
            symbol_pause_ms: 0,
            index_name: "Test Index".to_string(),
            ..EtlConfig::default()
        }
    }

    fn constituents() -> FixedConstituents {
        FixedConstituents(vec![
            Constituent::new("BHEL", "Bharat Heavy Electricals Ltd"),
            Constituent::new("FAILS", "Failing Co"),
            Constituent::new("QUIET", "Quiet Co"),
        ])
    }

    #[tokio::test]
    async fn test_assemble_merges_news_in_order() {
        let assembler = DatasetAssembler::new(constituents(), ScriptedNews::default(), &config());
        let dataset = assembler.assemble(None).await;

        let symbols: Vec<&str> = dataset.records.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BHEL", "FAILS", "QUIET"]);

        let bhel = &dataset.records[0];
        assert_eq!(bhel.news.news_titles, "BHEL Q3 Results | BHEL Board Meeting");
        assert_eq!(bhel.news.news_links, "https://example.com/1 | https://example.com/2");
        assert_eq!(bhel.news.news_categories, "Financial Results | Board Meeting");
        assert_eq!(bhel.news.last_news_update, "2025-02-10");
        assert_eq!(dataset.symbols_with_news(), 1);
    }

    #[tokio::test]
    async fn test_failed_symbol_yields_empty_news() {
        let assembler = DatasetAssembler::new(constituents(), ScriptedNews::default(), &config());
        let dataset = assembler.assemble(None).await;
        assert_eq!(dataset.records[1].news, NewsSummary::default());
        assert_eq!(dataset.records[2].news, NewsSummary::default());
    }

    #[tokio::test]
    async fn test_records_share_timestamp_and_label() {
        let assembler = DatasetAssembler::new(constituents(), ScriptedNews::default(), &config());
        let dataset = assembler.assemble(None).await;
        assert!(dataset
            .records
            .iter()
            .all(|r| r.data_fetch_date == dataset.fetched_at && r.index_name == "Test Index"));
        assert!(dataset.records.iter().all(|r| r.scores.values().iter().all(Option::is_none)));
    }

    #[tokio::test]
    async fn test_news_limit_and_symbol_cap() {
        let news = ScriptedNews::default();
        let assembler = DatasetAssembler::new(constituents(), news, &config());
        let dataset = assembler.assemble(Some(1)).await;
        assert_eq!(dataset.records.len(), 1);
        assert_eq!(
            *assembler.news.calls.borrow(),
            vec![("BHEL".to_string(), 3)]
        );
    }

    #[tokio::test]
    async fn test_zero_symbol_cap_processes_everything() {
        let assembler = DatasetAssembler::new(constituents(), ScriptedNews::default(), &config());
        let dataset = assembler.assemble(Some(0)).await;
        assert_eq!(dataset.records.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_after_every_symbol() {
        let config = EtlConfig {
            symbol_pause_ms: 200,
            ..config()
        };
        let assembler = DatasetAssembler::new(constituents(), ScriptedNews::default(), &config);
        let started = tokio::time::Instant::now();
        let dataset = assembler.assemble(None).await;
        assert_eq!(dataset.records.len(), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(700), "{elapsed:?}");
    }
}
