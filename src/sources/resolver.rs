//! Constituent resolution through an ordered fallback chain.
//!
//! [`ConstituentResolver`] tries each [`ConstituentStrategy`] in turn and
//! returns the first non-empty result:
//!
//! 1. [`PrimaryExport`]: the index page's CSV export, projected onto the
//!    first column containing `symbol` and the first containing both `name`
//!    and `company`.
//! 2. [`PrimaryPageTable`]: the first `<table>` of the page already loaded by
//!    step 1. Only runs when step 1 loaded the page and found no usable export.
//! 3. [`MirrorTable`]: the mirror page's `name, weight` table, with the symbol
//!    taken from the first word of the name.
//! 4. [`StaticConstituents`]: a fixed list of ten constituents.
//!
//! The static set needs no network, so [`ConstituentResolver::resolve`] never
//! fails and never returns an empty list.

use crate::config::EtlConfig;
use crate::error::FetchError;
use crate::models::Constituent;
use crate::sources::fetcher::{ContentShape, Page, RawTable, SourceFetcher};
use crate::utils::first_token;
use async_trait::async_trait;
use itertools::Itertools;
use tracing::{error, info, instrument, warn};

/// Known members returned when every network source fails.
const STATIC_CONSTITUENTS: [(&str, &str); 10] = [
    ("BALRAMCHIN", "Balrampur Chini Mills Ltd"),
    ("BATAINDIA", "Bata India Ltd"),
    ("BHEL", "Bharat Heavy Electricals Ltd"),
    ("COALINDIA", "Coal India Ltd"),
    ("DIVISLAB", "Divi's Laboratories Ltd"),
    ("EICHERMOT", "Eicher Motors Ltd"),
    ("GAIL", "GAIL (India) Ltd"),
    ("HINDALCO", "Hindalco Industries Ltd"),
    ("INDUSINDBK", "IndusInd Bank Ltd"),
    ("JSWSTEEL", "JSW Steel Ltd"),
];

/// Something that yields the list of index members.
pub trait ConstituentSource {
    async fn constituents(&self) -> Vec<Constituent>;
}

/// State shared between strategies during one resolution.
#[derive(Debug, Default)]
pub struct ResolveContext {
    /// The primary page, kept when it loaded but its export was missing or
    /// unusable. Left empty when the page or its export failed outright.
    pub primary_page: Option<Page>,
}

/// One step of the fallback chain.
#[async_trait]
pub trait ConstituentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(
        &self,
        fetcher: &SourceFetcher,
        ctx: &mut ResolveContext,
    ) -> Result<Vec<Constituent>, FetchError>;
}

/// Trim both fields, drop rows with a blank symbol or name, and keep the
/// first row for each symbol.
pub fn normalize<I>(pairs: I) -> Vec<Constituent>
where
    I: IntoIterator<Item = (String, String)>,
{
    pairs
        .into_iter()
        .map(|(symbol, name)| (symbol.trim().to_string(), name.trim().to_string()))
        .filter(|(symbol, name)| !symbol.is_empty() && !name.is_empty())
        .unique_by(|(symbol, _)| symbol.clone())
        .map(|(symbol, name)| Constituent { symbol, name })
        .collect()
}

/// Project an export onto `{symbol, name}` using substring column detection.
pub fn project_export(url: &str, table: &RawTable) -> Result<Vec<Constituent>, FetchError> {
    let symbol_col = table
        .find_column(|h| h.contains("symbol"))
        .ok_or_else(|| FetchError::MissingColumns {
            url: url.to_string(),
            missing: "symbol",
        })?;
    let name_col = table
        .headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != symbol_col)
        .find(|(_, h)| {
            let h = h.to_lowercase();
            h.contains("name") && h.contains("company")
        })
        .map(|(i, _)| i)
        .ok_or_else(|| FetchError::MissingColumns {
            url: url.to_string(),
            missing: "company name",
        })?;

    let pairs = table.rows.iter().filter_map(|row| {
        Some((row.get(symbol_col)?.clone(), row.get(name_col)?.clone()))
    });
    Ok(normalize(pairs))
}

fn non_empty(url: &str, constituents: Vec<Constituent>) -> Result<Vec<Constituent>, FetchError> {
    if constituents.is_empty() {
        Err(FetchError::NoRows {
            url: url.to_string(),
        })
    } else {
        Ok(constituents)
    }
}

/// Strategy 1: the index page's downloadable export.
#[derive(Debug, Clone)]
pub struct PrimaryExport {
    pub url: String,
}

#[async_trait]
impl ConstituentStrategy for PrimaryExport {
    fn name(&self) -> &'static str {
        "primary_export"
    }

    async fn resolve(
        &self,
        fetcher: &SourceFetcher,
        ctx: &mut ResolveContext,
    ) -> Result<Vec<Constituent>, FetchError> {
        let page = fetcher.fetch_page(&self.url).await?;

        let exported = fetcher
            .read_table(&page, ContentShape::DownloadableTable)
            .await;
        let table = match exported {
            Ok(table) => table,
            Err(e @ FetchError::NoExportLink { .. }) => {
                ctx.primary_page = Some(page);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let projected = project_export(&self.url, &table).and_then(|c| non_empty(&self.url, c));
        if projected.is_err() {
            ctx.primary_page = Some(page);
        }
        projected
    }
}

/// Strategy 2: the first table on the already loaded primary page.
#[derive(Debug, Clone, Default)]
pub struct PrimaryPageTable;

#[async_trait]
impl ConstituentStrategy for PrimaryPageTable {
    fn name(&self) -> &'static str {
        "primary_page_table"
    }

    async fn resolve(
        &self,
        _fetcher: &SourceFetcher,
        ctx: &mut ResolveContext,
    ) -> Result<Vec<Constituent>, FetchError> {
        let page = ctx.primary_page.take().ok_or(FetchError::PageUnavailable)?;
        let table = page.html_table()?;
        let pairs = table
            .rows
            .into_iter()
            .map(|mut row| {
                let name = row.pop().unwrap_or_default();
                let symbol = row.pop().unwrap_or_default();
                (symbol, name)
            });
        non_empty(&page.url, normalize(pairs))
    }
}

/// Strategy 3: the mirror site's `name, weight` table.
#[derive(Debug, Clone)]
pub struct MirrorTable {
    pub url: String,
}

#[async_trait]
impl ConstituentStrategy for MirrorTable {
    fn name(&self) -> &'static str {
        "mirror_table"
    }

    async fn resolve(
        &self,
        fetcher: &SourceFetcher,
        _ctx: &mut ResolveContext,
    ) -> Result<Vec<Constituent>, FetchError> {
        let table = fetcher.fetch_table(&self.url, ContentShape::HtmlTable).await?;
        let pairs = table.rows.into_iter().filter_map(|row| {
            let name = row.into_iter().next()?;
            Some((first_token(&name).to_string(), name))
        });
        non_empty(&self.url, normalize(pairs))
    }
}

/// Strategy 4: the hardcoded constituents. Always succeeds.
#[derive(Debug, Clone, Default)]
pub struct StaticConstituents;

impl StaticConstituents {
    pub fn constituents() -> Vec<Constituent> {
        STATIC_CONSTITUENTS
            .iter()
            .map(|(symbol, name)| Constituent::new(symbol, name))
            .collect()
    }
}

#[async_trait]
impl ConstituentStrategy for StaticConstituents {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn resolve(
        &self,
        _fetcher: &SourceFetcher,
        _ctx: &mut ResolveContext,
    ) -> Result<Vec<Constituent>, FetchError> {
        warn!("All network sources failed; using static constituents");
        Ok(Self::constituents())
    }
}

/// Runs the fallback chain.
pub struct ConstituentResolver {
    fetcher: SourceFetcher,
    strategies: Vec<Box<dyn ConstituentStrategy>>,
}

impl ConstituentResolver {
    /// The standard four-step chain for the configured endpoints.
    pub fn from_config(fetcher: SourceFetcher, config: &EtlConfig) -> Self {
        Self::with_strategies(
            fetcher,
            vec![
                Box::new(PrimaryExport {
                    url: config.primary_url.clone(),
                }),
                Box::new(PrimaryPageTable),
                Box::new(MirrorTable {
                    url: config.mirror_url.clone(),
                }),
                Box::new(StaticConstituents),
            ],
        )
    }

    pub fn with_strategies(
        fetcher: SourceFetcher,
        strategies: Vec<Box<dyn ConstituentStrategy>>,
    ) -> Self {
        Self {
            fetcher,
            strategies,
        }
    }

    /// Try each strategy in order and return the first non-empty result.
    #[instrument(level = "info", skip_all)]
    pub async fn resolve(&self) -> Vec<Constituent> {
        let mut ctx = ResolveContext::default();

        for strategy in &self.strategies {
            match strategy.resolve(&self.fetcher, &mut ctx).await {
                Ok(constituents) if !constituents.is_empty() => {
                    info!(
                        strategy = strategy.name(),
                        count = constituents.len(),
                        "Resolved constituents"
                    );
                    return constituents;
                }
                Ok(_) => {
                    warn!(strategy = strategy.name(), "Strategy returned no constituents");
                }
                Err(e) => {
                    warn!(
                        strategy = strategy.name(),
                        kind = ?e.kind(),
                        reason = e.reason(),
                        error = %e,
                        "Strategy failed; falling through"
                    );
                }
            }
        }

        error!("Fallback chain exhausted; using static constituents");
        StaticConstituents::constituents()
    }
}

impl ConstituentSource for ConstituentResolver {
    async fn constituents(&self) -> Vec<Constituent> {
        self.resolve().await
    }
}
