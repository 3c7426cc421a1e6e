//! Data models for constituents, news items, and enriched output records.
//!
//! - [`Constituent`]: one member of the tracked index
//! - [`NewsItem`]: one feed entry matched to a symbol
//! - [`EnrichedRecord`]: a constituent plus score placeholders and aggregated news
//!
//! [`EnrichedRecord`] serializes with the exact column names and order of the
//! exported dataset, see [`COLUMNS`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used when joining news titles, links, and categories.
pub const NEWS_SEPARATOR: &str = " | ";

/// Output column order shared by the CSV and JSON writers.
pub const COLUMNS: [&str; 18] = [
    "symbol",
    "name",
    "Revenue & Profit Growth",
    "Large Market / Sector Growth",
    "Scalability & Operating Leverage",
    "Strong Management",
    "Low or Manageable Debt",
    "Positive Cash Flow",
    "Competitive Advantage (Moat)",
    "Undervaluation / Mispricing",
    "Small-to-Mid Cap Growth Potential",
    "Price Momentum / Market Recognition",
    "news_titles",
    "news_links",
    "news_categories",
    "last_news_update",
    "data_fetch_date",
    "index_name",
];

/// A symbol/name pair for one index member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituent {
    /// Trading code, non-empty and unique within a resolved list.
    pub symbol: String,
    /// Company display name.
    pub name: String,
}

impl Constituent {
    pub fn new(symbol: &str, name: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
        }
    }
}

/// Keyword-derived category of a news item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsCategory {
    FinancialResults,
    InsiderTrading,
    BoardMeeting,
    CorporateAnnouncement,
    General,
}

impl NewsCategory {
    /// Classify a title by keyword. Rules are checked in order and the first
    /// rule with any keyword contained in the lowercased title wins.
    pub fn classify(title: &str) -> Self {
        const RULES: [(&[&str], NewsCategory); 4] = [
            (
                &["result", "earning", "profit", "revenue"],
                NewsCategory::FinancialResults,
            ),
            (&["insider", "promoter", "pledge"], NewsCategory::InsiderTrading),
            (&["board", "meeting", "agenda"], NewsCategory::BoardMeeting),
            (&["announcement", "notice"], NewsCategory::CorporateAnnouncement),
        ];

        let lower = title.to_lowercase();
        RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(_, category)| *category)
            .unwrap_or(NewsCategory::General)
    }

    /// Human-readable label written to the `news_categories` column.
    pub fn label(&self) -> &'static str {
        match self {
            NewsCategory::FinancialResults => "Financial Results",
            NewsCategory::InsiderTrading => "Insider Trading",
            NewsCategory::BoardMeeting => "Board Meeting",
            NewsCategory::CorporateAnnouncement => "Corporate Announcement",
            NewsCategory::General => "General",
        }
    }
}

impl fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A feed entry that mentions a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    /// Publication time exactly as the feed wrote it.
    pub published: String,
    /// Name of the feed the entry came from.
    pub source_feed: String,
    pub category: NewsCategory,
    /// Symbol the entry was matched against.
    pub symbol: String,
}

/// The ten scoring placeholders. They are carried through untouched and
/// serialize as `null` in JSON and as empty fields in CSV.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreCard {
    #[serde(rename = "Revenue & Profit Growth")]
    pub revenue_profit_growth: Option<f64>,
    #[serde(rename = "Large Market / Sector Growth")]
    pub market_sector_growth: Option<f64>,
    #[serde(rename = "Scalability & Operating Leverage")]
    pub scalability: Option<f64>,
    #[serde(rename = "Strong Management")]
    pub management: Option<f64>,
    #[serde(rename = "Low or Manageable Debt")]
    pub debt: Option<f64>,
    #[serde(rename = "Positive Cash Flow")]
    pub cash_flow: Option<f64>,
    #[serde(rename = "Competitive Advantage (Moat)")]
    pub moat: Option<f64>,
    #[serde(rename = "Undervaluation / Mispricing")]
    pub undervaluation: Option<f64>,
    #[serde(rename = "Small-to-Mid Cap Growth Potential")]
    pub growth_potential: Option<f64>,
    #[serde(rename = "Price Momentum / Market Recognition")]
    pub momentum: Option<f64>,
}

impl ScoreCard {
    /// Scores in column order.
    pub fn values(&self) -> [Option<f64>; 10] {
        [
            self.revenue_profit_growth,
            self.market_sector_growth,
            self.scalability,
            self.management,
            self.debt,
            self.cash_flow,
            self.moat,
            self.undervaluation,
            self.growth_potential,
            self.momentum,
        ]
    }
}

/// Aggregated news columns for one constituent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewsSummary {
    pub news_titles: String,
    pub news_links: String,
    pub news_categories: String,
    /// `published` of the most recent item, empty when nothing matched.
    pub last_news_update: String,
}

impl NewsSummary {
    /// Join already-sorted items, newest first.
    pub fn from_items(items: &[NewsItem]) -> Self {
        let join = |f: fn(&NewsItem) -> &str| {
            items.iter().map(f).collect::<Vec<_>>().join(NEWS_SEPARATOR)
        };
        Self {
            news_titles: join(|i| &i.title),
            news_links: join(|i| &i.link),
            news_categories: join(|i| i.category.label()),
            last_news_update: items
                .first()
                .map(|i| i.published.clone())
                .unwrap_or_default(),
        }
    }

    pub fn has_news(&self) -> bool {
        !self.news_titles.is_empty()
    }
}

/// One output row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub symbol: String,
    pub name: String,
    #[serde(flatten)]
    pub scores: ScoreCard,
    #[serde(flatten)]
    pub news: NewsSummary,
    pub data_fetch_date: String,
    pub index_name: String,
}

impl EnrichedRecord {
    pub fn new(
        constituent: &Constituent,
        news: NewsSummary,
        data_fetch_date: &str,
        index_name: &str,
    ) -> Self {
        Self {
            symbol: constituent.symbol.clone(),
            name: constituent.name.clone(),
            scores: ScoreCard::default(),
            news,
            data_fetch_date: data_fetch_date.to_string(),
            index_name: index_name.to_string(),
        }
    }

    /// Field values in [`COLUMNS`] order, with unset scores as empty strings.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(COLUMNS.len());
        row.push(self.symbol.clone());
        row.push(self.name.clone());
        row.extend(
            self.scores
                .values()
                .iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
        );
        row.push(self.news.news_titles.clone());
        row.push(self.news.news_links.clone());
        row.push(self.news.news_categories.clone());
        row.push(self.news.last_news_update.clone());
        row.push(self.data_fetch_date.clone());
        row.push(self.index_name.clone());
        row
    }
}
