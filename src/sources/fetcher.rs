//! HTTP fetching and table extraction primitives.
//!
//! [`SourceFetcher`] wraps a single `reqwest` client configured with a
//! browser-like header set and a fixed request timeout. It knows two content
//! shapes:
//!
//! - [`ContentShape::DownloadableTable`]: the page links to a CSV export. The
//!   first anchor whose `href` mentions `csv` or whose text mentions `download`
//!   is resolved against the page URL, fetched, and parsed as delimited rows.
//! - [`ContentShape::HtmlTable`]: the first `<table>` on the page is read
//!   directly. The header row is skipped and the first two cells of every
//!   remaining row are kept.
//!
//! Both shapes produce a [`RawTable`]. Every failure is returned as a
//! [`FetchError`]; nothing here panics on bad input.

use crate::error::FetchError;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS,
};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").unwrap());

/// How a source exposes its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    /// The page links to a delimited export file.
    DownloadableTable,
    /// The page embeds the rows in its first `<table>`.
    HtmlTable,
}

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct Page {
    /// URL the page was requested from, used to resolve relative links.
    pub url: String,
    pub html: String,
}

impl Page {
    /// Locate the tabular export link and resolve it to an absolute URL.
    pub fn export_link(&self) -> Result<Url, FetchError> {
        let base = Url::parse(&self.url).map_err(|e| FetchError::Parse {
            url: self.url.clone(),
            message: e.to_string(),
        })?;
        find_export_link(&self.html, &base).ok_or_else(|| FetchError::NoExportLink {
            url: self.url.clone(),
        })
    }

    /// Read the first `<table>` of the page.
    pub fn html_table(&self) -> Result<RawTable, FetchError> {
        extract_html_table(&self.html).ok_or_else(|| FetchError::NoTableFound {
            url: self.url.clone(),
        })
    }
}

/// Rows read from a source, with the header row kept separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Index of the first header, in source order, accepted by `matches`.
    /// Headers are compared lowercased.
    pub fn find_column<F>(&self, matches: F) -> Option<usize>
    where
        F: Fn(&str) -> bool,
    {
        self.headers
            .iter()
            .position(|h| matches(&h.to_lowercase()))
    }
}

/// Shared HTTP client for pages, exports, and feeds.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    /// Build a fetcher whose requests all carry `timeout` and the browser headers.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` and return the body, failing on any non-2xx status.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?
            .error_for_status()
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!(bytes = body.len(), "Fetched body");
        Ok(body)
    }

    #[instrument(level = "info", skip(self))]
    pub async fn fetch_page(&self, url: &str) -> Result<Page, FetchError> {
        let html = self.get_text(url).await?;
        Ok(Page {
            url: url.to_string(),
            html,
        })
    }

    /// Follow the page's export link and parse the linked resource as CSV.
    #[instrument(level = "info", skip_all, fields(page = %page.url))]
    pub async fn export_table(&self, page: &Page) -> Result<RawTable, FetchError> {
        let link = page.export_link()?;
        info!(%link, "Found tabular export link");
        let body = self.get_text(link.as_str()).await?;
        parse_delimited(link.as_str(), &body)
    }

    /// Read rows from an already fetched page according to `shape`.
    pub async fn read_table(
        &self,
        page: &Page,
        shape: ContentShape,
    ) -> Result<RawTable, FetchError> {
        match shape {
            ContentShape::DownloadableTable => self.export_table(page).await,
            ContentShape::HtmlTable => page.html_table(),
        }
    }

    /// Fetch `url` and read rows according to `shape`.
    pub async fn fetch_table(
        &self,
        url: &str,
        shape: ContentShape,
    ) -> Result<RawTable, FetchError> {
        let page = self.fetch_page(url).await?;
        self.read_table(&page, shape).await
    }
}

/// First anchor whose `href` mentions `csv` or whose text mentions
/// `download`. Relative links resolve against the origin of `base`.
pub fn find_export_link(html: &str, base: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    document
        .select(&LINK_SELECTOR)
        .find(|a| {
            let href = a.value().attr("href").unwrap_or_default().to_lowercase();
            let label = a.text().collect::<String>().to_lowercase();
            href.contains("csv") || label.contains("download")
        })
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| match base.join("/").and_then(|origin| origin.join(href)) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(href, error = %e, "Export link could not be resolved");
                None
            }
        })
}

/// Cell text with each text node trimmed and concatenated.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect()
}

/// Read the first `<table>` in `html`. Returns `None` when the page has no
/// table. Rows with fewer than two cells are dropped.
pub fn extract_html_table(html: &str) -> Option<RawTable> {
    let document = Html::parse_document(html);
    let table = document.select(&TABLE_SELECTOR).next()?;

    let mut rows = table.select(&ROW_SELECTOR).map(|tr| {
        tr.select(&CELL_SELECTOR)
            .map(cell_text)
            .collect::<Vec<String>>()
    });

    let headers = rows.next().unwrap_or_default();
    let rows = rows
        .filter(|cells| cells.len() >= 2)
        .map(|cells| cells.into_iter().take(2).collect())
        .collect();

    Some(RawTable { headers, rows })
}

/// Parse comma-delimited text with a header row. Headers and values are trimmed.
pub fn parse_delimited(url: &str, body: &str) -> Result<RawTable, FetchError> {
    let body = body.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let to_parse_error = |e: csv::Error| {
        warn!(
            %url,
            error = %e,
            preview = %truncate_for_log(body, 200),
            "Delimited export did not parse"
        );
        FetchError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        }
    };

    let headers = reader
        .headers()
        .map_err(to_parse_error)?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(to_parse_error)?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(columns = headers.len(), rows = rows.len(), "Parsed delimited export");
    Ok(RawTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INDEX_PAGE: &str = r#"
        <html><body>
          <a href="/about">About</a>
          <a href="/files/constituents.CSV">Index file</a>
          <a href="/later.csv">Later</a>
        </body></html>"#;

    #[test]
    fn test_find_export_link_by_href() {
        let base = Url::parse("https://www.niftyindices.com/indices/equity/x").unwrap();
        let link = find_export_link(INDEX_PAGE, &base).unwrap();
        assert_eq!(link.as_str(), "https://www.niftyindices.com/files/constituents.CSV");
    }

    #[test]
    fn test_find_export_link_by_label() {
        let html = r#"<a href="getfile?id=7"> Download Constituents </a>"#;
        let base = Url::parse("https://example.com/indices/page").unwrap();
        let link = find_export_link(html, &base).unwrap();
        assert_eq!(link.as_str(), "https://example.com/getfile?id=7");
    }

    #[test]
    fn test_find_export_link_keeps_absolute_href() {
        let html = r#"<a href="https://cdn.example.org/list.csv">List</a>"#;
        let base = Url::parse("https://example.com/indices/page").unwrap();
        let link = find_export_link(html, &base).unwrap();
        assert_eq!(link.as_str(), "https://cdn.example.org/list.csv");
    }

    #[test]
    fn test_find_export_link_absent() {
        let html = r#"<a href="/about">About</a>"#;
        let base = Url::parse("https://example.com").unwrap();
        assert!(find_export_link(html, &base).is_none());
    }

    #[test]
    fn test_extract_html_table_skips_header_and_short_rows() {
        let html = r#"
            <table>
              <tr><th>Symbol</th><th>Company</th><th>Weight</th></tr>
              <tr><td> BHEL </td><td>Bharat <b>Heavy</b> Electricals</td><td>1.2</td></tr>
              <tr><td>lonely</td></tr>
              <tr><td>GAIL</td><td>GAIL (India) Ltd</td></tr>
            </table>
            <table><tr><td>ignored</td><td>second table</td></tr></table>"#;
        let table = extract_html_table(html).unwrap();
        assert_eq!(table.headers, vec!["Symbol", "Company", "Weight"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["BHEL".to_string(), "BharatHeavyElectricals".to_string()],
                vec!["GAIL".to_string(), "GAIL (India) Ltd".to_string()],
            ]
        );
    }

    #[test]
    fn test_extract_html_table_none_without_table() {
        assert!(extract_html_table("<p>No data</p>").is_none());
    }

    #[test]
    fn test_parse_delimited_trims_headers() {
        let body = "\u{feff} Issuer Symbol , Company Name,Weight\n\
                    BHEL, Bharat Heavy Electricals Ltd ,1.2\n";
        let table = parse_delimited("mem://csv", body).unwrap();
        assert_eq!(table.headers, vec!["Issuer Symbol", "Company Name", "Weight"]);
        assert_eq!(table.rows[0][1], "Bharat Heavy Electricals Ltd");
    }

    #[test]
    fn test_find_column_first_match_wins() {
        let table = RawTable {
            headers: vec!["Symbol".into(), "Alt Symbol".into()],
            rows: vec![],
        };
        assert_eq!(table.find_column(|h| h.contains("symbol")), Some(0));
        assert_eq!(table.find_column(|h| h.contains("isin")), None);
    }

    #[tokio::test]
    async fn test_fetch_table_follows_export_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<a href="/exports/list.csv">CSV</a>"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/exports/list.csv"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("Symbol,Company Name\nBHEL,Bharat\n"),
            )
            .mount(&server)
            .await;

        let fetcher = SourceFetcher::new(Duration::from_secs(5)).unwrap();
        let table = fetcher
            .fetch_table(&format!("{}/index", server.uri()), ContentShape::DownloadableTable)
            .await
            .unwrap();
        assert_eq!(table.headers, vec!["Symbol", "Company Name"]);
        assert_eq!(table.rows, vec![vec!["BHEL".to_string(), "Bharat".to_string()]]);
    }

    #[tokio::test]
    async fn test_http_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = SourceFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch_page(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher = SourceFetcher::new(Duration::from_millis(200)).unwrap();
        let err = fetcher.fetch_page(&server.uri()).await.unwrap_err();
        assert_eq!(err.reason(), "timeout");
    }

    #[tokio::test]
    async fn test_html_table_shape_without_table() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>maintenance</p>"))
            .mount(&server)
            .await;

        let fetcher = SourceFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher
            .fetch_table(&server.uri(), ContentShape::HtmlTable)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NoTableFound { .. }));
    }
}
