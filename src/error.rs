//! Error types for source fetching and news correlation.
//!
//! Every network-facing call in the pipeline returns [`FetchError`]. None of
//! these errors escape the pipeline: the resolver turns them into a fall-through
//! to the next strategy and the correlator turns them into a skipped feed.

use thiserror::Error;

/// Broad classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeout, connection failure, or non-2xx status.
    Network,
    /// Expected table, column, or link was not found.
    Structural,
    /// Malformed feed or table content.
    Parse,
    /// Caller supplied an unusable argument; no source was contacted.
    Input,
}

/// Errors raised while fetching or interpreting an external source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("no tabular export link found on {url}")]
    NoExportLink { url: String },

    #[error("no table element found on {url}")]
    NoTableFound { url: String },

    #[error("table from {url} lacks a {missing} column")]
    MissingColumns { url: String, missing: &'static str },

    #[error("{url} yielded no usable rows")]
    NoRows { url: String },

    #[error("could not parse content from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("primary page was not loaded")]
    PageUnavailable,

    #[error("symbol must not be blank")]
    InvalidSymbol,
}

impl FetchError {
    /// Convert a `reqwest` failure into a [`FetchError`] tagged with the URL.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            FetchError::Timeout { url }
        } else if let Some(status) = err.status() {
            FetchError::HttpStatus {
                url,
                status: status.as_u16(),
            }
        } else if err.is_decode() || err.is_body() {
            FetchError::Parse {
                url,
                message: err.to_string(),
            }
        } else {
            FetchError::Connect {
                url,
                message: err.to_string(),
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Timeout { .. }
            | FetchError::Connect { .. }
            | FetchError::HttpStatus { .. } => ErrorKind::Network,
            FetchError::NoExportLink { .. }
            | FetchError::NoTableFound { .. }
            | FetchError::MissingColumns { .. }
            | FetchError::NoRows { .. }
            | FetchError::PageUnavailable => ErrorKind::Structural,
            FetchError::Parse { .. } => ErrorKind::Parse,
            FetchError::InvalidSymbol => ErrorKind::Input,
        }
    }

    /// Short machine-readable reason, used as a structured log field.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::Connect { .. } | FetchError::HttpStatus { .. } => "http_status",
            FetchError::NoExportLink { .. }
            | FetchError::NoTableFound { .. }
            | FetchError::MissingColumns { .. }
            | FetchError::NoRows { .. }
            | FetchError::PageUnavailable => "no_table_found",
            FetchError::Parse { .. } => "parse_error",
            FetchError::InvalidSymbol => "invalid_symbol",
        }
    }
}
