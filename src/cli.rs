//! Command-line interface definitions for the index news ETL.

use clap::{Parser, ValueEnum};

/// Which export files to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
    Both,
}

impl OutputFormat {
    pub fn wants_csv(self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }

    pub fn wants_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # CSV and JSON into the current directory
/// index_news_etl
///
/// # Only the first 20 constituents, CSV only
/// index_news_etl --format csv --limit 20 --output smallcap_sample
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Both)]
    pub format: OutputFormat,

    /// Output filename without extension (defaults to a timestamped name)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Directory the export files are written to
    #[arg(short = 'd', long, default_value = ".")]
    pub output_dir: String,

    /// Limit the number of constituents processed
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Optional path to a YAML config overriding endpoints and pauses
    #[arg(short, long)]
    pub config: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["index_news_etl"]);
        assert_eq!(cli.format, OutputFormat::Both);
        assert_eq!(cli.output_dir, ".");
        assert!(cli.output.is_none());
        assert!(cli.limit.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "index_news_etl",
            "--format",
            "json",
            "--output",
            "sample",
            "-d",
            "/tmp/out",
            "--limit",
            "5",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.output.as_deref(), Some("sample"));
        assert_eq!(cli.output_dir, "/tmp/out");
        assert_eq!(cli.limit, Some(5));
        assert!(!cli.format.wants_csv());
        assert!(cli.format.wants_json());
    }

    #[test]
    fn test_cli_config_only_from_flag() {
        let cli = Cli::parse_from(["index_news_etl"]);
        assert!(cli.config.is_none());

        let cli = Cli::parse_from(["index_news_etl", "-c", "etl.yaml"]);
        assert_eq!(cli.config.as_deref(), Some("etl.yaml"));
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["index_news_etl", "--format", "xml"]).is_err());
    }
}
