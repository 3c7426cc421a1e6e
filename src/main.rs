//! # Index News ETL
//!
//! Resolves the constituents of an equity index and enriches each one with
//! recent exchange news, then exports the result as CSV and/or JSON.
//!
//! ## Usage
//!
//! ```sh
//! index_news_etl --format both --output-dir ./data
//! ```
//!
//! ## Architecture
//!
//! The pipeline runs strictly in sequence:
//! 1. **Resolve**: walk the constituent fallback chain (primary export, page
//!    table, mirror table, static set) until one source yields rows
//! 2. **Correlate**: for each symbol, scan the exchange RSS feeds for entries
//!    mentioning it and keep the three most recent
//! 3. **Assemble**: merge constituents and news into fixed-column records
//! 4. **Export**: write CSV and/or JSON files and log a summary
//!
//! Source failures never abort the run; they degrade the output instead.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod assembler;
mod cli;
mod config;
mod error;
mod models;
mod news;
mod outputs;
mod sources;
mod utils;

use assembler::DatasetAssembler;
use cli::Cli;
use config::EtlConfig;
use news::correlator::NewsCorrelator;
use sources::fetcher::SourceFetcher;
use sources::resolver::ConstituentResolver;
use utils::{default_output_base, ensure_writable_dir, export_base, export_path};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("index_news_etl starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Fail on an unwritable output directory before any network work.
    let name = args.output.clone().unwrap_or_else(default_output_base);
    let base = export_base(&args.output_dir, &name);
    let target_dir = match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.display().to_string(),
        _ => args.output_dir.clone(),
    };
    if let Err(e) = ensure_writable_dir(&target_dir).await {
        error!(
            path = %target_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let config = EtlConfig::load(args.config.as_deref()).await?;
    info!(
        index = %config.index_name,
        feeds = config.feeds.len(),
        format = ?args.format,
        "Configuration ready"
    );

    // ---- Build pipeline ----
    let fetcher = SourceFetcher::new(config.request_timeout())?;
    let resolver = ConstituentResolver::from_config(fetcher.clone(), &config);
    let correlator = NewsCorrelator::from_config(fetcher, &config);
    let assembler = DatasetAssembler::new(resolver, correlator, &config);

    let dataset = assembler.assemble(args.limit).await;

    // ---- Export ----
    let mut files_created = Vec::new();

    if args.format.wants_csv() {
        let path = export_path(&base, "csv");
        outputs::csv::write_csv(&dataset, &path).await?;
        files_created.push(path);
    }
    if args.format.wants_json() {
        let path = export_path(&base, "json");
        outputs::json::write_json(&dataset, &path).await?;
        files_created.push(path);
    }

    // ---- Summary ----
    let sample = dataset
        .records
        .iter()
        .take(5)
        .map(|r| r.symbol.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    info!(
        total_symbols = dataset.records.len(),
        symbols_with_news = dataset.symbols_with_news(),
        data_fetch_date = %dataset.fetched_at,
        index = %dataset.index_name,
        %sample,
        "Dataset summary"
    );
    info!(files = %files_created.join(", "), "Files created");

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
