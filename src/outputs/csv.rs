//! CSV export.
//!
//! One header row followed by one row per record. Fields are quoted only when
//! they contain a comma, quote, or line break, rows end with `\n`, and unset
//! score placeholders are written as empty fields.

use crate::assembler::Dataset;
use crate::models::COLUMNS;
use std::error::Error;
use tokio::fs;
use tracing::{info, instrument};

/// Render the dataset as CSV text.
pub fn to_csv_string(dataset: &Dataset) -> Result<String, Box<dyn Error>> {
    let mut writer = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(COLUMNS)?;
    for record in &dataset.records {
        writer.write_record(record.to_row())?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Write the dataset to `path` as CSV.
#[instrument(level = "info", skip(dataset), fields(rows = dataset.records.len()))]
pub async fn write_csv(dataset: &Dataset, path: &str) -> Result<(), Box<dyn Error>> {
    let text = to_csv_string(dataset)?;
    fs::write(path, text).await?;
    info!(path, "Wrote CSV export");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Constituent, EnrichedRecord, NewsSummary};

    fn dataset() -> Dataset {
        let news = NewsSummary {
            news_titles: "Results, Q3 | Board \"Meeting\"".to_string(),
            news_links: "https://a | https://b".to_string(),
            news_categories: "Financial Results | Board Meeting".to_string(),
            last_news_update: "Mon, 10 Feb 2025 18:30:00 +0530".to_string(),
        };
        Dataset {
            records: vec![
                EnrichedRecord::new(
                    &Constituent::new("BHEL", "Bharat Heavy Electricals Ltd"),
                    news,
                    "2025-05-06T14:30:00.123456",
                    "Test Index",
                ),
                EnrichedRecord::new(
                    &Constituent::new("GAIL", "GAIL (India) Ltd"),
                    NewsSummary::default(),
                    "2025-05-06T14:30:00.123456",
                    "Test Index",
                ),
            ],
            fetched_at: "2025-05-06T14:30:00.123456".to_string(),
            index_name: "Test Index".to_string(),
        }
    }

    #[test]
    fn test_csv_header_and_rows() {
        let text = to_csv_string(&dataset()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], COLUMNS.join(","));
        assert_eq!(
            lines[2],
            "GAIL,GAIL (India) Ltd,,,,,,,,,,,,,,,2025-05-06T14:30:00.123456,Test Index"
        );
        assert!(text.ends_with('\n'));
        assert!(!text.contains('\r'));
    }

    #[test]
    fn test_csv_quotes_only_when_needed() {
        let text = to_csv_string(&dataset()).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with("BHEL,Bharat Heavy Electricals Ltd,"));
        assert!(row.contains(r#""Results, Q3 | Board ""Meeting""""#));
        assert!(row.contains(r#""Mon, 10 Feb 2025 18:30:00 +0530""#));
    }

    #[tokio::test]
    async fn test_write_csv_to_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        let path = path.to_str().unwrap();
        write_csv(&dataset(), path).await.unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(written, to_csv_string(&dataset()).unwrap());
    }
}
