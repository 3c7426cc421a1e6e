//! Helpers for string handling, timestamps, and file system checks.

use chrono::Local;
use std::error::Error;
use std::fs as stdfs;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a character boundary) and
/// suffixed with `"…(+N bytes)"`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// First whitespace-delimited word of `s`, or `""` when there is none.
pub fn first_token(s: &str) -> &str {
    s.split_whitespace().next().unwrap_or_default()
}

/// Local time in the `data_fetch_date` column format.
pub fn fetch_timestamp() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Default output base name, e.g. `nifty_smallcap_momentum_data_20250506_143000`.
pub fn default_output_base() -> String {
    format!(
        "nifty_smallcap_momentum_data_{}",
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Export base path: `name` placed under `output_dir`, unless `name` is
/// already absolute.
pub fn export_base(output_dir: &str, name: &str) -> PathBuf {
    Path::new(output_dir).join(name)
}

/// `base` with `.extension` appended to its file name.
pub fn export_path(base: &Path, extension: &str) -> String {
    format!("{}.{}", base.display(), extension)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let s = "₹₹₹₹";
        let result = truncate_for_log(s, 4);
        assert!(result.starts_with('₹'));
        assert!(result.contains("…(+9 bytes)"));
    }

    #[test]
    fn test_first_token() {
        assert_eq!(first_token("RELIANCE Industries Ltd"), "RELIANCE");
        assert_eq!(first_token("  GAIL (India) Ltd"), "GAIL");
        assert_eq!(first_token("   "), "");
    }

    #[test]
    fn test_fetch_timestamp_shape() {
        let ts = fetch_timestamp();
        assert_eq!(ts.len(), "2025-05-06T14:30:00.123456".len());
        assert_eq!(&ts[10..11], "T");
    }

    #[test]
    fn test_default_output_base_prefix() {
        assert!(default_output_base().starts_with("nifty_smallcap_momentum_data_"));
    }

    #[test]
    fn test_export_base_relative_name() {
        let base = export_base("./data/", "sample");
        assert_eq!(export_path(&base, "csv"), "./data/sample.csv");
    }

    #[test]
    fn test_export_base_keeps_absolute_name() {
        let base = export_base(".", "/tmp/x");
        assert_eq!(base, PathBuf::from("/tmp/x"));
        assert_eq!(export_path(&base, "json"), "/tmp/x.json");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("out/nested");
        ensure_writable_dir(nested.to_str().unwrap()).await.unwrap();
        assert!(nested.is_dir());
    }
}
