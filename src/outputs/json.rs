//! JSON export.
//!
//! The dataset is written as an array of record objects with 2-space
//! indentation. The layout matches the records-oriented JSON that downstream
//! consumers of this dataset already parse:
//!
//! - no space between a key and its value (`"symbol":"BHEL"`)
//! - forward slashes escaped as `\/`
//! - non-ASCII characters escaped as `\uXXXX`
//! - unset score placeholders written as `null`

use crate::assembler::Dataset;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use std::error::Error;
use std::io::{self, Write};
use tokio::fs;
use tracing::{info, instrument};

/// Pretty formatter with compact key separators and ASCII-only strings.
struct RecordsFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl RecordsFormatter<'_> {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for RecordsFormatter<'_> {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b":")
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            match c {
                '/' => writer.write_all(b"\\/")?,
                c if c.is_ascii() => writer.write_all(&[c as u8])?,
                c => {
                    for unit in c.encode_utf16(&mut units) {
                        write!(writer, "\\u{:04x}", unit)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Render the dataset's records as JSON text.
pub fn to_json_string(dataset: &Dataset) -> Result<String, Box<dyn Error>> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, RecordsFormatter::new());
    dataset.records.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}

/// Write the dataset to `path` as JSON.
#[instrument(level = "info", skip(dataset), fields(rows = dataset.records.len()))]
pub async fn write_json(dataset: &Dataset, path: &str) -> Result<(), Box<dyn Error>> {
    let json = to_json_string(dataset)?;
    fs::write(path, json).await?;
    info!(path, "Wrote JSON export");
    Ok(())
}
