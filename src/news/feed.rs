//! Minimal RSS 2.0 / Atom reader.
//!
//! Only the four fields the correlator needs are extracted from each
//! `<item>` (RSS) or `<entry>` (Atom):
//!
//! | Field | Elements read (first non-empty wins) |
//! |-------|--------------------------------------|
//! | `title` | `title` |
//! | `link` | `link` text, or `link/@href` |
//! | `summary` | `description`, `summary`, `content`, `content:encoded` |
//! | `published` | `pubDate`, `published`, `updated`, `dc:date` |
//!
//! Text and CDATA sections are concatenated; predefined XML entities and
//! numeric character references are decoded. Unknown entities are kept
//! verbatim, and a bare `&` that starts no reference (`M&M`) is read as text.
//!
//! Parsing is lenient: when the document breaks after some entries were
//! read, those entries are returned and the rest of the feed is dropped.

use crate::error::FetchError;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use tracing::warn;

/// Longest entity name accepted when deciding whether `&` starts a reference.
const MAX_REFERENCE_LEN: usize = 32;

/// One entry of a syndication feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub summary: String,
    pub link: String,
    pub published: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Summary,
    Link,
    Published,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"description" | b"summary" | b"content" | b"encoded" => Some(Field::Summary),
            b"link" => Some(Field::Link),
            b"pubDate" | b"published" | b"updated" | b"date" => Some(Field::Published),
            _ => None,
        }
    }
}

impl FeedEntry {
    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Summary => &mut self.summary,
            Field::Link => &mut self.link,
            Field::Published => &mut self.published,
        }
    }

    /// Store `value` unless the field already holds something.
    fn fill(&mut self, field: Field, value: &str) {
        let slot = self.slot(field);
        let value = value.trim();
        if slot.is_empty() && !value.is_empty() {
            *slot = value.to_string();
        }
    }
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

/// Atom `<link href="..."/>`; alternate links win over other relations.
fn atom_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut rel = None;
    for attr in e.attributes().flatten() {
        match attr.key.local_name().as_ref() {
            b"href" => {
                let raw = String::from_utf8_lossy(&attr.value).into_owned();
                href = Some(unescape(&raw).map(Cow::into_owned).unwrap_or(raw));
            }
            b"rel" => rel = Some(String::from_utf8_lossy(&attr.value).into_owned()),
            _ => {}
        }
    }
    match rel.as_deref() {
        None | Some("alternate") => href,
        Some(_) => None,
    }
}

fn resolve_entity(name: &str) -> String {
    if let Some(code) = name.strip_prefix('#') {
        let parsed = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        if let Some(c) = parsed.and_then(char::from_u32) {
            return c.to_string();
        }
    } else if let Some(resolved) = resolve_predefined_entity(name) {
        return resolved.to_string();
    }
    format!("&{};", name)
}

/// Whether the text following a `&` forms `name;`, `#digits;` or `#xhex;`.
fn starts_reference(after_amp: &str) -> bool {
    let Some((name, _)) = after_amp.split_once(';') else {
        return false;
    };
    !name.is_empty()
        && name.len() <= MAX_REFERENCE_LEN
        && name
            .chars()
            .enumerate()
            .all(|(i, c)| c.is_ascii_alphanumeric() || (i == 0 && c == '#'))
}

/// Escape every `&` that does not start a reference. CDATA sections are
/// copied untouched.
fn escape_stray_ampersands(xml: &str) -> Cow<'_, str> {
    if !xml.contains('&') {
        return Cow::Borrowed(xml);
    }
    let mut out = String::with_capacity(xml.len() + 16);
    let mut rest = xml;
    while let Some(pos) = rest.find(['&', '<']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        if rest.starts_with("<![CDATA[") {
            let end = rest.find("]]>").map_or(rest.len(), |i| i + 3);
            out.push_str(&rest[..end]);
            rest = &rest[end..];
        } else if let Some(after) = rest.strip_prefix('&') {
            out.push_str(if starts_reference(after) { "&" } else { "&amp;" });
            rest = after;
        } else {
            out.push('<');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Parse a feed document into its entries, in document order.
///
/// Fails only when the document is malformed before the first complete entry.
pub fn parse_feed(url: &str, xml: &str) -> Result<Vec<FeedEntry>, FetchError> {
    let xml = escape_stray_ampersands(xml);
    let mut reader = Reader::from_str(&xml);
    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    // Field being captured plus the local name that closes it.
    let mut capture: Option<(Field, Vec<u8>)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = e.local_name();
                let name = local.as_ref();
                if is_entry(name) {
                    current = Some(FeedEntry::default());
                    capture = None;
                } else if let (Some(entry), None) = (current.as_mut(), capture.as_ref()) {
                    if let Some(field) = Field::from_local_name(name) {
                        if field == Field::Link {
                            if let Some(href) = atom_href(&e) {
                                entry.fill(Field::Link, &href);
                            }
                        }
                        capture = Some((field, name.to_vec()));
                        text.clear();
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(entry) = current.as_mut() {
                    if e.local_name().as_ref() == b"link" {
                        if let Some(href) = atom_href(&e) {
                            entry.fill(Field::Link, &href);
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if capture.is_some() {
                    text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::CData(c)) => {
                if capture.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::GeneralRef(r)) => {
                if capture.is_some() {
                    text.push_str(&resolve_entity(&String::from_utf8_lossy(&r)));
                }
            }
            Ok(Event::End(e)) => {
                let local = e.local_name();
                let name = local.as_ref();
                if capture.as_ref().is_some_and(|(_, tag)| tag.as_slice() == name) {
                    if let (Some(entry), Some((field, _))) = (current.as_mut(), capture.take()) {
                        entry.fill(field, &text);
                    }
                    text.clear();
                } else if is_entry(name) && capture.is_none() {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                let message = format!("at byte {}: {}", reader.error_position(), e);
                if entries.is_empty() {
                    return Err(FetchError::Parse {
                        url: url.to_string(),
                        message,
                    });
                }
                warn!(
                    url,
                    kept = entries.len(),
                    error = %message,
                    "Feed is malformed; keeping entries read so far"
                );
                break;
            }
            _ => {}
        }
    }

    Ok(entries)
}
