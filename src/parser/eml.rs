//! Parser for single RFC 5322 messages as stored in the mail database.

use crate::model::message::{FieldValue, ParsedEmail, HTML_KEY, TEXT_KEY};
use crate::parser::{header, mime};

/// Parse a raw message into its ordered fields plus the synthetic `text`
/// and `html` entries.
///
/// Never fails: unparseable headers are skipped and a body `mail-parser`
/// cannot structure falls back to the raw text after the headers. The empty
/// string yields only the two (empty) synthetic entries.
pub fn parse_email(raw: &str) -> ParsedEmail {
    let data = skip_from_line(raw);
    let header_end = find_header_end(data.as_bytes()).unwrap_or(data.len());

    let mut email = ParsedEmail::new();
    header::parse_fields(&data[..header_end], &mut email);

    let bodies = mime::collect_bodies(data.as_bytes());
    email.insert(TEXT_KEY, FieldValue::Text(bodies.text));
    email.insert(HTML_KEY, FieldValue::Text(bodies.html));
    email
}

/// Skip a BOM and an mbox-style `From ` separator line, if present.
fn skip_from_line(data: &str) -> &str {
    let data = data.strip_prefix('\u{feff}').unwrap_or(data);
    if data.starts_with("From ") {
        if let Some(pos) = data.find('\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Find the byte offset where headers end (position of the first blank line).
fn find_header_end(data: &[u8]) -> Option<usize> {
    if data.first() == Some(&b'\n') {
        return Some(0);
    }
    if data.starts_with(b"\r\n") {
        return Some(0);
    }
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i);
        }
    }
    None
}
