//! RFC 5322 header parsing: folding, typed field values, encoded-words (RFC 2047), dates.

use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use tracing::{debug, warn};

use crate::model::address::EmailAddress;
use crate::model::message::{FieldValue, ParsedEmail};

/// Headers whose value is a list of mailboxes.
const ADDRESS_HEADERS: &[&str] = &[
    "from",
    "to",
    "cc",
    "bcc",
    "sender",
    "reply-to",
    "resent-from",
    "resent-to",
    "resent-cc",
    "resent-bcc",
    "resent-sender",
];

/// Headers whose value is a date.
const DATE_HEADERS: &[&str] = &["date", "resent-date"];

/// Parse a header block into typed fields, appended to `email` in order.
pub fn parse_fields(header_block: &str, email: &mut ParsedEmail) {
    for (name, raw) in unfold_headers(header_block) {
        let value = field_value(&name, raw);
        email.insert(name, value);
    }
}

/// Type one header value by its name.
fn field_value(name: &str, raw: String) -> FieldValue {
    let lower = name.to_ascii_lowercase();
    if ADDRESS_HEADERS.contains(&lower.as_str()) {
        return FieldValue::Addresses(EmailAddress::parse_header(&raw));
    }
    if DATE_HEADERS.contains(&lower.as_str()) {
        if let Some(dt) = parse_date(&raw) {
            return FieldValue::Date(dt);
        }
    }
    FieldValue::Text(raw)
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns `(name, raw_value)` pairs with names as spelled in the message.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                debug!(line = line, "Skipping malformed header line");
                continue;
            }
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name.to_string(), value));
        }
    }

    result
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// If decoding fails for any token, the original text is preserved.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // Whitespace between two encoded words is dropped (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        match decode_one_word(after_start) {
            Some((text, consumed)) => {
                result.push_str(&text);
                remaining = &after_start[consumed..];
                last_was_encoded = true;
            }
            None => {
                result.push_str("=?");
                remaining = after_start;
                last_was_encoded = false;
            }
        }
    }

    result.push_str(remaining);
    result
}

/// Decode `charset?encoding?text?=`, returning the text and the bytes consumed.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    let mut pieces = s.splitn(3, '?');
    let charset = pieces.next()?;
    let encoding = pieces.next()?;
    let rest = pieces.next()?;
    let end = rest.find("?=")?;
    let encoded_text = &rest[..end];

    let consumed = charset.len() + 1 + encoding.len() + 1 + end + 2;

    let bytes = match encoding {
        "B" | "b" => base64::engine::general_purpose::STANDARD
            .decode(encoded_text.trim())
            .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(encoded_text.trim()))
            .ok()?,
        "Q" | "q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    Some((decode_charset(charset, &bytes), consumed))
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode bytes using a named charset.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    // RFC 2231 language suffix: "utf-8*en"
    let label = charset.split('*').next().unwrap_or(charset);
    match encoding_rs::Encoding::for_label(label.as_bytes()) {
        Some(encoding) => encoding.decode(bytes).0.into_owned(),
        None => {
            warn!(charset = charset, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Parse an email date string, keeping its UTC offset.
///
/// Supports RFC 2822, ISO 8601, IMAP-style `DD-MMM-YYYY` and named zones.
/// Dates without any zone are taken as UTC.
pub fn parse_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt);
    }

    let no_dow = strip_day_of_week(strip_comment(trimmed));
    let candidates = [
        no_dow.to_string(),
        normalize_imap_date(no_dow),
        replace_named_tz(no_dow),
        replace_named_tz(&normalize_imap_date(no_dow)),
    ];

    const ZONED: [&str; 4] = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %z",
    ];
    const NAIVE: [&str; 6] = [
        "%d %b %Y %H:%M:%S",
        "%b %d %H:%M:%S %Y",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];

    for candidate in &candidates {
        for fmt in ZONED {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(dt);
            }
        }
        for fmt in NAIVE {
            if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
                return Some(ndt.and_utc().fixed_offset());
            }
        }
    }

    if let Some(dt) = mail_parser_date(trimmed) {
        return Some(dt);
    }

    debug!(date = trimmed, "Could not parse date");
    None
}

/// Last resort: let `mail-parser` read the date from a one-header message.
fn mail_parser_date(input: &str) -> Option<DateTime<FixedOffset>> {
    let fake_msg = format!("Date: {input}\n\n");
    let parsed = mail_parser::MessageParser::default().parse(fake_msg.as_bytes())?;
    DateTime::parse_from_rfc3339(&parsed.date()?.to_rfc3339()).ok()
}

/// Drop a trailing parenthesized comment: `"... +0000 (UTC)"`.
fn strip_comment(s: &str) -> &str {
    match s.find('(') {
        Some(pos) => s[..pos].trim_end(),
        None => s,
    }
}

/// Normalize IMAP-style dates: `"16-JUL-2025 03:01:03"` → `"16 Jul 2025 03:01:03"`.
fn normalize_imap_date(s: &str) -> String {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    for month in MONTHS {
        for spelled in [month.to_uppercase(), month.to_lowercase(), month.to_string()] {
            let pattern = format!("-{spelled}-");
            if s.contains(&pattern) {
                return s.replacen(&pattern, &format!(" {month} "), 1);
            }
        }
    }
    s.to_string()
}

/// Strip a leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> &str {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    for day in DAYS {
        if let Some(rest) = s.strip_prefix(day) {
            if rest.starts_with(',') || rest.starts_with(' ') {
                return rest.trim_start_matches(',').trim();
            }
        }
    }
    s
}

/// Replace a trailing timezone abbreviation with its numeric offset.
fn replace_named_tz(s: &str) -> String {
    const ZONES: [(&str, &str); 13] = [
        ("CEST", "+0200"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("CET", "+0100"),
        ("JST", "+0900"),
    ];
    for (name, offset) in ZONES {
        if let Some(prefix) = s.strip_suffix(name) {
            return format!("{prefix}{offset}");
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SG9sYSBtdW5kbw==?="), "Hola mundo");
    }

    #[test]
    fn test_decode_adjacent_encoded_words() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_q_latin1_and_cp1252() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?="), "café");
        assert_eq!(decode_encoded_words("=?Windows-1252?Q?M=FCller?="), "Müller");
    }

    #[test]
    fn test_decode_broken_word_is_kept() {
        assert_eq!(decode_encoded_words("price =?x"), "price =?x");
    }

    #[test]
    fn test_unfold_keeps_name_spelling() {
        let text = "Subject: A long\n\tsubject\nMessage-Id: <a@b>\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0], ("Subject".to_string(), "A long subject".to_string()));
        assert_eq!(headers[1].0, "Message-Id");
    }

    #[test]
    fn test_parse_fields_types_values() {
        let mut email = ParsedEmail::new();
        parse_fields(
            "From: Ana <ana@example.com>\nDate: Thu, 04 Jan 2024 10:00:00 +0100\nX-Mailer: mutt\nDate-ish junk\n",
            &mut email,
        );
        assert!(matches!(email.get("from"), Some(FieldValue::Addresses(list)) if list.len() == 1));
        match email.get("Date") {
            Some(FieldValue::Date(dt)) => assert_eq!(dt.offset().local_minus_utc(), 3600),
            other => panic!("expected a date, got {other:?}"),
        }
        assert_eq!(email.get_str("x-mailer").as_deref(), Some("mutt"));
        assert_eq!(email.len(), 3);
    }

    #[test]
    fn test_unparseable_date_stays_text() {
        let mut email = ParsedEmail::new();
        parse_fields("Date: sometime last week\n", &mut email);
        assert_eq!(
            email.get("date"),
            Some(&FieldValue::Text("sometime last week".into()))
        );
    }

    #[test]
    fn test_parse_date_variants() {
        assert!(parse_date("Thu, 04 Jan 2024 10:00:00 +0000").is_some());
        assert!(parse_date("04 Jan 2024 10:00:00 +0000").is_some());
        assert!(parse_date("2024-01-04T10:00:00Z").is_some());
        assert!(parse_date("Thu, 04 Jan 2024 10:00:00 +0000 (UTC)").is_some());

        let est = parse_date("Thu, 04 Jan 2024 10:00:00 EST").unwrap();
        assert_eq!(est.offset().local_minus_utc(), -5 * 3600);

        let imap = parse_date("16-JUL-2025 03:01:03").unwrap();
        assert_eq!(imap.format("%Y-%m-%d").to_string(), "2025-07-16");
        assert_eq!(imap.offset().local_minus_utc(), 0);

        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_normalize_imap_date() {
        assert_eq!(normalize_imap_date("10-MAR-2025 06:00:42"), "10 Mar 2025 06:00:42");
        assert_eq!(normalize_imap_date("04 Jan 2024 10:00:00"), "04 Jan 2024 10:00:00");
    }
}
