//! MIME body extraction: every `text/plain` and `text/html` part, in document order.

use mail_parser::{Message, MessageParser, MimeHeaders, PartType};
use tracing::debug;

/// Text content of a message, one string per content type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeBodies {
    /// `text/plain` parts joined by newlines.
    pub text: String,
    /// `text/html` parts joined by newlines.
    pub html: String,
}

/// Collect the plain-text and HTML parts of a raw message.
///
/// Uses `mail-parser` for transfer and charset decoding. When it cannot
/// structure the message at all, everything after the header block is
/// returned as the plain text.
pub fn collect_bodies(raw_message: &[u8]) -> MimeBodies {
    match MessageParser::default().parse(raw_message) {
        Some(msg) => {
            let mut text = Vec::new();
            let mut html = Vec::new();
            walk_parts(&msg, &mut text, &mut html);
            MimeBodies {
                text: text.join("\n"),
                html: html.join("\n"),
            }
        }
        None => {
            debug!("mail-parser could not structure message, using raw body");
            MimeBodies {
                text: extract_body_fallback(raw_message),
                html: String::new(),
            }
        }
    }
}

/// Visit parts in document order, descending into attached messages.
fn walk_parts(msg: &Message<'_>, text: &mut Vec<String>, html: &mut Vec<String>) {
    for part in &msg.parts {
        match &part.body {
            PartType::Text(body) if is_plain(part.content_type()) => text.push(body.to_string()),
            PartType::Html(body) => html.push(body.to_string()),
            PartType::Message(inner) => walk_parts(inner, text, html),
            _ => {}
        }
    }
}

/// A part without a `Content-Type` defaults to `text/plain` (RFC 2045 §5.2).
fn is_plain(content_type: Option<&mail_parser::ContentType<'_>>) -> bool {
    match content_type {
        None => true,
        Some(ct) => {
            ct.ctype().eq_ignore_ascii_case("text")
                && ct.subtype().map_or(true, |sub| sub.eq_ignore_ascii_case("plain"))
        }
    }
}

/// Fallback body extraction when `mail-parser` cannot parse the message.
fn extract_body_fallback(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    if let Some(pos) = text.find("\r\n\r\n") {
        text[pos + 4..].to_string()
    } else if let Some(pos) = text.find("\n\n") {
        text[pos + 2..].to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_part_plain() {
        let raw = b"Subject: Hi\nMessage-ID: <a@b>\n\nHello there\n";
        let bodies = collect_bodies(raw);
        assert_eq!(bodies.text.trim_end(), "Hello there");
        assert!(bodies.html.is_empty());
    }

    #[test]
    fn test_alternative_keeps_both_types() {
        let raw = concat!(
            "Subject: Alt\n",
            "MIME-Version: 1.0\n",
            "Content-Type: multipart/alternative; boundary=\"XX\"\n",
            "\n",
            "--XX\n",
            "Content-Type: text/plain; charset=utf-8\n",
            "\n",
            "plain words\n",
            "--XX\n",
            "Content-Type: text/html; charset=utf-8\n",
            "\n",
            "<p>html words</p>\n",
            "--XX--\n",
        );
        let bodies = collect_bodies(raw.as_bytes());
        assert!(bodies.text.contains("plain words"));
        assert!(!bodies.text.contains("<p>"));
        assert!(bodies.html.contains("<p>html words</p>"));
    }

    #[test]
    fn test_other_text_subtypes_are_ignored() {
        let raw = concat!(
            "Subject: Invite\n",
            "MIME-Version: 1.0\n",
            "Content-Type: multipart/mixed; boundary=\"B\"\n",
            "\n",
            "--B\n",
            "Content-Type: text/plain\n",
            "\n",
            "first\n",
            "--B\n",
            "Content-Type: text/calendar\n",
            "\n",
            "BEGIN:VCALENDAR\n",
            "--B\n",
            "Content-Type: text/plain\n",
            "\n",
            "second\n",
            "--B--\n",
        );
        let bodies = collect_bodies(raw.as_bytes());
        assert!(bodies.text.contains("first"));
        assert!(bodies.text.contains("second"));
        assert!(bodies.text.find("first") < bodies.text.find("second"));
        assert!(!bodies.text.contains("VCALENDAR"));
    }

    #[test]
    fn test_extract_body_fallback() {
        assert_eq!(extract_body_fallback(b"A: b\r\n\r\nbody"), "body");
        assert_eq!(extract_body_fallback(b"A: b\n\nbody"), "body");
        assert_eq!(extract_body_fallback(b"no separator"), "");
    }
}
