//! Email address values of address headers (RFC 5322 §3.4).

use crate::parser::header::decode_encoded_words;

/// A parsed `(display-name, address)` pair.
///
/// # Examples
/// - `"Ana Pérez <ana@example.com>"` → `display_name = "Ana Pérez"`, `address = "ana@example.com"`
/// - `"ana@example.com"` → `display_name = ""`, `address = "ana@example.com"`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`), or the raw text when no address is recognizable.
    pub address: String,
}

impl EmailAddress {
    /// Parse one mailbox.
    ///
    /// Accepts `user@domain`, `<user@domain>`, `Name <user@domain>` and
    /// `"Quoted, Name" <user@domain>`. Anything else is kept verbatim as the address.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let (Some(open), Some(close)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if close > open {
                return Self {
                    display_name: strip_quotes(&trimmed[..open]),
                    address: trimmed[open + 1..close].trim().to_string(),
                };
            }
        }

        Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// Parse the value of an address header into its mailboxes.
    ///
    /// RFC 2047 encoded-words are decoded first. Commas inside quotes or angle
    /// brackets do not split. Empty segments are dropped.
    pub fn parse_header(raw: &str) -> Vec<Self> {
        let decoded = decode_encoded_words(raw);
        let mut results = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;

        for ch in decoded.chars() {
            match ch {
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '<' if !in_quotes => {
                    in_angle = true;
                    current.push(ch);
                }
                '>' if !in_quotes => {
                    in_angle = false;
                    current.push(ch);
                }
                ',' if !in_quotes && !in_angle => {
                    push_nonempty(&mut results, &current);
                    current.clear();
                }
                _ => current.push(ch),
            }
        }
        push_nonempty(&mut results, &current);

        results
    }
}

fn push_nonempty(results: &mut Vec<EmailAddress>, segment: &str) {
    let addr = EmailAddress::parse(segment);
    if !addr.address.is_empty() {
        results.push(addr);
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{} <{}>", self.display_name, self.address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_and_bracketed() {
        let bare = EmailAddress::parse("ana@example.com");
        assert_eq!(bare.address, "ana@example.com");
        assert!(bare.display_name.is_empty());

        let bracketed = EmailAddress::parse(" <ana@example.com> ");
        assert_eq!(bracketed.address, "ana@example.com");
        assert!(bracketed.display_name.is_empty());
    }

    #[test]
    fn test_parse_header_quoted_comma() {
        let list = EmailAddress::parse_header("\"Pérez, Ana\" <ana@example.com>, bob@example.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Pérez, Ana");
        assert_eq!(list[1].address, "bob@example.com");
    }

    #[test]
    fn test_parse_header_decodes_encoded_words() {
        let list = EmailAddress::parse_header("=?UTF-8?Q?Jos=C3=A9?= <jose@example.com>");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].display_name, "José");
        assert_eq!(list[0].address, "jose@example.com");
    }

    #[test]
    fn test_parse_header_skips_empty_segments() {
        assert!(EmailAddress::parse_header("").is_empty());
        assert_eq!(EmailAddress::parse_header("a@b.com, ,").len(), 1);
    }

    #[test]
    fn test_display() {
        let named = EmailAddress::parse("Ana <ana@example.com>");
        assert_eq!(named.to_string(), "Ana <ana@example.com>");
        let bare = EmailAddress::parse("ana@example.com");
        assert_eq!(bare.to_string(), "ana@example.com");
    }
}
