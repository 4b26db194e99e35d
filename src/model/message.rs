//! Parsed email: an ordered header/value mapping plus synthetic body entries.

use std::fmt;

use chrono::{DateTime, FixedOffset};

use super::address::EmailAddress;

/// Key of the synthetic entry holding all `text/plain` parts.
pub const TEXT_KEY: &str = "text";

/// Key of the synthetic entry holding all `text/html` parts.
pub const HTML_KEY: &str = "html";

/// The structured value of one header (or synthetic body entry).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Address headers (`From`, `To`, `Cc`, …).
    Addresses(Vec<EmailAddress>),
    /// Date headers, keeping the sender's offset.
    Date(DateTime<FixedOffset>),
    /// Everything else, as the raw unfolded string.
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addresses(list) => {
                for (i, addr) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{addr}")?;
                }
                Ok(())
            }
            Self::Date(dt) => f.write_str(&dt.to_rfc2822()),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One RFC822 message broken into named fields, in document order.
///
/// Header names keep the spelling used in the message. Names differing only
/// in case are separate fields; a repeated header with the exact same name
/// keeps the position of its first occurrence and the value of its last one.
/// Lookups prefer an exact name and fall back to ignoring case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedEmail {
    fields: Vec<(String, FieldValue)>,
}

impl ParsedEmail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing the value of an existing field with the exact same name.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Look up a field by name, exact spelling first, then ignoring case.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.get_exact(name).or_else(|| {
            self.fields
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    fn get_exact(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// String form of a field, if present.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| v.to_string())
    }

    /// Concatenated `text/plain` parts.
    pub fn text(&self) -> &str {
        self.synthetic(TEXT_KEY)
    }

    /// Concatenated `text/html` parts.
    pub fn html(&self) -> &str {
        self.synthetic(HTML_KEY)
    }

    fn synthetic(&self, key: &str) -> &str {
        match self.get_exact(key) {
            Some(FieldValue::Text(s)) => s,
            _ => "",
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every value's string form, space-joined in field order.
    pub fn joined_text(&self) -> String {
        self.fields
            .iter()
            .map(|(_, v)| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
