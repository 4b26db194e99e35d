//! Email parsing: header typing and decoding, MIME body extraction, whole-message parsing.

pub mod eml;
pub mod header;
pub mod mime;

pub use eml::parse_email;
