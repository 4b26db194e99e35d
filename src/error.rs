//! Centralized error types for mailscanner.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailscanner library.
///
/// Transport and storage failures are fatal to the run that hit them; the
/// store is left in whatever state it reached and the next run resumes.
#[derive(Error, Debug)]
pub enum ScanError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The local SQLite store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// IMAP protocol or network failure.
    #[error("IMAP error: {0}")]
    Imap(#[from] imap::Error),

    /// The IMAP server rejected the credentials.
    #[error("IMAP login failed for '{user}': {source}")]
    Auth { user: String, source: imap::Error },

    /// The TLS connector could not be built.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// The remote source returned no body for a listed identifier.
    #[error("Message '{identifier}' not found in folder '{folder}'")]
    MessageNotFound { folder: String, identifier: String },

    /// A body was stored for an identifier that discovery never recorded.
    #[error("Unknown identifier '{identifier}' in {table}")]
    UnknownIdentifier {
        table: &'static str,
        identifier: String,
    },

    /// A line of a labeled text dataset could not be read.
    #[error("Invalid dataset line {line}: {reason}")]
    InvalidDataset { line: usize, reason: String },
}

/// Convenience alias for `Result<T, ScanError>`.
pub type Result<T> = std::result::Result<T, ScanError>;

impl ScanError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `ScanError`
/// when no path context is available (rare, prefer `ScanError::io`).
impl From<std::io::Error> for ScanError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
