//! SQLite store of message identifiers and raw bodies.
//!
//! ```text
//! all_email(id TEXT, body TEXT)   unique index all_email_id
//! sent_email(id TEXT, body TEXT)  unique index sent_email_id
//! ```
//!
//! A row is created with a NULL body by discovery and gets its body exactly
//! once from the fetch pass. Rows are read back in rowid (insertion) order.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Result, ScanError};
use crate::model::record::{MessageRecord, Partition};

/// Rows fetched per query by the lazy iterators.
const DEFAULT_PAGE_SIZE: usize = 500;

/// Identifiers inserted per transaction by [`MailStore::ensure_identifiers`].
const DEFAULT_BATCH_SIZE: usize = 1000;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS all_email(id TEXT, body TEXT);
    CREATE UNIQUE INDEX IF NOT EXISTS all_email_id ON all_email(id);
    CREATE TABLE IF NOT EXISTS sent_email(id TEXT, body TEXT);
    CREATE UNIQUE INDEX IF NOT EXISTS sent_email_id ON sent_email(id);
";

/// What [`MailStore::store_body`] did with a fetched body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyWrite {
    /// The body was valid UTF-8 and is now stored.
    Stored,
    /// The body was not valid UTF-8; the empty string was stored instead.
    Substituted,
    /// The row already had a body; nothing changed.
    AlreadyPresent,
}

/// Row counts of one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PartitionCounts {
    pub total: u64,
    pub pending: u64,
    /// Fetched rows whose body is the empty string.
    pub empty: u64,
}

impl PartitionCounts {
    pub fn fetched(&self) -> u64 {
        self.total - self.pending
    }
}

/// Whole-store summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub all: PartitionCounts,
    pub sent: PartitionCounts,
    pub file_size: u64,
}

impl StoreStats {
    pub fn partition(&self, partition: Partition) -> &PartitionCounts {
        match partition {
            Partition::All => &self.all,
            Partition::Sent => &self.sent,
        }
    }
}

/// Single-connection handle on the mail database.
///
/// All access goes through one `Connection`, so writes are serialized.
pub struct MailStore {
    path: PathBuf,
    conn: Connection,
    page_size: usize,
    batch_size: usize,
}

impl MailStore {
    /// Open (or create) a mail database at the given path.
    ///
    /// Missing tables and indexes are created; existing rows are untouched.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ScanError::io(parent, e))?;
        }
        let conn = Connection::open(&path)?;
        let store = Self::with_connection(path, conn)?;
        info!(path = %store.path.display(), "Mail database opened");
        Ok(store)
    }

    /// Open a throwaway in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(PathBuf::from(":memory:"), Connection::open_in_memory()?)
    }

    fn with_connection(path: PathBuf, conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            path,
            conn,
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Override how many rows the iterators read per query.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Override how many identifiers are committed per discovery transaction.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an identifier with no body yet. Returns `false` if it was already known.
    pub fn ensure_identifier(&self, partition: Partition, identifier: &str) -> Result<bool> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (id, body) VALUES (?1, NULL)",
            partition.table()
        );
        let inserted = self.conn.execute(&sql, params![identifier])?;
        Ok(inserted > 0)
    }

    /// Record many identifiers, committing every `batch_size` rows.
    ///
    /// Returns how many were new.
    pub fn ensure_identifiers<I, S>(
        &self,
        partition: Partition,
        identifiers: I,
        progress: Option<&dyn Fn(u64)>,
    ) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (id, body) VALUES (?1, NULL)",
            partition.table()
        );
        let mut inserted: u64 = 0;
        let mut seen: u64 = 0;
        let mut tx = self.conn.unchecked_transaction()?;

        for identifier in identifiers {
            inserted += tx.execute(&sql, params![identifier.as_ref()])? as u64;
            seen += 1;
            if seen % self.batch_size as u64 == 0 {
                tx.commit()?;
                debug!(table = partition.table(), seen, "Committed identifier batch");
                tx = self.conn.unchecked_transaction()?;
            }
            if let Some(report) = progress {
                report(seen);
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    /// Lazily list identifiers whose body has not been fetched, in storage order.
    ///
    /// The sequence reads one page at a time and resumes after the last rowid
    /// it returned, so bodies can be stored while it is being consumed.
    pub fn pending_identifiers(&self, partition: Partition) -> RowCursor<'_> {
        RowCursor::new(
            self,
            format!(
                "SELECT rowid, id FROM {} WHERE body IS NULL AND rowid > ?1 ORDER BY rowid LIMIT ?2",
                partition.table()
            ),
        )
    }

    /// Lazily list every fetched body, in storage order.
    pub fn bodies(&self, partition: Partition) -> RowCursor<'_> {
        RowCursor::new(
            self,
            format!(
                "SELECT rowid, body FROM {} WHERE body IS NOT NULL AND rowid > ?1 ORDER BY rowid LIMIT ?2",
                partition.table()
            ),
        )
    }

    /// Apply `visitor` to every fetched body, in storage order.
    ///
    /// Stops at the first error, whether from the store or the visitor.
    pub fn visit<F>(&self, partition: Partition, mut visitor: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<()>,
    {
        for body in self.bodies(partition) {
            visitor(&body?)?;
        }
        Ok(())
    }

    /// Set the body of a known identifier, once.
    ///
    /// Bytes that are not valid UTF-8 are replaced by the empty string; that
    /// is reported as [`BodyWrite::Substituted`], never as an error.
    pub fn store_body(&self, partition: Partition, identifier: &str, raw: &[u8]) -> Result<BodyWrite> {
        let (body, outcome) = match std::str::from_utf8(raw) {
            Ok(text) => (text, BodyWrite::Stored),
            Err(e) => {
                warn!(
                    table = partition.table(),
                    id = identifier,
                    error = %e,
                    "Body is not valid UTF-8, storing empty body"
                );
                ("", BodyWrite::Substituted)
            }
        };

        let sql = format!(
            "UPDATE {} SET body = ?1 WHERE id = ?2 AND body IS NULL",
            partition.table()
        );
        if self.conn.execute(&sql, params![body, identifier])? > 0 {
            return Ok(outcome);
        }

        match self.record(partition, identifier)? {
            Some(_) => Ok(BodyWrite::AlreadyPresent),
            None => Err(ScanError::UnknownIdentifier {
                table: partition.table(),
                identifier: identifier.to_string(),
            }),
        }
    }

    /// Look up one row.
    pub fn record(&self, partition: Partition, identifier: &str) -> Result<Option<MessageRecord>> {
        let sql = format!("SELECT id, body FROM {} WHERE id = ?1", partition.table());
        let record = self
            .conn
            .query_row(&sql, params![identifier], |row| {
                Ok(MessageRecord {
                    identifier: row.get(0)?,
                    body: row.get(1)?,
                })
            })
            .optional()?;
        Ok(record)
    }

    /// Every row of a partition, in storage order.
    pub fn records(&self, partition: Partition) -> Result<Vec<MessageRecord>> {
        let sql = format!("SELECT id, body FROM {} ORDER BY rowid", partition.table());
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(MessageRecord {
                identifier: row.get(0)?,
                body: row.get(1)?,
            })
        })?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Number of rows in a partition.
    pub fn count(&self, partition: Partition) -> Result<u64> {
        self.count_where(partition, "1")
    }

    /// Number of rows still waiting for their body.
    pub fn pending_count(&self, partition: Partition) -> Result<u64> {
        self.count_where(partition, "body IS NULL")
    }

    /// Totals for one partition.
    pub fn counts(&self, partition: Partition) -> Result<PartitionCounts> {
        Ok(PartitionCounts {
            total: self.count(partition)?,
            pending: self.pending_count(partition)?,
            empty: self.count_where(partition, "body = ''")?,
        })
    }

    /// Counts of both partitions plus the file size.
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            all: self.counts(Partition::All)?,
            sent: self.counts(Partition::Sent)?,
            file_size: self.file_size(),
        })
    }

    fn count_where(&self, partition: Partition, condition: &str) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {condition}",
            partition.table()
        );
        let n: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Size of the database file in bytes (0 for in-memory stores).
    pub fn file_size(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// Read one page of `(rowid, text)` pairs after `after_rowid`.
    fn page(&self, sql: &str, after_rowid: i64) -> Result<Vec<(i64, String)>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![after_rowid, self.page_size as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        let page = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(page)
    }
}

/// Lazy, finite, re-queryable sequence over one column of a partition.
///
/// Produced by [`MailStore::pending_identifiers`] and [`MailStore::bodies`].
/// Each item is one row's value; a storage error is yielded once and ends the
/// sequence.
pub struct RowCursor<'a> {
    store: &'a MailStore,
    sql: String,
    last_rowid: i64,
    buffer: VecDeque<String>,
    exhausted: bool,
}

impl<'a> RowCursor<'a> {
    fn new(store: &'a MailStore, sql: String) -> Self {
        Self {
            store,
            sql,
            last_rowid: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn refill(&mut self) -> Result<()> {
        let page = self.store.page(&self.sql, self.last_rowid)?;
        if page.len() < self.store.page_size {
            self.exhausted = true;
        }
        if let Some((rowid, _)) = page.last() {
            self.last_rowid = *rowid;
        }
        self.buffer.extend(page.into_iter().map(|(_, value)| value));
        Ok(())
    }
}

impl Iterator for RowCursor<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.refill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_identifier_is_idempotent() {
        let store = MailStore::open_in_memory().unwrap();
        assert!(store.ensure_identifier(Partition::All, "1").unwrap());
        assert!(!store.ensure_identifier(Partition::All, "1").unwrap());
        assert_eq!(store.count(Partition::All).unwrap(), 1);
        // Partitions are independent
        assert!(store.ensure_identifier(Partition::Sent, "1").unwrap());
    }

    #[test]
    fn test_batches_commit_across_boundaries() {
        let store = MailStore::open_in_memory().unwrap().with_batch_size(2);
        let ids = ["1", "2", "3", "2", "5"];
        let added = store.ensure_identifiers(Partition::All, ids, None).unwrap();
        assert_eq!(added, 4);
        assert_eq!(store.pending_count(Partition::All).unwrap(), 4);
    }

    #[test]
    fn test_pending_pages_while_writing() {
        let store = MailStore::open_in_memory().unwrap().with_page_size(2);
        for i in 0..5 {
            store.ensure_identifier(Partition::All, &i.to_string()).unwrap();
        }

        let mut seen = Vec::new();
        for id in store.pending_identifiers(Partition::All) {
            let id = id.unwrap();
            store.store_body(Partition::All, &id, b"Subject: x\n\nbody").unwrap();
            seen.push(id);
        }
        assert_eq!(seen, vec!["0", "1", "2", "3", "4"]);
        assert_eq!(store.pending_identifiers(Partition::All).count(), 0);
        assert_eq!(store.bodies(Partition::All).count(), 5);
    }

    #[test]
    fn test_store_body_outcomes() {
        let store = MailStore::open_in_memory().unwrap();
        store.ensure_identifier(Partition::Sent, "a").unwrap();
        store.ensure_identifier(Partition::Sent, "b").unwrap();

        assert_eq!(
            store.store_body(Partition::Sent, "a", b"hello").unwrap(),
            BodyWrite::Stored
        );
        assert_eq!(
            store.store_body(Partition::Sent, "a", b"changed").unwrap(),
            BodyWrite::AlreadyPresent
        );
        assert_eq!(
            store.store_body(Partition::Sent, "b", &[0xff, 0xfe, 0x00]).unwrap(),
            BodyWrite::Substituted
        );

        let a = store.record(Partition::Sent, "a").unwrap().unwrap();
        assert_eq!(a.body.as_deref(), Some("hello"));
        let b = store.record(Partition::Sent, "b").unwrap().unwrap();
        assert_eq!(b.body.as_deref(), Some(""));

        let counts = store.counts(Partition::Sent).unwrap();
        assert_eq!(counts, PartitionCounts { total: 2, pending: 0, empty: 1 });
        assert_eq!(counts.fetched(), 2);
    }

    #[test]
    fn test_store_body_unknown_identifier() {
        let store = MailStore::open_in_memory().unwrap();
        let err = store.store_body(Partition::All, "ghost", b"x").unwrap_err();
        assert!(matches!(err, ScanError::UnknownIdentifier { .. }));
    }

    #[test]
    fn test_visit_stops_on_visitor_error() {
        let store = MailStore::open_in_memory().unwrap();
        for id in ["1", "2", "3"] {
            store.ensure_identifier(Partition::All, id).unwrap();
            store.store_body(Partition::All, id, id.as_bytes()).unwrap();
        }
        let mut visited = Vec::new();
        let result = store.visit(Partition::All, |body| {
            visited.push(body.to_string());
            if body == "2" {
                return Err(ScanError::InvalidDataset {
                    line: 2,
                    reason: "stop".into(),
                });
            }
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(visited, vec!["1", "2"]);
    }
}
