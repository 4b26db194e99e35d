//! Two-pass incremental synchronization of a remote mailbox into the store.
//!
//! Per partition:
//! 1. **Discovery**: list every remote identifier and record the unknown ones.
//! 2. **Fetch**: download the body of every identifier that still lacks one.
//!
//! Both passes are safe to re-run. A run that dies part way leaves the store
//! consistent, and the next run picks up the remaining identifiers.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::Result;
use crate::model::record::Partition;
use crate::source::MailSource;
use crate::store::{BodyWrite, MailStore};

/// Which half of the algorithm a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Discovery,
    Fetch,
}

impl Pass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discover",
            Self::Fetch => "fetch",
        }
    }
}

/// Progress of one pass: `current` of `total` identifiers processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    pub partition: Partition,
    pub pass: Pass,
    pub current: u64,
    pub total: u64,
}

/// What a synchronization run did to one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PartitionReport {
    /// Identifiers the remote listed.
    pub listed: u64,
    /// Listed identifiers that were not in the store yet.
    pub discovered: u64,
    /// Bodies downloaded and stored.
    pub fetched: u64,
    /// Downloaded bodies that were not UTF-8 and were stored empty.
    pub substituted: u64,
}

/// Totals of a full run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncReport {
    pub all: PartitionReport,
    pub sent: PartitionReport,
}

impl SyncReport {
    pub fn partition(&self, partition: Partition) -> &PartitionReport {
        match partition {
            Partition::All => &self.all,
            Partition::Sent => &self.sent,
        }
    }

    fn partition_mut(&mut self, partition: Partition) -> &mut PartitionReport {
        match partition {
            Partition::All => &mut self.all,
            Partition::Sent => &mut self.sent,
        }
    }
}

/// Synchronize both partitions, `all` first, then `sent`.
///
/// The first remote or storage error ends the run and is returned unchanged.
pub fn sync_all<S: MailSource + ?Sized>(
    source: &mut S,
    store: &MailStore,
    progress: Option<&dyn Fn(&SyncProgress)>,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    for partition in Partition::ALL {
        *report.partition_mut(partition) = sync_partition(source, store, partition, progress)?;
    }
    Ok(report)
}

/// Run discovery then fetch for one partition.
pub fn sync_partition<S: MailSource + ?Sized>(
    source: &mut S,
    store: &MailStore,
    partition: Partition,
    progress: Option<&dyn Fn(&SyncProgress)>,
) -> Result<PartitionReport> {
    let start = Instant::now();
    let (listed, discovered) = discover(source, store, partition, progress)?;
    let (fetched, substituted) = fetch_pending(source, store, partition, progress)?;

    let report = PartitionReport {
        listed,
        discovered,
        fetched,
        substituted,
    };
    info!(
        partition = %partition,
        listed,
        discovered,
        fetched,
        substituted,
        elapsed = ?start.elapsed(),
        "Partition synchronized"
    );
    Ok(report)
}

/// Discovery pass: one remote listing, then an idempotent insert per identifier.
///
/// Returns `(listed, newly_recorded)`.
pub fn discover<S: MailSource + ?Sized>(
    source: &mut S,
    store: &MailStore,
    partition: Partition,
    progress: Option<&dyn Fn(&SyncProgress)>,
) -> Result<(u64, u64)> {
    let folder = source.folder(partition).to_string();
    let identifiers = source.list_identifiers(&folder)?;
    let total = identifiers.len() as u64;
    debug!(partition = %partition, folder = %folder, total, "Listed remote identifiers");

    let report = |current: u64| {
        if let Some(cb) = progress {
            cb(&SyncProgress {
                partition,
                pass: Pass::Discovery,
                current,
                total,
            });
        }
    };
    report(0);
    let discovered = store.ensure_identifiers(partition, &identifiers, Some(&report))?;

    Ok((total, discovered))
}

/// Fetch pass: download and store each body still missing, one at a time.
///
/// Returns `(fetched, substituted)`. Undecodable bodies are stored empty and
/// counted in `substituted`; every other failure ends the pass.
pub fn fetch_pending<S: MailSource + ?Sized>(
    source: &mut S,
    store: &MailStore,
    partition: Partition,
    progress: Option<&dyn Fn(&SyncProgress)>,
) -> Result<(u64, u64)> {
    let total = store.pending_count(partition)?;
    let mut fetched: u64 = 0;
    let mut substituted: u64 = 0;

    let report = |current: u64| {
        if let Some(cb) = progress {
            cb(&SyncProgress {
                partition,
                pass: Pass::Fetch,
                current,
                total,
            });
        }
    };
    report(0);

    for identifier in store.pending_identifiers(partition) {
        let identifier = identifier?;
        let raw = source.fetch_body(&identifier)?;
        match store.store_body(partition, &identifier, &raw)? {
            BodyWrite::Stored => fetched += 1,
            BodyWrite::Substituted => {
                fetched += 1;
                substituted += 1;
            }
            BodyWrite::AlreadyPresent => {}
        }
        report(fetched);
    }

    Ok((fetched, substituted))
}
