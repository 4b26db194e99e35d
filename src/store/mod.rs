//! Durable identifier/body storage for the two mail partitions.

pub mod database;

pub use database::{BodyWrite, MailStore, PartitionCounts, RowCursor, StoreStats};
