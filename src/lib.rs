//! `mailscanner`: download a mailbox over IMAP and learn which emails get replies.
//!
//! This crate provides the core library: a resumable two-pass synchronizer
//! that mirrors a remote mailbox into SQLite, an RFC822 parser producing
//! ordered header/value mappings, and the builder for the balanced
//! "replied / did not reply" text dataset.

pub mod config;
pub mod dataset;
pub mod error;
pub mod model;
pub mod parser;
pub mod source;
pub mod store;
pub mod sync;
