//! Core data model types: stored records, parsed emails, addresses, labeled samples.

pub mod address;
pub mod message;
pub mod record;
pub mod sample;
