//! Remote mail sources: the capability the synchronizer drives, and provider profiles.

pub mod imap;

use crate::error::Result;
use crate::model::record::Partition;

pub use self::imap::ImapSource;

/// A remote mailbox that can list message identifiers per folder and fetch
/// one raw message by identifier.
///
/// `fetch_body` addresses the folder most recently passed to
/// `list_identifiers`. Errors are returned as-is; callers do not retry.
pub trait MailSource {
    /// Remote folder name backing a partition.
    fn folder(&self, partition: Partition) -> &str;

    /// Every identifier currently in `folder`.
    fn list_identifiers(&mut self, folder: &str) -> Result<Vec<String>>;

    /// The raw RFC822 bytes of one message.
    fn fetch_body(&mut self, identifier: &str) -> Result<Vec<u8>>;
}

/// Where a provider lives and what it calls its folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub host: String,
    pub port: u16,
    /// Folder holding every message of the account.
    pub all_folder: String,
    /// Folder holding the messages the account sent.
    pub sent_folder: String,
}

impl ProviderProfile {
    /// Gmail over IMAPS. Needs an app password or "less secure apps" access.
    pub fn gmail() -> Self {
        Self {
            host: "imap.gmail.com".to_string(),
            port: 993,
            all_folder: "[Gmail]/All Mail".to_string(),
            sent_folder: "[Gmail]/Sent Mail".to_string(),
        }
    }

    /// Remote folder for a partition.
    pub fn folder(&self, partition: Partition) -> &str {
        match partition {
            Partition::All => &self.all_folder,
            Partition::Sent => &self.sent_folder,
        }
    }
}
