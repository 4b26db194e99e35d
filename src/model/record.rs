//! Stored message records and the partitions that hold them.

use std::fmt;

/// One of the two mail collections kept in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Every message in the mailbox.
    All,
    /// Messages the user sent.
    Sent,
}

impl Partition {
    /// Synchronization order.
    pub const ALL: [Partition; 2] = [Partition::All, Partition::Sent];

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::All => "all_email",
            Self::Sent => "sent_email",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Sent => "sent",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A row of the store. `body` is `None` until the fetch pass reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub identifier: String,
    pub body: Option<String>,
}
