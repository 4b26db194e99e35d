//! IMAP-over-TLS mail source.

use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, info};

use super::{MailSource, ProviderProfile};
use crate::error::{Result, ScanError};
use crate::model::record::Partition;

type Session = imap::Session<TlsStream<TcpStream>>;

/// A logged-in IMAP session addressed by UID.
pub struct ImapSource {
    profile: ProviderProfile,
    session: Session,
    selected: Option<String>,
}

impl ImapSource {
    /// Connect over TLS and log in.
    pub fn connect(profile: ProviderProfile, username: &str, password: &str) -> Result<Self> {
        let tls = TlsConnector::builder().build()?;
        let client = imap::connect((profile.host.as_str(), profile.port), &profile.host, &tls)?;
        let session = client
            .login(username, password)
            .map_err(|(source, _client)| ScanError::Auth {
                user: username.to_string(),
                source,
            })?;
        info!(host = %profile.host, user = username, "Logged in to IMAP server");
        Ok(Self {
            profile,
            session,
            selected: None,
        })
    }

    /// End the session politely.
    pub fn logout(mut self) -> Result<()> {
        self.session.logout()?;
        Ok(())
    }
}

impl MailSource for ImapSource {
    fn folder(&self, partition: Partition) -> &str {
        self.profile.folder(partition)
    }

    /// `UID SEARCH ALL`, returned in ascending UID order.
    fn list_identifiers(&mut self, folder: &str) -> Result<Vec<String>> {
        let mailbox = self.session.select(folder)?;
        self.selected = Some(folder.to_string());
        debug!(folder, exists = mailbox.exists, "Selected folder");

        let mut uids: Vec<u32> = self.session.uid_search("ALL")?.into_iter().collect();
        uids.sort_unstable();
        Ok(uids.into_iter().map(|uid| uid.to_string()).collect())
    }

    /// `UID FETCH <uid> RFC822` in the selected folder.
    fn fetch_body(&mut self, identifier: &str) -> Result<Vec<u8>> {
        let fetches = self.session.uid_fetch(identifier, "RFC822")?;
        fetches
            .iter()
            .find_map(|fetch| fetch.body())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ScanError::MessageNotFound {
                folder: self.selected.clone().unwrap_or_default(),
                identifier: identifier.to_string(),
            })
    }
}
