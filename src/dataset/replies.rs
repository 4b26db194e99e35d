//! The "did I reply?" dataset.
//!
//! Every sent message carrying `In-Reply-To` marks the message it answers.
//! The match is on the whole trimmed header value: `<a> (comment)` and `<a>`
//! are different keys, and a list of identifiers is one key.
//! Received messages are then walked in store order: a marked message yields
//! a `Replied` sample, and an unmarked one yields a `DidNotReply` sample only
//! when it would pair up with the sample just before it, i.e. when the number
//! of samples emitted so far is odd. Unmarked messages arriving at an even
//! count are dropped.
//!
//! This keeps the two classes close to 1:1 without a second pass. It can end
//! on an unpaired `Replied` sample and it drops a negative that follows two
//! consecutive positives; both are part of the dataset's statistics.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::Result;
use crate::model::message::ParsedEmail;
use crate::model::record::Partition;
use crate::model::sample::{Label, LabeledSample};
use crate::parser::parse_email;
use crate::store::MailStore;

/// Set of message identifiers the user has replied to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyIndex {
    replied_to: HashSet<String>,
}

impl ReplyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the message a sent email answers, if it answers one.
    ///
    /// Returns `true` if the email carried a non-empty `In-Reply-To`.
    pub fn record_sent(&mut self, sent: &ParsedEmail) -> bool {
        match header_key(sent, "In-Reply-To") {
            Some(id) => {
                self.replied_to.insert(id);
                true
            }
            None => false,
        }
    }

    /// Whether a received email generated a reply.
    pub fn was_replied(&self, received: &ParsedEmail) -> bool {
        header_key(received, "Message-ID").is_some_and(|id| self.replied_to.contains(&id))
    }

    pub fn len(&self) -> usize {
        self.replied_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replied_to.is_empty()
    }
}

/// Trimmed value of a header, if present and non-empty.
fn header_key(email: &ParsedEmail, name: &str) -> Option<String> {
    let value = email.get_str(name)?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Streaming labeler applying the parity rule to received emails.
#[derive(Debug)]
pub struct ReplyLabeler<'a> {
    index: &'a ReplyIndex,
    emitted: usize,
}

impl<'a> ReplyLabeler<'a> {
    pub fn new(index: &'a ReplyIndex) -> Self {
        Self { index, emitted: 0 }
    }

    /// Label the next received email, or drop it.
    pub fn offer(&mut self, received: &ParsedEmail) -> Option<LabeledSample> {
        let label = if self.index.was_replied(received) {
            Label::Replied
        } else if self.emitted % 2 == 1 {
            Label::DidNotReply
        } else {
            return None;
        };
        self.emitted += 1;
        Some(LabeledSample::new(label, received.joined_text()))
    }

    /// Samples emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

/// Label a sequence of received emails against a reply index.
pub fn label_received<'e, I>(index: &ReplyIndex, received: I) -> Vec<LabeledSample>
where
    I: IntoIterator<Item = &'e ParsedEmail>,
{
    let mut labeler = ReplyLabeler::new(index);
    received
        .into_iter()
        .filter_map(|email| labeler.offer(email))
        .collect()
}

/// Build the reply index from every sent body in the store.
pub fn build_reply_index(store: &MailStore) -> Result<ReplyIndex> {
    let mut index = ReplyIndex::new();
    let mut visited: u64 = 0;
    store.visit(Partition::Sent, |body| {
        index.record_sent(&parse_email(body));
        visited += 1;
        Ok(())
    })?;
    info!(sent = visited, replied_to = index.len(), "Built reply index");
    Ok(index)
}

/// Build the labeled dataset from a fully synchronized store.
///
/// `progress` receives the number of received messages examined so far and
/// the partition total.
pub fn build_dataset(
    store: &MailStore,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<Vec<LabeledSample>> {
    let index = build_reply_index(store)?;
    let total = store.count(Partition::All)?;

    let mut labeler = ReplyLabeler::new(&index);
    let mut samples = Vec::new();
    let mut examined: u64 = 0;

    for body in store.bodies(Partition::All) {
        let email = parse_email(&body?);
        if let Some(sample) = labeler.offer(&email) {
            samples.push(sample);
        }
        examined += 1;
        if let Some(report) = progress {
            report(examined, total);
        }
    }

    let replied = samples.iter().filter(|s| s.label == Label::Replied).count();
    debug!(examined, "Walked received messages");
    info!(
        samples = samples.len(),
        replied,
        did_not_reply = samples.len() - replied,
        "Built replies dataset"
    );
    Ok(samples)
}
