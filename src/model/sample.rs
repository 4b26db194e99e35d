//! Labeled training samples.

use std::fmt;
use std::str::FromStr;

/// Whether a received message generated a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// The user never answered this message.
    DidNotReply,
    /// One of the user's sent messages is a reply to this one.
    Replied,
}

impl Label {
    /// Every label, in class-index order.
    pub const ALL: [Label; 2] = [Label::DidNotReply, Label::Replied];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DidNotReply => "DidNotReply",
            Self::Replied => "Replied",
        }
    }

    /// Class index: labels sorted by name, so `DidNotReply` = 0, `Replied` = 1.
    pub fn index(self) -> usize {
        match self {
            Self::DidNotReply => 0,
            Self::Replied => 1,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Replied" => Ok(Self::Replied),
            "DidNotReply" => Ok(Self::DidNotReply),
            other => Err(format!("unknown label '{other}'")),
        }
    }
}

/// One `(label, text)` training example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSample {
    pub label: Label,
    pub text: String,
}

impl LabeledSample {
    pub fn new(label: Label, text: impl Into<String>) -> Self {
        Self {
            label,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_roundtrip_and_order() {
        for label in Label::ALL {
            assert_eq!(label.as_str().parse::<Label>(), Ok(label));
        }
        assert!("Maybe".parse::<Label>().is_err());
        assert!(Label::DidNotReply < Label::Replied);
        assert_eq!(Label::Replied.index(), 1);
    }
}
