//! Tab-delimited labeled text files.
//!
//! One sample per line, UTF-8:
//!
//! ```text
//! Replied<TAB>text of an email that got a reply
//! DidNotReply<TAB>text of an email that did not
//! ```
//!
//! Tabs, carriage returns and newlines inside the text are each replaced by
//! one space on write, so a line is always exactly one sample.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, ScanError};
use crate::model::sample::{Label, LabeledSample};

/// Replace every tab, carriage return and newline with a space.
pub fn scrub(text: &str) -> String {
    text.replace(['\t', '\r', '\n'], " ")
}

/// Write samples as `label<TAB>scrubbed-text` lines.
pub fn write_samples<W: Write>(samples: &[LabeledSample], mut writer: W) -> std::io::Result<()> {
    for sample in samples {
        writeln!(writer, "{}\t{}", sample.label, scrub(&sample.text))?;
    }
    writer.flush()
}

/// Write samples to a file, replacing it.
pub fn write_dataset_file(path: &Path, samples: &[LabeledSample]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ScanError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| ScanError::io(path, e))?;
    write_samples(samples, BufWriter::new(file)).map_err(|e| ScanError::io(path, e))
}

/// Read `label<TAB>text` lines. The text is trimmed; blank lines are skipped.
pub fn read_samples<R: BufRead>(reader: R) -> Result<Vec<LabeledSample>> {
    let mut samples = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (label, text) = line.split_once('\t').ok_or_else(|| ScanError::InvalidDataset {
            line: i + 1,
            reason: "missing tab separator".to_string(),
        })?;
        let label = label
            .parse::<Label>()
            .map_err(|reason| ScanError::InvalidDataset { line: i + 1, reason })?;
        samples.push(LabeledSample::new(label, text.trim()));
    }
    Ok(samples)
}

/// A labeled text dataset loaded in memory, with its labels encoded for training.
#[derive(Debug, Clone, Default)]
pub struct LabeledTextFile {
    samples: Vec<LabeledSample>,
}

impl LabeledTextFile {
    /// Load a dataset written by [`write_dataset_file`].
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ScanError::io(path, e))?;
        let samples = read_samples(BufReader::new(file))?;
        Ok(Self { samples })
    }

    pub fn from_samples(samples: Vec<LabeledSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Texts, aligned with [`labels`](Self::labels).
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(|s| s.text.as_str())
    }

    /// Class index of each sample (`DidNotReply` = 0, `Replied` = 1).
    pub fn labels(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.label.index()).collect()
    }

    /// One-hot row per sample, one column per class.
    pub fn one_hot_labels(&self) -> Vec<[f32; 2]> {
        self.samples
            .iter()
            .map(|s| {
                let mut row = [0.0; 2];
                row[s.label.index()] = 1.0;
                row
            })
            .collect()
    }

    /// Number of samples per label (labels with no sample report 0).
    pub fn class_counts(&self) -> BTreeMap<Label, usize> {
        let mut counts: BTreeMap<Label, usize> = Label::ALL.iter().map(|&l| (l, 0)).collect();
        for sample in &self.samples {
            *counts.entry(sample.label).or_default() += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_replaces_each_char() {
        assert_eq!(scrub("a\tb\r\nc"), "a b  c");
        assert_eq!(scrub("plain"), "plain");
    }

    #[test]
    fn test_read_rejects_bad_lines() {
        let err = read_samples("Replied\tok\nno tab here\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ScanError::InvalidDataset { line: 2, .. }));

        let err = read_samples("Perhaps\ttext\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ScanError::InvalidDataset { line: 1, .. }));
    }

    #[test]
    fn test_label_encoding() {
        let file = LabeledTextFile::from_samples(vec![
            LabeledSample::new(Label::Replied, "a"),
            LabeledSample::new(Label::DidNotReply, "b"),
            LabeledSample::new(Label::Replied, "c"),
        ]);
        assert_eq!(file.labels(), vec![1, 0, 1]);
        assert_eq!(file.one_hot_labels()[1], [1.0, 0.0]);
        assert_eq!(file.class_counts()[&Label::Replied], 2);
        assert_eq!(file.class_counts()[&Label::DidNotReply], 1);
        assert_eq!(file.texts().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
