//! Training datasets derived from the mail store.

pub mod replies;
pub mod textfile;

pub use replies::{build_dataset, build_reply_index, label_received, ReplyIndex, ReplyLabeler};
pub use textfile::{read_samples, scrub, write_dataset_file, write_samples, LabeledTextFile};
