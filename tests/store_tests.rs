//! Integration tests for the SQLite mail store.

use mailscanner::model::record::{MessageRecord, Partition};
use mailscanner::store::{BodyWrite, MailStore};

fn temp_db() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mail.sqlite3");
    (dir, path)
}

#[test]
fn test_open_creates_missing_file_and_parent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("mail.sqlite3");
    let store = MailStore::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(store.count(Partition::All).unwrap(), 0);
    assert_eq!(store.count(Partition::Sent).unwrap(), 0);
}

#[test]
fn test_partitions_are_independent() {
    let store = MailStore::open_in_memory().unwrap();
    assert!(store.ensure_identifier(Partition::All, "7").unwrap());
    assert!(store.ensure_identifier(Partition::Sent, "7").unwrap());
    store.store_body(Partition::Sent, "7", b"sent body").unwrap();

    assert_eq!(store.record(Partition::All, "7").unwrap().unwrap().body, None);
    assert_eq!(
        store.record(Partition::Sent, "7").unwrap().unwrap().body.as_deref(),
        Some("sent body")
    );
}

#[test]
fn test_discovery_is_idempotent_across_reopen() {
    let (_dir, path) = temp_db();
    {
        let store = MailStore::open(&path).unwrap();
        let new = store
            .ensure_identifiers(Partition::All, ["1", "2", "3"], None)
            .unwrap();
        assert_eq!(new, 3);
    }
    let store = MailStore::open(&path).unwrap();
    let new = store
        .ensure_identifiers(Partition::All, ["2", "3", "4"], None)
        .unwrap();
    assert_eq!(new, 1);
    assert_eq!(store.count(Partition::All).unwrap(), 4);
}

#[test]
fn test_body_written_at_most_once() {
    let (_dir, path) = temp_db();
    {
        let store = MailStore::open(&path).unwrap();
        store.ensure_identifier(Partition::All, "42").unwrap();
        assert_eq!(
            store.store_body(Partition::All, "42", b"first").unwrap(),
            BodyWrite::Stored
        );
    }

    let store = MailStore::open(&path).unwrap();
    assert!(!store.ensure_identifier(Partition::All, "42").unwrap());
    assert_eq!(
        store.store_body(Partition::All, "42", b"second").unwrap(),
        BodyWrite::AlreadyPresent
    );
    assert_eq!(
        store.records(Partition::All).unwrap(),
        vec![MessageRecord {
            identifier: "42".to_string(),
            body: Some("first".to_string()),
        }]
    );
}

#[test]
fn test_pending_and_bodies_keep_storage_order() {
    let store = MailStore::open_in_memory().unwrap().with_page_size(2);
    store
        .ensure_identifiers(Partition::All, ["30", "10", "20", "50", "40"], None)
        .unwrap();
    store.store_body(Partition::All, "10", b"ten").unwrap();
    store.store_body(Partition::All, "50", b"fifty").unwrap();

    let pending: Vec<String> = store
        .pending_identifiers(Partition::All)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(pending, vec!["30", "20", "40"]);

    let bodies: Vec<String> = store
        .bodies(Partition::All)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(bodies, vec!["ten", "fifty"]);
}

#[test]
fn test_counts() {
    let store = MailStore::open_in_memory().unwrap();
    store
        .ensure_identifiers(Partition::Sent, ["1", "2", "3"], None)
        .unwrap();
    store.store_body(Partition::Sent, "1", b"hello").unwrap();
    store.store_body(Partition::Sent, "2", &[0xff, 0xfe]).unwrap();

    let counts = store.counts(Partition::Sent).unwrap();
    assert_eq!(counts.total, 3);
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.empty, 1);
    assert_eq!(counts.fetched(), 2);
}

#[test]
fn test_file_size_grows() {
    let (_dir, path) = temp_db();
    let store = MailStore::open(&path).unwrap();
    store.ensure_identifier(Partition::All, "1").unwrap();
    assert!(store.file_size() > 0);
    assert_eq!(MailStore::open_in_memory().unwrap().file_size(), 0);
}

#[test]
fn test_stats_cover_both_partitions() {
    let (_dir, path) = temp_db();
    let store = MailStore::open(&path).unwrap();
    store
        .ensure_identifiers(Partition::All, ["1", "2"], None)
        .unwrap();
    store.ensure_identifier(Partition::Sent, "1").unwrap();
    store.store_body(Partition::All, "1", b"body").unwrap();

    let stats = store.stats().unwrap();
    assert_eq!(stats.all.total, 2);
    assert_eq!(stats.all.fetched(), 1);
    assert_eq!(stats.partition(Partition::Sent).pending, 1);
    assert_eq!(stats.file_size, store.file_size());
}
