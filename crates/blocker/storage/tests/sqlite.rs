//! SQLite storage against a real database file.

use std::collections::BTreeSet;

use blocker_storage::{SetStore, SqliteStorage};

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_store_replaces_whole_set() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::open(&dir.path().join("blocklist.db")).unwrap();

    storage
        .store_set("prefs", "sites", &set(&["a.com", "b.com"]))
        .unwrap();
    storage.store_set("prefs", "sites", &set(&["c.com"])).unwrap();

    assert_eq!(storage.load_set("prefs", "sites").unwrap(), set(&["c.com"]));
}

#[test]
fn test_sets_do_not_leak_between_keys() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::open(&dir.path().join("blocklist.db")).unwrap();

    storage.store_set("prefs", "apps", &set(&["com.example.game"])).unwrap();
    storage.store_set("prefs", "sites", &set(&["example.com"])).unwrap();
    storage.clear_set("prefs", "apps").unwrap();

    assert!(storage.load_set("prefs", "apps").unwrap().is_empty());
    assert_eq!(storage.load_set("prefs", "sites").unwrap(), set(&["example.com"]));
}

#[test]
fn test_second_handle_sees_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("blocklist.db");

    let writer = SqliteStorage::open(&path).unwrap();
    let reader = SqliteStorage::open(&path).unwrap();

    writer.store_set("prefs", "apps", &set(&["com.example.game"])).unwrap();

    assert_eq!(
        reader.load_set("prefs", "apps").unwrap(),
        set(&["com.example.game"])
    );
}
