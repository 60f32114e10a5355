use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::tempdir;
use uuid::Uuid;

use diary_core::error::DiaryError;
use diary_core::record::{NewRecord, Severity};
use diary_core::storage::{RecordStore, SqliteStore};

fn append_event(store: &SqliteStore, device_id: Uuid, notes: &str) {
    let date = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
    store
        .append(
            NewRecord::event(date, device_id)
                .with_start(Utc.with_ymd_and_hms(2024, 5, 20, 7, 0, 0).unwrap(), None)
                .with_end(Utc.with_ymd_and_hms(2024, 5, 20, 7, 15, 0).unwrap(), None)
                .with_severity(Severity::Trickling)
                .with_notes(notes),
        )
        .expect("append should succeed");
}

#[test]
fn test_fresh_ledger_verifies_at_any_length() {
    let store = SqliteStore::open_in_memory().unwrap();
    let device_id = Uuid::new_v4();

    assert!(store.verify_chain().unwrap(), "empty ledger");
    for i in 0..20 {
        append_event(&store, device_id, &format!("entry {}", i));
        assert!(store.verify_chain().unwrap());
    }
}

#[test]
fn test_markers_and_corrections_verify() {
    let store = SqliteStore::open_in_memory().unwrap();
    let device_id = Uuid::new_v4();
    let date = NaiveDate::from_ymd_opt(2024, 5, 21).unwrap();

    let event = store
        .append(NewRecord::event(date, device_id))
        .unwrap();
    store
        .append(NewRecord::no_event(date, device_id))
        .unwrap();
    store
        .append(NewRecord::unknown(date, device_id))
        .unwrap();
    store
        .append(
            NewRecord::event(date, device_id)
                .with_parent(event.id)
                .retracting("entered on wrong day"),
        )
        .unwrap();

    assert!(store.verify_chain().unwrap());
}

#[test]
fn test_out_of_band_edit_breaks_chain() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("diary.db");
    let device_id = Uuid::new_v4();

    let store = SqliteStore::open(&path).unwrap();
    append_event(&store, device_id, "original note");
    append_event(&store, device_id, "second entry");
    assert!(store.verify_chain().unwrap());

    // Tamper behind the store's back, as corruption or an attacker would.
    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute(
        "UPDATE records SET notes = 'edited note' WHERE notes = 'original note'",
        [],
    )
    .unwrap();
    drop(raw);

    assert!(!store.verify_chain().unwrap());
}

#[test]
fn test_failed_verification_blocks_further_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("diary.db");
    let device_id = Uuid::new_v4();

    let store = SqliteStore::open(&path).unwrap();
    append_event(&store, device_id, "before tamper");

    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute("UPDATE records SET is_deleted = 1", []).unwrap();
    drop(raw);

    assert!(!store.verify_chain().unwrap());

    // Appending on top of a broken chain compounds an unverifiable
    // history, so both insertion paths must refuse.
    let date = NaiveDate::from_ymd_opt(2024, 5, 22).unwrap();
    let result = store.append(NewRecord::event(date, device_id));
    assert!(matches!(result, Err(DiaryError::Integrity(_))));

    let orphan = store.records_on(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()).unwrap();
    let result = store.insert_if_absent(&orphan[0]);
    assert!(matches!(result, Err(DiaryError::Integrity(_))));
}

#[test]
fn test_erase_all_clears_poisoned_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("diary.db");
    let device_id = Uuid::new_v4();

    let store = SqliteStore::open(&path).unwrap();
    append_event(&store, device_id, "doomed entry");

    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute("UPDATE records SET severity = 5", []).unwrap();
    drop(raw);

    assert!(!store.verify_chain().unwrap());

    store.erase_all().unwrap();
    assert!(store.verify_chain().unwrap());
    append_event(&store, device_id, "fresh start");
    assert!(store.verify_chain().unwrap());
}

#[test]
fn test_reordering_rows_breaks_chain() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("diary.db");
    let device_id = Uuid::new_v4();

    let store = SqliteStore::open(&path).unwrap();
    append_event(&store, device_id, "first");
    append_event(&store, device_id, "second");

    // Swap insertion order by rewriting the sequence numbers.
    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute_batch(
        "UPDATE records SET seq = 100 WHERE notes = 'first';
         UPDATE records SET seq = 1 WHERE notes = 'second';",
    )
    .unwrap();
    drop(raw);

    assert!(!store.verify_chain().unwrap());
}
