//! SQLite storage backend for the append-only ledger.
//!
//! One embedded database file per device, one row per record keyed by
//! UUID. The connection sits behind a mutex so all ledger operations
//! serialize at the store boundary (single writer per device), and
//! every multi-statement mutation runs inside an explicit transaction.
//!
//! Each inserted row carries the integrity chain digest current at its
//! insertion; the running head lives in the `meta` table and is updated
//! in the same transaction as the row itself.

mod row;

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::chain::{self, ChainDigest, DIGEST_LEN};
use crate::error::{DiaryError, Result};
use crate::identity::IdentityVault;
use crate::record::{DiaryRecord, NewRecord};
use crate::storage::traits::RecordStore;

use row::RecordRow;

const FORMAT_VERSION: &str = "0.1";
const CHAIN_HEAD_KEY: &str = "chain_head";

/// SQLite-backed record store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    poisoned: AtomicBool,
}

impl SqliteStore {
    /// Open (or create) the ledger database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory ledger. Used by tests that need isolated
    /// instances without touching the filesystem.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                occurs_on TEXT NOT NULL,
                start_time TEXT,
                start_zone TEXT,
                end_time TEXT,
                end_zone TEXT,
                severity INTEGER,
                notes TEXT,
                is_no_event INTEGER NOT NULL DEFAULT 0,
                is_unknown INTEGER NOT NULL DEFAULT 0,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                delete_reason TEXT,
                is_incomplete INTEGER NOT NULL DEFAULT 0,
                parent_record_id TEXT,
                device_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                synced_at TEXT,
                chain_digest BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS records_occurs_on ON records (occurs_on);
            CREATE INDEX IF NOT EXISTS records_synced_at ON records (synced_at);
            "#,
        )?;

        let store = Self {
            conn: Mutex::new(conn),
            poisoned: AtomicBool::new(false),
        };

        {
            let conn = store.lock_conn()?;
            let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            conn.execute(
                "INSERT OR IGNORE INTO meta (key, value) VALUES (?, ?)",
                ["format_version", FORMAT_VERSION],
            )?;
            conn.execute(
                "INSERT OR IGNORE INTO meta (key, value) VALUES (?, ?)",
                ["created_at", &created_at],
            )?;
            conn.execute(
                "INSERT OR IGNORE INTO meta (key, value) VALUES (?, ?)",
                [CHAIN_HEAD_KEY, &chain::digest_to_hex(&chain::seed())],
            )?;
        }

        Ok(store)
    }

    /// Lock the database connection, returning an error if the mutex is poisoned.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DiaryError::Storage("SQLite connection poisoned".to_string()))
    }

    fn ensure_chain_usable(&self) -> Result<()> {
        if self.poisoned.load(Ordering::SeqCst) {
            return Err(DiaryError::Integrity(
                "Chain verification previously failed; ledger is read-only until erased or repaired"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn chain_head(tx: &rusqlite::Transaction<'_>) -> Result<ChainDigest> {
        let value: String = tx.query_row(
            "SELECT value FROM meta WHERE key = ?",
            [CHAIN_HEAD_KEY],
            |row| row.get(0),
        )?;
        chain::digest_from_hex(&value)
            .ok_or_else(|| DiaryError::Storage("Invalid chain head in metadata".to_string()))
    }

    fn insert_row(
        tx: &rusqlite::Transaction<'_>,
        record: &DiaryRecord,
        digest: &ChainDigest,
    ) -> Result<()> {
        tx.execute(
            r#"
            INSERT INTO records (
                id, occurs_on, start_time, start_zone, end_time, end_zone,
                severity, notes, is_no_event, is_unknown, is_deleted,
                delete_reason, is_incomplete, parent_record_id, device_id,
                created_at, synced_at, chain_digest
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                record.id.to_string(),
                record.occurs_on.to_string(),
                record.start_time.map(fmt_timestamp),
                record.start_zone,
                record.end_time.map(fmt_timestamp),
                record.end_zone,
                record.severity.map(|s| s.code()),
                record.notes,
                record.is_no_event,
                record.is_unknown,
                record.is_deleted,
                record.delete_reason,
                record.is_incomplete,
                record.parent_record_id.map(|id| id.to_string()),
                record.device_id.to_string(),
                fmt_timestamp(record.created_at),
                record.synced_at.map(fmt_timestamp),
                digest.as_slice(),
            ],
        )?;
        tx.execute(
            "UPDATE meta SET value = ? WHERE key = ?",
            [chain::digest_to_hex(digest), CHAIN_HEAD_KEY.to_string()],
        )?;
        Ok(())
    }

    fn query_records(&self, where_clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<DiaryRecord>> {
        let conn = self.lock_conn()?;
        let query = format!(
            "SELECT {} FROM records {} ORDER BY seq",
            RecordRow::COLUMNS,
            where_clause
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params, RecordRow::from_sql_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }
}

fn fmt_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Truncate a timestamp to the microsecond precision the TEXT columns
/// round-trip, so digests computed before a write match digests
/// recomputed from the stored row.
fn to_micros(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(t.timestamp_micros()).unwrap_or(t)
}

fn normalized(record: &DiaryRecord) -> DiaryRecord {
    let mut record = record.clone();
    record.start_time = record.start_time.map(to_micros);
    record.end_time = record.end_time.map(to_micros);
    record.created_at = to_micros(record.created_at);
    record.synced_at = record.synced_at.map(to_micros);
    record
}

fn validate(record: &NewRecord) -> Result<()> {
    if record.is_no_event && record.is_unknown {
        return Err(DiaryError::Validation(
            "A record cannot be both a no-event and an unknown marker".to_string(),
        ));
    }
    if (record.is_no_event || record.is_unknown)
        && (record.start_time.is_some() || record.end_time.is_some() || record.severity.is_some())
    {
        return Err(DiaryError::Validation(
            "Marker records cannot carry start/end times or a severity".to_string(),
        ));
    }
    if (record.is_no_event || record.is_unknown) && record.is_deleted {
        return Err(DiaryError::Validation(
            "A marker record cannot also be a retraction".to_string(),
        ));
    }
    if record.is_deleted && record.parent_record_id.is_none() {
        return Err(DiaryError::Validation(
            "A retraction must reference the record it retracts".to_string(),
        ));
    }
    if record.start_zone.is_some() && record.start_time.is_none() {
        return Err(DiaryError::Validation(
            "start_zone without start_time".to_string(),
        ));
    }
    if record.end_zone.is_some() && record.end_time.is_none() {
        return Err(DiaryError::Validation(
            "end_zone without end_time".to_string(),
        ));
    }
    Ok(())
}

impl RecordStore for SqliteStore {
    fn append(&self, record: NewRecord) -> Result<DiaryRecord> {
        self.ensure_chain_usable()?;
        validate(&record)?;

        let id = record.id.unwrap_or_else(Uuid::new_v4);
        let created_at = to_micros(record.created_at.unwrap_or_else(Utc::now));

        let mut persisted = DiaryRecord {
            id,
            occurs_on: record.occurs_on,
            start_time: record.start_time.map(to_micros),
            start_zone: record.start_zone,
            end_time: record.end_time.map(to_micros),
            end_zone: record.end_zone,
            severity: record.severity,
            notes: record.notes,
            is_no_event: record.is_no_event,
            is_unknown: record.is_unknown,
            is_deleted: record.is_deleted,
            delete_reason: record.delete_reason,
            is_incomplete: false,
            parent_record_id: record.parent_record_id,
            device_id: record.device_id,
            created_at,
            synced_at: None,
        };
        persisted.is_incomplete = !persisted.is_complete();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let exists: Option<String> = tx
            .query_row(
                "SELECT id FROM records WHERE id = ?",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(DiaryError::Validation(format!(
                "Record {} already exists",
                id
            )));
        }

        let head = Self::chain_head(&tx)?;
        let digest = chain::next_digest(&head, &persisted);
        Self::insert_row(&tx, &persisted, &digest)?;
        tx.commit()?;

        Ok(persisted)
    }

    fn get(&self, id: &Uuid) -> Result<DiaryRecord> {
        let conn = self.lock_conn()?;
        let query = format!(
            "SELECT {} FROM records WHERE id = ?",
            RecordRow::COLUMNS
        );
        let result = conn.query_row(&query, [id.to_string()], RecordRow::from_sql_row);

        match result {
            Ok(row) => Ok(row.try_into()?),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(DiaryError::NotFound(format!("Record {} not found", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn records_on(&self, date: NaiveDate) -> Result<Vec<DiaryRecord>> {
        self.query_records("WHERE occurs_on = ?", &[&date.to_string()])
    }

    fn incomplete(&self) -> Result<Vec<DiaryRecord>> {
        self.query_records(
            "WHERE is_incomplete = 1 AND id NOT IN (
                SELECT parent_record_id FROM records WHERE parent_record_id IS NOT NULL
            )",
            &[],
        )
    }

    fn unsynced(&self) -> Result<Vec<DiaryRecord>> {
        self.query_records("WHERE synced_at IS NULL", &[])
    }

    fn superseded_ids(&self) -> Result<HashSet<Uuid>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT parent_record_id FROM records WHERE parent_record_id IS NOT NULL",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = HashSet::new();
        for row in rows {
            let value = row?;
            let parsed = Uuid::parse_str(&value)
                .map_err(|e| DiaryError::Storage(format!("Invalid parent UUID: {}", e)))?;
            ids.insert(parsed);
        }
        Ok(ids)
    }

    fn mark_synced(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<()> {
        let timestamp = fmt_timestamp(to_micros(at));
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute(
                "UPDATE records SET synced_at = ? WHERE id = ? AND synced_at IS NULL",
                [&timestamp, &id.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_if_absent(&self, record: &DiaryRecord) -> Result<bool> {
        self.ensure_chain_usable()?;
        let record = normalized(record);

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let exists: Option<String> = tx
            .query_row(
                "SELECT id FROM records WHERE id = ?",
                [record.id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Ok(false);
        }

        let head = Self::chain_head(&tx)?;
        let digest = chain::next_digest(&head, &record);
        Self::insert_row(&tx, &record, &digest)?;
        tx.commit()?;

        Ok(true)
    }

    fn verify_chain(&self) -> Result<bool> {
        let verified = {
            let conn = self.lock_conn()?;
            let query = format!(
                "SELECT {}, chain_digest FROM records ORDER BY seq",
                RecordRow::COLUMNS
            );
            let mut stmt = conn.prepare(&query)?;
            let rows = stmt.query_map([], |row| {
                let record_row = RecordRow::from_sql_row(row)?;
                let digest: Vec<u8> = row.get(17)?;
                Ok((record_row, digest))
            })?;

            let head_value: String = conn.query_row(
                "SELECT value FROM meta WHERE key = ?",
                [CHAIN_HEAD_KEY],
                |row| row.get(0),
            )?;
            let recorded_head = chain::digest_from_hex(&head_value)
                .ok_or_else(|| DiaryError::Storage("Invalid chain head in metadata".to_string()))?;

            let mut current = chain::seed();
            let mut intact = true;
            for row in rows {
                let (record_row, stored) = row?;
                let record: DiaryRecord = record_row.try_into()?;
                current = chain::next_digest(&current, &record);
                if stored.len() != DIGEST_LEN || stored != current {
                    tracing::warn!(record_id = %record.id, "chain digest mismatch");
                    intact = false;
                    break;
                }
            }
            intact && current == recorded_head
        };

        self.poisoned.store(!verified, Ordering::SeqCst);
        if !verified {
            tracing::error!("ledger integrity verification failed; further writes are blocked");
        }
        Ok(verified)
    }

    fn erase_all(&self) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM records", [])?;
        tx.execute(
            "UPDATE meta SET value = ? WHERE key = ?",
            [chain::digest_to_hex(&chain::seed()), CHAIN_HEAD_KEY.to_string()],
        )?;
        tx.commit()?;
        drop(conn);
        self.poisoned.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl IdentityVault for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        let value = conn
            .query_row("SELECT value FROM meta WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM meta WHERE key = ?", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Severity;
    use chrono::TimeZone;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_append_assigns_created_at_and_incomplete_flag() {
        let store = SqliteStore::open_in_memory().unwrap();
        let device_id = Uuid::new_v4();

        let record = store
            .append(NewRecord::event(date(15), device_id))
            .unwrap();
        assert!(record.is_incomplete);
        assert!(record.synced_at.is_none());

        let complete = store
            .append(
                NewRecord::event(date(15), device_id)
                    .with_start(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(), None)
                    .with_end(Utc.with_ymd_and_hms(2024, 1, 15, 9, 10, 0).unwrap(), None)
                    .with_severity(Severity::Spotting),
            )
            .unwrap();
        assert!(!complete.is_incomplete);
    }

    #[test]
    fn test_append_duplicate_id_is_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let device_id = Uuid::new_v4();
        let id = Uuid::new_v4();

        store
            .append(NewRecord::event(date(15), device_id).with_id(id))
            .unwrap();
        let result = store.append(NewRecord::event(date(16), device_id).with_id(id));
        assert!(matches!(result, Err(DiaryError::Validation(_))));
    }

    #[test]
    fn test_marker_validation() {
        let store = SqliteStore::open_in_memory().unwrap();
        let device_id = Uuid::new_v4();

        let mut both = NewRecord::no_event(date(15), device_id);
        both.is_unknown = true;
        assert!(matches!(
            store.append(both),
            Err(DiaryError::Validation(_))
        ));

        let with_severity =
            NewRecord::no_event(date(15), device_id).with_severity(Severity::Spotting);
        assert!(matches!(
            store.append(with_severity),
            Err(DiaryError::Validation(_))
        ));
    }

    #[test]
    fn test_retraction_requires_parent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let device_id = Uuid::new_v4();

        let orphan = NewRecord::event(date(15), device_id).retracting("wrong entry");
        assert!(matches!(
            store.append(orphan),
            Err(DiaryError::Validation(_))
        ));
    }

    #[test]
    fn test_zone_without_time_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let device_id = Uuid::new_v4();

        let mut bad = NewRecord::event(date(15), device_id);
        bad.start_zone = Some("Europe/Berlin".to_string());
        assert!(matches!(store.append(bad), Err(DiaryError::Validation(_))));
    }

    #[test]
    fn test_get_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let missing = Uuid::new_v4();
        assert!(matches!(
            RecordStore::get(&store, &missing),
            Err(DiaryError::NotFound(_))
        ));
    }

    #[test]
    fn test_meta_vault_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(IdentityVault::get(&store, "device_id").unwrap(), None);
        IdentityVault::put(&store, "device_id", "abc").unwrap();
        assert_eq!(
            IdentityVault::get(&store, "device_id").unwrap(),
            Some("abc".to_string())
        );
        IdentityVault::delete(&store, "device_id").unwrap();
        assert_eq!(IdentityVault::get(&store, "device_id").unwrap(), None);
    }
}
