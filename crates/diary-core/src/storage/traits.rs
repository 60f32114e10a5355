//! Record store trait definition.
//!
//! The `RecordStore` trait defines the interface the service layer and
//! sync engine program against. The abstraction keeps the ledger
//! backend swappable and lets tests run isolated in-memory or tempfile
//! instances side by side.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::record::{DiaryRecord, NewRecord};

/// Append-only local ledger of diary records.
///
/// All implementations must ensure:
/// - Append-only semantics: no field other than `synced_at` is ever
///   rewritten after creation
/// - Appends are serialized; ties break by arrival order at the store
///   boundary, not by `created_at`
/// - Every insertion extends the integrity chain in the same
///   transaction as the row itself
pub trait RecordStore: Send + Sync {
    /// Append a new record to the ledger.
    ///
    /// Validates internal consistency, assigns `created_at` if absent,
    /// and computes the incomplete flag (a real event missing end time
    /// or severity is flagged, not rejected).
    ///
    /// # Errors
    ///
    /// Returns `DiaryError::Validation` if:
    /// - A record with the same id already exists
    /// - Marker flags contradict each other or carry event fields
    ///
    /// Returns `DiaryError::Integrity` if a previous chain verification
    /// failed and the store has not been reset.
    fn append(&self, record: NewRecord) -> Result<DiaryRecord>;

    /// Get a record by id.
    ///
    /// # Errors
    ///
    /// Returns `DiaryError::NotFound` if no record has this id.
    fn get(&self, id: &Uuid) -> Result<DiaryRecord>;

    /// All records attributed to the given calendar date, in insertion
    /// order.
    fn records_on(&self, date: NaiveDate) -> Result<Vec<DiaryRecord>>;

    /// All incomplete records that have not been superseded by a later
    /// record's `parent_record_id`.
    fn incomplete(&self) -> Result<Vec<DiaryRecord>>;

    /// All records the cloud has not acknowledged, in insertion order.
    fn unsynced(&self) -> Result<Vec<DiaryRecord>>;

    /// Ids referenced as a parent by at least one later record.
    fn superseded_ids(&self) -> Result<HashSet<Uuid>>;

    /// Set `synced_at` on exactly the given ids.
    ///
    /// This is the only permitted post-creation mutation. The whole
    /// batch commits in one transaction; readers never observe a
    /// half-updated set. An already-synced id keeps its original
    /// timestamp.
    fn mark_synced(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<()>;

    /// Insert a record pulled from the cloud unless its id already
    /// exists locally.
    ///
    /// Returns `true` if the record was inserted, `false` for the
    /// silent no-op. Calling twice with the same id yields the same
    /// ledger state as calling once.
    fn insert_if_absent(&self, record: &DiaryRecord) -> Result<bool>;

    /// Replay the ledger in insertion order, recomputing every chain
    /// digest and comparing against the recorded ones.
    ///
    /// Returns `false` on any mismatch, which also poisons the store:
    /// further insertions fail with `DiaryError::Integrity` until the
    /// ledger is erased or repaired out of band. O(n) over the full
    /// history; intended to run on demand, notably before a sync push.
    fn verify_chain(&self) -> Result<bool>;

    /// Irreversibly destroy the local ledger and reset the chain to its
    /// seed state.
    fn erase_all(&self) -> Result<()>;
}
