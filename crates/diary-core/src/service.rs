//! Diary service façade.
//!
//! Combines the record store, device identity, and sync engine behind
//! one surface: create events (including no-event/unknown markers),
//! record corrections and retractions, classify completeness, and
//! trigger sync on demand. All collaborators are injected at
//! construction; there is no process-wide state, so tests run multiple
//! isolated instances side by side.
//!
//! Recording is strictly local: `add_record` and the markers never
//! depend on network availability.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::identity::{DeviceIdentity, IdentityVault};
use crate::record::{DiaryRecord, NewRecord, Severity};
use crate::storage::RecordStore;
use crate::sync::{CloudRecordService, Credential, PullOutcome, PushOutcome, SyncEngine};

/// UI-facing input for a real nosebleed event or a correction.
#[derive(Debug, Clone, Default)]
pub struct RecordDraft {
    pub start_time: Option<DateTime<Utc>>,
    pub start_zone: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
    pub end_zone: Option<String>,
    pub severity: Option<Severity>,
    pub notes: Option<String>,
}

/// The façade combining store, identity, and sync.
pub struct DiaryService {
    store: Arc<dyn RecordStore>,
    identity: DeviceIdentity,
    sync: SyncEngine,
}

impl DiaryService {
    /// Wire up a service from injected collaborators. `store` and
    /// `vault` are usually two handles to the same SQLite store.
    pub fn new(
        store: Arc<dyn RecordStore>,
        vault: Arc<dyn IdentityVault>,
        cloud: Arc<dyn CloudRecordService>,
    ) -> Self {
        let identity = DeviceIdentity::new(vault);
        let sync = SyncEngine::new(store.clone(), cloud);
        Self {
            store,
            identity,
            sync,
        }
    }

    fn draft_to_record(&self, occurs_on: NaiveDate, draft: RecordDraft) -> Result<NewRecord> {
        let device_id = self.identity.device_id()?;
        let mut record = NewRecord::event(occurs_on, device_id)
            .with_id(self.identity.generate_record_id());
        record.start_time = draft.start_time;
        record.start_zone = draft.start_zone;
        record.end_time = draft.end_time;
        record.end_zone = draft.end_zone;
        record.severity = draft.severity;
        record.notes = draft.notes;
        Ok(record)
    }

    /// Record a real nosebleed event. Incomplete drafts are accepted
    /// and flagged, never rejected.
    pub fn add_record(&self, occurs_on: NaiveDate, draft: RecordDraft) -> Result<DiaryRecord> {
        let record = self.draft_to_record(occurs_on, draft)?;
        self.store.append(record)
    }

    /// Record an explicit "nothing happened today" marker.
    pub fn mark_no_event(&self, occurs_on: NaiveDate) -> Result<DiaryRecord> {
        let device_id = self.identity.device_id()?;
        self.store.append(
            NewRecord::no_event(occurs_on, device_id)
                .with_id(self.identity.generate_record_id()),
        )
    }

    /// Record an explicit "don't know" marker.
    pub fn mark_unknown(&self, occurs_on: NaiveDate) -> Result<DiaryRecord> {
        let device_id = self.identity.device_id()?;
        self.store.append(
            NewRecord::unknown(occurs_on, device_id)
                .with_id(self.identity.generate_record_id()),
        )
    }

    /// Supersede an earlier record with a corrected one. The original
    /// stays in the ledger untouched; the new record links back to it.
    ///
    /// # Errors
    ///
    /// Returns `DiaryError::NotFound` if the parent does not exist.
    pub fn correct(&self, parent_id: Uuid, draft: RecordDraft) -> Result<DiaryRecord> {
        let parent = self.store.get(&parent_id)?;
        let record = self
            .draft_to_record(parent.occurs_on, draft)?
            .with_parent(parent_id);
        self.store.append(record)
    }

    /// Logically retract a record: a correction flagged as deleted,
    /// carrying the reason, linked to the original.
    pub fn retract(&self, id: Uuid, reason: impl Into<String>) -> Result<DiaryRecord> {
        let original = self.store.get(&id)?;
        let device_id = self.identity.device_id()?;
        self.store.append(
            NewRecord::event(original.occurs_on, device_id)
                .with_id(self.identity.generate_record_id())
                .with_parent(id)
                .retracting(reason),
        )
    }

    pub fn get(&self, id: &Uuid) -> Result<DiaryRecord> {
        self.store.get(id)
    }

    pub fn records_on(&self, date: NaiveDate) -> Result<Vec<DiaryRecord>> {
        self.store.records_on(date)
    }

    pub fn incomplete(&self) -> Result<Vec<DiaryRecord>> {
        self.store.incomplete()
    }

    pub fn unsynced(&self) -> Result<Vec<DiaryRecord>> {
        self.store.unsynced()
    }

    /// Replay the ledger and verify the integrity chain.
    pub fn verify_integrity(&self) -> Result<bool> {
        self.store.verify_chain()
    }

    pub async fn push(&self, credential: &Credential) -> Result<PushOutcome> {
        self.sync.push(credential).await
    }

    pub async fn pull(&self, credential: &Credential) -> Result<PullOutcome> {
        self.sync.pull(credential).await
    }

    pub fn device_id(&self) -> Result<Uuid> {
        self.identity.device_id()
    }

    /// Explicit user-triggered wipe: destroys the ledger and unlinks
    /// the device identity.
    pub fn erase_local_data(&self) -> Result<()> {
        self.store.erase_all()?;
        self.identity.reset()
    }
}
