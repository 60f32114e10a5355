//! Bidirectional sync between the local ledger and the cloud service.
//!
//! Push sends the full unsynced batch in one network call and marks
//! exactly the sent ids on success; a failed call marks nothing, so a
//! retry resends the identical batch (the remote dedupes by id). Pull
//! merges remote records through idempotent insert-if-absent and never
//! touches the synced state of local records. Push and pull serialize
//! through one async mutex so the unsynced cursor stays consistent;
//! neither has a partial-commit hazard if the caller abandons the task
//! mid-flight.

pub mod http;
pub mod wire;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{DiaryError, Result};
use crate::record::DiaryRecord;
use crate::storage::RecordStore;

pub use http::HttpCloudService;
pub use wire::WireRecord;

/// Bearer credential issued by the external auth collaborator.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    // Tokens never land in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Remote endpoint the sync engine talks to.
///
/// Production uses [`HttpCloudService`]; tests substitute an in-memory
/// fake.
#[async_trait]
pub trait CloudRecordService: Send + Sync {
    /// Upload a batch of records. The remote treats resubmission of
    /// already-received ids as a no-op.
    async fn upload(&self, credential: &Credential, records: &[DiaryRecord]) -> Result<()>;

    /// Download all records visible to this user/enrollment.
    async fn download(&self, credential: &Credential) -> Result<Vec<DiaryRecord>>;
}

/// Result of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Nothing unsynced; no network call was made.
    NothingToPush,
    /// The batch was acknowledged and marked synced.
    Pushed { count: usize },
}

/// Result of a pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullOutcome {
    /// Records the cloud returned.
    pub fetched: usize,
    /// Records actually inserted locally (the rest already existed).
    pub merged: usize,
}

/// Pushes unsynced local records and pulls remote ones.
pub struct SyncEngine {
    store: Arc<dyn RecordStore>,
    cloud: Arc<dyn CloudRecordService>,
    // Serializes push and pull; they are never interleaved on a device.
    gate: tokio::sync::Mutex<()>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn RecordStore>, cloud: Arc<dyn CloudRecordService>) -> Self {
        Self {
            store,
            cloud,
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Push all unsynced records to the cloud.
    ///
    /// Returns [`PushOutcome::NothingToPush`] without any network call
    /// when the batch is empty; a blank credential fails before the
    /// call so the caller can distinguish "nothing to do" from "cannot
    /// authenticate". The chain is verified before the batch is
    /// trusted; on verification failure nothing is sent.
    pub async fn push(&self, credential: &Credential) -> Result<PushOutcome> {
        let _guard = self.gate.lock().await;

        let batch = self.store.unsynced()?;
        if batch.is_empty() {
            tracing::debug!("push: nothing to push");
            return Ok(PushOutcome::NothingToPush);
        }
        if credential.is_blank() {
            return Err(DiaryError::Auth(
                "No credential available for sync".to_string(),
            ));
        }
        if !self.store.verify_chain()? {
            return Err(DiaryError::Integrity(
                "Ledger failed verification; push blocked".to_string(),
            ));
        }

        self.cloud.upload(credential, &batch).await?;

        let ids: Vec<_> = batch.iter().map(|r| r.id).collect();
        self.store.mark_synced(&ids, Utc::now())?;
        tracing::info!(count = ids.len(), "push: batch acknowledged");
        Ok(PushOutcome::Pushed { count: ids.len() })
    }

    /// Pull all remote records and merge them into the local ledger.
    ///
    /// Pulling never marks locally-originated records as synced; push
    /// and pull update disjoint state.
    pub async fn pull(&self, credential: &Credential) -> Result<PullOutcome> {
        let _guard = self.gate.lock().await;

        if credential.is_blank() {
            return Err(DiaryError::Auth(
                "No credential available for sync".to_string(),
            ));
        }

        let remote = self.cloud.download(credential).await?;
        let fetched = remote.len();
        let mut merged = 0;
        for record in &remote {
            if self.store.insert_if_absent(record)? {
                merged += 1;
            }
        }
        tracing::info!(fetched, merged, "pull: merge complete");
        Ok(PullOutcome { fetched, merged })
    }
}
