//! # Diary Core
//!
//! Core library for a clinical trial nosebleed diary: a local-first,
//! append-only event store with a tamper-evident hash chain and a
//! bidirectional cloud sync engine.
//!
//! Once recorded, an event is never silently altered. Corrections are
//! new records linked to the original through `parent_record_id`; the
//! only field ever rewritten in place is `synced_at`, set once when the
//! cloud acknowledges receipt. This audit-trail discipline is enforced
//! at the storage layer, not the UI layer.
//!
//! ## Architecture
//!
//! - **record**: data model (events, markers, severity, completeness)
//! - **storage**: record store trait and the SQLite ledger engine
//! - **chain**: BLAKE3 integrity chain over the ledger
//! - **identity**: stable per-installation device identifier
//! - **sync**: push/pull engine against the cloud record service
//! - **service**: façade combining the above

pub mod chain;
pub mod error;
pub mod identity;
pub mod record;
pub mod service;
pub mod storage;
pub mod sync;

pub use error::{DiaryError, Result};
pub use identity::{DeviceIdentity, IdentityVault};
pub use record::{DiaryRecord, NewRecord, Severity};
pub use service::{DiaryService, RecordDraft};
pub use storage::{RecordStore, SqliteStore};
pub use sync::{
    CloudRecordService, Credential, HttpCloudService, PullOutcome, PushOutcome, SyncEngine,
};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
