//! Wire format for the cloud record API.
//!
//! Every record field crosses the wire; timestamps are UTC RFC 3339
//! strings and timezone identifiers travel separately as plain strings,
//! never folded into the offset.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{DiaryRecord, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub id: Uuid,
    pub occurs_on_date: NaiveDate,
    pub start_time: Option<DateTime<Utc>>,
    pub start_time_zone: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
    pub end_time_zone: Option<String>,
    pub severity: Option<Severity>,
    pub notes: Option<String>,
    pub is_no_event_marker: bool,
    pub is_unknown_marker: bool,
    pub is_deleted: bool,
    pub delete_reason: Option<String>,
    pub is_incomplete: bool,
    pub parent_record_id: Option<Uuid>,
    pub device_uuid: Uuid,
    pub created_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl From<&DiaryRecord> for WireRecord {
    fn from(record: &DiaryRecord) -> Self {
        Self {
            id: record.id,
            occurs_on_date: record.occurs_on,
            start_time: record.start_time,
            start_time_zone: record.start_zone.clone(),
            end_time: record.end_time,
            end_time_zone: record.end_zone.clone(),
            severity: record.severity,
            notes: record.notes.clone(),
            is_no_event_marker: record.is_no_event,
            is_unknown_marker: record.is_unknown,
            is_deleted: record.is_deleted,
            delete_reason: record.delete_reason.clone(),
            is_incomplete: record.is_incomplete,
            parent_record_id: record.parent_record_id,
            device_uuid: record.device_id,
            created_at: record.created_at,
            synced_at: record.synced_at,
        }
    }
}

impl From<WireRecord> for DiaryRecord {
    fn from(wire: WireRecord) -> Self {
        Self {
            id: wire.id,
            occurs_on: wire.occurs_on_date,
            start_time: wire.start_time,
            start_zone: wire.start_time_zone,
            end_time: wire.end_time,
            end_zone: wire.end_time_zone,
            severity: wire.severity,
            notes: wire.notes,
            is_no_event: wire.is_no_event_marker,
            is_unknown: wire.is_unknown_marker,
            is_deleted: wire.is_deleted,
            delete_reason: wire.delete_reason,
            is_incomplete: wire.is_incomplete,
            parent_record_id: wire.parent_record_id,
            device_id: wire.device_uuid,
            created_at: wire.created_at,
            synced_at: wire.synced_at,
        }
    }
}

/// `POST /api/v1/user/sync` request body.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushRequest {
    pub records: Vec<WireRecord>,
}

/// `POST /api/v1/user/sync` response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushResponse {
    pub success: bool,
}

/// `GET /api/v1/user/records` response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct PullResponse {
    pub records: Vec<WireRecord>,
}
