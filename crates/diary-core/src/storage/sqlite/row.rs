//! Record row type for database queries.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{DiaryError, Result};
use crate::record::{DiaryRecord, Severity};

/// Raw row data from the records table, before parsing into domain types.
#[derive(Debug)]
pub struct RecordRow {
    pub id: String,
    pub occurs_on: String,
    pub start_time: Option<String>,
    pub start_zone: Option<String>,
    pub end_time: Option<String>,
    pub end_zone: Option<String>,
    pub severity: Option<i64>,
    pub notes: Option<String>,
    pub is_no_event: bool,
    pub is_unknown: bool,
    pub is_deleted: bool,
    pub delete_reason: Option<String>,
    pub is_incomplete: bool,
    pub parent_record_id: Option<String>,
    pub device_id: String,
    pub created_at: String,
    pub synced_at: Option<String>,
}

impl RecordRow {
    /// Column list matching the field order expected by `from_sql_row`.
    pub const COLUMNS: &'static str = "id, occurs_on, start_time, start_zone, end_time, end_zone, \
         severity, notes, is_no_event, is_unknown, is_deleted, delete_reason, \
         is_incomplete, parent_record_id, device_id, created_at, synced_at";

    pub fn from_sql_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            occurs_on: row.get(1)?,
            start_time: row.get(2)?,
            start_zone: row.get(3)?,
            end_time: row.get(4)?,
            end_zone: row.get(5)?,
            severity: row.get(6)?,
            notes: row.get(7)?,
            is_no_event: row.get(8)?,
            is_unknown: row.get(9)?,
            is_deleted: row.get(10)?,
            delete_reason: row.get(11)?,
            is_incomplete: row.get(12)?,
            parent_record_id: row.get(13)?,
            device_id: row.get(14)?,
            created_at: row.get(15)?,
            synced_at: row.get(16)?,
        })
    }
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| DiaryError::Storage(format!("Invalid {} UUID: {}", field, e)))
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DiaryError::Storage(format!("Invalid {} timestamp: {}", field, e)))
}

impl TryFrom<RecordRow> for DiaryRecord {
    type Error = DiaryError;

    fn try_from(row: RecordRow) -> Result<Self> {
        let id = parse_uuid(&row.id, "record")?;
        let device_id = parse_uuid(&row.device_id, "device")?;
        let occurs_on = row
            .occurs_on
            .parse::<NaiveDate>()
            .map_err(|e| DiaryError::Storage(format!("Invalid occurs_on date: {}", e)))?;
        let start_time = row
            .start_time
            .as_deref()
            .map(|s| parse_timestamp(s, "start_time"))
            .transpose()?;
        let end_time = row
            .end_time
            .as_deref()
            .map(|s| parse_timestamp(s, "end_time"))
            .transpose()?;
        let created_at = parse_timestamp(&row.created_at, "created_at")?;
        let synced_at = row
            .synced_at
            .as_deref()
            .map(|s| parse_timestamp(s, "synced_at"))
            .transpose()?;
        let severity = row.severity.map(Severity::from_code).transpose()?;
        let parent_record_id = row
            .parent_record_id
            .as_deref()
            .map(|s| parse_uuid(s, "parent record"))
            .transpose()?;

        Ok(DiaryRecord {
            id,
            occurs_on,
            start_time,
            start_zone: row.start_zone,
            end_time,
            end_zone: row.end_zone,
            severity,
            notes: row.notes,
            is_no_event: row.is_no_event,
            is_unknown: row.is_unknown,
            is_deleted: row.is_deleted,
            delete_reason: row.delete_reason,
            is_incomplete: row.is_incomplete,
            parent_record_id,
            device_id,
            created_at,
            synced_at,
        })
    }
}
