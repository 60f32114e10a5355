//! Core data model: diary records and severity.
//!
//! A `DiaryRecord` is immutable once appended. The only field ever
//! rewritten after creation is `synced_at`, set exactly once when the
//! cloud acknowledges receipt. History is amended by inserting a new
//! record with `parent_record_id` set, never by editing the original.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DiaryError, Result};

/// Ordinal bleed severity scale, spotting through gushing.
///
/// Stored as a stable integer code; displayed through an explicit
/// mapping table so domain logic never compares display strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Spotting,
    Dripping,
    Trickling,
    Flowing,
    Pouring,
    Gushing,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Spotting,
        Severity::Dripping,
        Severity::Trickling,
        Severity::Flowing,
        Severity::Pouring,
        Severity::Gushing,
    ];

    /// Stable storage code (0-based ordinal).
    pub fn code(self) -> i64 {
        match self {
            Severity::Spotting => 0,
            Severity::Dripping => 1,
            Severity::Trickling => 2,
            Severity::Flowing => 3,
            Severity::Pouring => 4,
            Severity::Gushing => 5,
        }
    }

    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Severity::Spotting),
            1 => Ok(Severity::Dripping),
            2 => Ok(Severity::Trickling),
            3 => Ok(Severity::Flowing),
            4 => Ok(Severity::Pouring),
            5 => Ok(Severity::Gushing),
            other => Err(DiaryError::Validation(format!(
                "Unknown severity code: {}",
                other
            ))),
        }
    }

    /// User-facing name. Display only, never matched in domain logic.
    pub fn display_name(self) -> &'static str {
        match self {
            Severity::Spotting => "Spotting",
            Severity::Dripping => "Dripping",
            Severity::Trickling => "Trickling",
            Severity::Flowing => "Flowing",
            Severity::Pouring => "Pouring",
            Severity::Gushing => "Gushing",
        }
    }

    /// Parse a CLI/config token into a severity level.
    pub fn parse(token: &str) -> Result<Self> {
        match token.to_ascii_lowercase().as_str() {
            "spotting" => Ok(Severity::Spotting),
            "dripping" => Ok(Severity::Dripping),
            "trickling" => Ok(Severity::Trickling),
            "flowing" => Ok(Severity::Flowing),
            "pouring" => Ok(Severity::Pouring),
            "gushing" => Ok(Severity::Gushing),
            other => Err(DiaryError::Validation(format!(
                "Unknown severity \"{}\" (expected one of: spotting, dripping, trickling, flowing, pouring, gushing)",
                other
            ))),
        }
    }
}

/// A single diary record: one nosebleed event, marker, or correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryRecord {
    /// Unique identifier, assigned at creation, never reused
    pub id: Uuid,

    /// Calendar date the event is attributed to (day bucket)
    pub occurs_on: NaiveDate,

    /// Precise start, absolute time
    pub start_time: Option<DateTime<Utc>>,

    /// IANA timezone the start was recorded in (None = device zone)
    pub start_zone: Option<String>,

    /// Precise end, absolute time
    pub end_time: Option<DateTime<Utc>>,

    /// IANA timezone the end was recorded in. Kept separately from the
    /// start zone because the two may differ after travel.
    pub end_zone: Option<String>,

    pub severity: Option<Severity>,

    pub notes: Option<String>,

    /// Explicit "nothing happened today" marker
    pub is_no_event: bool,

    /// Explicit "don't know" marker
    pub is_unknown: bool,

    /// Logical retraction flag
    pub is_deleted: bool,

    pub delete_reason: Option<String>,

    /// Real event missing end time or severity
    pub is_incomplete: bool,

    /// Record this one corrects/supersedes. Presence of this field is
    /// the only mechanism for amending history.
    pub parent_record_id: Option<Uuid>,

    /// Device that created the record
    pub device_id: Uuid,

    /// Local wall-clock creation time (not authoritative for ordering
    /// across devices)
    pub created_at: DateTime<Utc>,

    /// Set exactly once, when the cloud acknowledges receipt
    pub synced_at: Option<DateTime<Utc>>,
}

impl DiaryRecord {
    /// Derived duration in whole minutes.
    ///
    /// `None` when either endpoint is absent or the end resolves to
    /// before the start in absolute time. A negative span is rejected,
    /// not clamped to zero.
    pub fn duration_minutes(&self) -> Option<i64> {
        let start = self.start_time?;
        let end = self.end_time?;
        let span = end.signed_duration_since(start);
        if span < Duration::zero() {
            return None;
        }
        Some(span.num_minutes())
    }

    /// True for no-event and unknown markers.
    pub fn is_marker(&self) -> bool {
        self.is_no_event || self.is_unknown
    }

    /// A record is complete iff it is a marker, or it has both an end
    /// time and a severity. Retraction records have nothing to complete.
    pub fn is_complete(&self) -> bool {
        self.is_marker()
            || self.is_deleted
            || (self.end_time.is_some() && self.severity.is_some())
    }
}

/// Builder for records about to be appended.
///
/// The store assigns `created_at` when absent and computes the
/// incomplete flag; an explicit `id` is honored (the service layer
/// generates ids through `DeviceIdentity`).
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub id: Option<Uuid>,
    pub occurs_on: NaiveDate,
    pub start_time: Option<DateTime<Utc>>,
    pub start_zone: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
    pub end_zone: Option<String>,
    pub severity: Option<Severity>,
    pub notes: Option<String>,
    pub is_no_event: bool,
    pub is_unknown: bool,
    pub is_deleted: bool,
    pub delete_reason: Option<String>,
    pub parent_record_id: Option<Uuid>,
    pub device_id: Uuid,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewRecord {
    /// A real nosebleed event attributed to `occurs_on`.
    pub fn event(occurs_on: NaiveDate, device_id: Uuid) -> Self {
        Self {
            id: None,
            occurs_on,
            start_time: None,
            start_zone: None,
            end_time: None,
            end_zone: None,
            severity: None,
            notes: None,
            is_no_event: false,
            is_unknown: false,
            is_deleted: false,
            delete_reason: None,
            parent_record_id: None,
            device_id,
            created_at: None,
        }
    }

    /// Explicit "nothing happened today" marker.
    pub fn no_event(occurs_on: NaiveDate, device_id: Uuid) -> Self {
        Self {
            is_no_event: true,
            ..Self::event(occurs_on, device_id)
        }
    }

    /// Explicit "don't know" marker.
    pub fn unknown(occurs_on: NaiveDate, device_id: Uuid) -> Self {
        Self {
            is_unknown: true,
            ..Self::event(occurs_on, device_id)
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_start(mut self, time: DateTime<Utc>, zone: Option<String>) -> Self {
        self.start_time = Some(time);
        self.start_zone = zone;
        self
    }

    pub fn with_end(mut self, time: DateTime<Utc>, zone: Option<String>) -> Self {
        self.end_time = Some(time);
        self.end_zone = zone;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_parent(mut self, parent_record_id: Uuid) -> Self {
        self.parent_record_id = Some(parent_record_id);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Turn this record into a logical retraction of its parent.
    pub fn retracting(mut self, reason: impl Into<String>) -> Self {
        self.is_deleted = true;
        self.delete_reason = Some(reason.into());
        self
    }
}
