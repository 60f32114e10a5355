//! Text and JSON rendering for diary records.

use diary_core::DiaryRecord;

fn kind_label(record: &DiaryRecord) -> &'static str {
    if record.is_no_event {
        "no event"
    } else if record.is_unknown {
        "unknown"
    } else if record.is_deleted {
        "retraction"
    } else {
        "event"
    }
}

/// One-line summary used by list output.
pub fn summary_line(record: &DiaryRecord) -> String {
    let severity = record
        .severity
        .map(|s| s.display_name())
        .unwrap_or("-");
    let duration = record
        .duration_minutes()
        .map(|m| format!("{}m", m))
        .unwrap_or_else(|| "-".to_string());
    let synced = if record.synced_at.is_some() { "synced" } else { "local" };
    let mut line = format!(
        "{}  {}  {:<10}  {:<9}  {:>5}  {}",
        record.id,
        record.occurs_on,
        kind_label(record),
        severity,
        duration,
        synced
    );
    if record.is_incomplete {
        line.push_str("  [incomplete]");
    }
    line
}

/// Multi-line detail used by show output.
pub fn detail(record: &DiaryRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("Record:    {}\n", record.id));
    out.push_str(&format!("Date:      {}\n", record.occurs_on));
    out.push_str(&format!("Kind:      {}\n", kind_label(record)));
    if let Some(start) = record.start_time {
        let zone = record.start_zone.as_deref().unwrap_or("device zone");
        out.push_str(&format!("Start:     {} ({})\n", start.to_rfc3339(), zone));
    }
    if let Some(end) = record.end_time {
        let zone = record.end_zone.as_deref().unwrap_or("device zone");
        out.push_str(&format!("End:       {} ({})\n", end.to_rfc3339(), zone));
    }
    if let Some(severity) = record.severity {
        out.push_str(&format!("Severity:  {}\n", severity.display_name()));
    }
    if let Some(minutes) = record.duration_minutes() {
        out.push_str(&format!("Duration:  {} minutes\n", minutes));
    }
    if let Some(ref notes) = record.notes {
        out.push_str(&format!("Notes:     {}\n", notes));
    }
    if let Some(ref reason) = record.delete_reason {
        out.push_str(&format!("Retracted: {}\n", reason));
    }
    if let Some(parent) = record.parent_record_id {
        out.push_str(&format!("Corrects:  {}\n", parent));
    }
    out.push_str(&format!("Created:   {}\n", record.created_at.to_rfc3339()));
    match record.synced_at {
        Some(at) => out.push_str(&format!("Synced:    {}\n", at.to_rfc3339())),
        None => out.push_str("Synced:    not yet\n"),
    }
    if record.is_incomplete {
        out.push_str("Status:    incomplete (missing end time or severity)\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use diary_core::Severity;
    use uuid::Uuid;

    fn record() -> DiaryRecord {
        DiaryRecord {
            id: Uuid::new_v4(),
            occurs_on: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            start_time: Some(Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap()),
            start_zone: None,
            end_time: Some(Utc.with_ymd_and_hms(2024, 2, 1, 8, 45, 0).unwrap()),
            end_zone: Some("Europe/Paris".to_string()),
            severity: Some(Severity::Flowing),
            notes: Some("after sneezing".to_string()),
            is_no_event: false,
            is_unknown: false,
            is_deleted: false,
            delete_reason: None,
            is_incomplete: false,
            parent_record_id: None,
            device_id: Uuid::new_v4(),
            created_at: Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
            synced_at: None,
        }
    }

    #[test]
    fn test_summary_line_shows_duration_and_severity() {
        let line = summary_line(&record());
        assert!(line.contains("45m"));
        assert!(line.contains("Flowing"));
        assert!(line.contains("local"));
    }

    #[test]
    fn test_detail_shows_zone_as_plain_string() {
        let text = detail(&record());
        assert!(text.contains("Europe/Paris"));
        assert!(text.contains("after sneezing"));
    }

    #[test]
    fn test_marker_label() {
        let mut marker = record();
        marker.is_no_event = true;
        marker.start_time = None;
        marker.end_time = None;
        marker.severity = None;
        assert!(summary_line(&marker).contains("no event"));
    }
}
