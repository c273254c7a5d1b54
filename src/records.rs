use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::warn;

use crate::config::Mode;
use crate::error::RecordsError;
use crate::models::{AlertLevel, IssueRecord};

pub fn record_file_path(out_dir: &Path, mode: Mode, at: DateTime<Local>) -> PathBuf {
    out_dir.join(format!(
        "{}_sprint_health_{}.csv",
        mode.label(),
        at.format("%Y%m%d_%H%M")
    ))
}

/// Writes one row per record under the canonical header.
pub fn write_records(path: &Path, records: &[IssueRecord]) -> Result<(), RecordsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_records(path: &Path) -> Result<Vec<IssueRecord>, RecordsError> {
    if !path.exists() {
        return Err(RecordsError::RecordFileMissing(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for result in reader.deserialize::<IssueRecord>() {
        records.push(result?);
    }
    Ok(records)
}

/// Critical rows of a record file. A missing file yields no rows.
pub fn read_critical(path: &Path) -> Result<Vec<IssueRecord>, RecordsError> {
    match read_records(path) {
        Ok(records) => Ok(records
            .into_iter()
            .filter(|record| record.alert_level == AlertLevel::Critical)
            .collect()),
        Err(RecordsError::RecordFileMissing(path)) => {
            warn!(path = %path.display(), "record file missing, treating critical set as empty");
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueryType, RawIssue, UNASSIGNED};
    use crate::normalize::Normalizer;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn record(key: &str, category: QueryType, priority: Option<&str>) -> IssueRecord {
        IssueRecord {
            query_type: category,
            issue_key: key.to_string(),
            summary: "Refactor loyalty points, calculation".to_string(),
            status: "In Progress".to_string(),
            assignee: UNASSIGNED.to_string(),
            priority: priority.map(str::to_string),
            story_points: 13,
            last_updated: NaiveDate::from_ymd_opt(2026, 10, 12),
            alert_level: category.alert_level(),
        }
    }

    #[test]
    fn records_survive_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("run.csv");
        let mut without_date = record("GK-2", QueryType::Done, None);
        without_date.last_updated = None;
        let blank_priority: RawIssue = serde_json::from_value(serde_json::json!({
            "key": "GK-3",
            "fields": {"summary": "No priority", "priority": {"name": ""}}
        }))
        .unwrap();
        let records = vec![
            record("GK-1", QueryType::Blockers, Some("Highest")),
            without_date,
            Normalizer::new("customfield_10016").normalize(QueryType::Blockers, &blank_priority),
        ];

        write_records(&path, &records).unwrap();
        assert_eq!(read_records(&path).unwrap(), records);
    }

    #[test]
    fn file_uses_canonical_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.csv");
        write_records(&path, &[record("GK-1", QueryType::Blockers, Some("High"))]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("Query_Type,Issue_Key,Summary,Status,Assignee,Priority,Story_Points,Last_Updated,Alert_Level")
        );
        assert_eq!(
            lines.next(),
            Some("blockers,GK-1,\"Refactor loyalty points, calculation\",In Progress,UNASSIGNED,High,13,2026-10-12,CRITICAL")
        );
    }

    #[test]
    fn missing_file_means_no_critical_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.csv");
        assert!(matches!(
            read_records(&path),
            Err(RecordsError::RecordFileMissing(_))
        ));
        assert!(read_critical(&path).unwrap().is_empty());
    }

    #[test]
    fn critical_filter_keeps_blockers_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.csv");
        let records = vec![
            record("GK-1", QueryType::Blockers, None),
            record("GK-2", QueryType::Stalled, None),
            record("GK-3", QueryType::Blockers, None),
        ];
        write_records(&path, &records).unwrap();

        let keys: Vec<String> = read_critical(&path)
            .unwrap()
            .into_iter()
            .map(|r| r.issue_key)
            .collect();
        assert_eq!(keys, vec!["GK-1", "GK-3"]);
    }

    #[test]
    fn file_name_carries_mode_and_timestamp() {
        let at = Local.with_ymd_and_hms(2026, 10, 18, 9, 5, 0).unwrap();
        let path = record_file_path(Path::new("reports"), Mode::Mock, at);
        assert_eq!(path, Path::new("reports/MOCK_sprint_health_20261018_0905.csv"));
    }
}
