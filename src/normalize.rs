use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{IssueRecord, QueryType, RawIssue, UNASSIGNED};

const SUMMARY_LIMIT: usize = 60;

/// Maps raw payloads onto the canonical record shape.
#[derive(Debug, Clone)]
pub struct Normalizer {
    story_points_field: String,
}

impl Normalizer {
    pub fn new(story_points_field: &str) -> Self {
        Self {
            story_points_field: story_points_field.to_string(),
        }
    }

    pub fn normalize(&self, category: QueryType, raw: &RawIssue) -> IssueRecord {
        let fields = &raw.fields;

        IssueRecord {
            query_type: category,
            issue_key: raw.key.clone(),
            summary: truncate(fields.summary.as_deref().unwrap_or_default(), SUMMARY_LIMIT),
            status: fields
                .status
                .as_ref()
                .map(|status| status.name.clone())
                .unwrap_or_default(),
            assignee: fields
                .assignee
                .as_ref()
                .map(|user| user.display_name.trim())
                .filter(|name| !name.is_empty())
                .unwrap_or(UNASSIGNED)
                .to_string(),
            priority: fields
                .priority
                .as_ref()
                .map(|priority| priority.name.clone())
                .filter(|name| !name.trim().is_empty()),
            story_points: fields
                .custom
                .get(&self.story_points_field)
                .and_then(story_points)
                .unwrap_or_else(|| category.default_story_points()),
            last_updated: fields.updated.as_deref().and_then(calendar_day),
            alert_level: category.alert_level(),
        }
    }

    pub fn normalize_all(&self, category: QueryType, raw: &[RawIssue]) -> Vec<IssueRecord> {
        raw.iter().map(|issue| self.normalize(category, issue)).collect()
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Estimates arrive as integers or floats; negatives are treated as absent.
fn story_points(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| *v >= 0.0).map(|v| v.round() as u64))
            .and_then(|points| u32::try_from(points).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn calendar_day(timestamp: &str) -> Option<NaiveDate> {
    let day = timestamp.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertLevel;
    use serde_json::json;

    fn raw(value: Value) -> RawIssue {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn flattens_nested_payload() {
        let issue = raw(json!({
            "key": "GK-124",
            "fields": {
                "summary": "POS integration blocked by payment gateway timeout",
                "status": {"name": "Blocked"},
                "assignee": {"displayName": "Alice Smith"},
                "priority": {"name": "Highest"},
                "updated": "2026-10-16T08:30:00.000+0000",
                "customfield_10016": 5
            }
        }));

        let record = Normalizer::new("customfield_10016").normalize(QueryType::Blockers, &issue);
        assert_eq!(record.issue_key, "GK-124");
        assert_eq!(record.status, "Blocked");
        assert_eq!(record.assignee, "Alice Smith");
        assert_eq!(record.priority.as_deref(), Some("Highest"));
        assert_eq!(record.story_points, 5);
        assert_eq!(record.last_updated, NaiveDate::from_ymd_opt(2026, 10, 16));
        assert_eq!(record.alert_level, AlertLevel::Critical);
    }

    #[test]
    fn substitutes_documented_defaults() {
        let issue = raw(json!({
            "key": "GK-130",
            "fields": {"summary": "Orphan", "assignee": null, "customfield_10016": null}
        }));

        let normalizer = Normalizer::new("customfield_10016");
        let open = normalizer.normalize(QueryType::Unassigned, &issue);
        assert_eq!(open.assignee, UNASSIGNED);
        assert_eq!(open.priority, None);
        assert_eq!(open.story_points, 3);
        assert_eq!(open.last_updated, None);
        assert_eq!(open.status, "");

        let done = normalizer.normalize(QueryType::Done, &issue);
        assert_eq!(done.story_points, 0);
    }

    #[test]
    fn blank_priority_name_is_no_priority() {
        let normalizer = Normalizer::new("sp");
        for name in ["", "   "] {
            let issue = raw(json!({"key": "GK-1", "fields": {"priority": {"name": name}}}));
            assert_eq!(normalizer.normalize(QueryType::Blockers, &issue).priority, None);
        }

        let issue = raw(json!({"key": "GK-1", "fields": {"priority": {"name": "High"}}}));
        assert_eq!(
            normalizer.normalize(QueryType::Blockers, &issue).priority.as_deref(),
            Some("High")
        );
    }

    #[test]
    fn truncates_summary_on_char_boundary() {
        let long = "é".repeat(80);
        let issue = raw(json!({"key": "GK-1", "fields": {"summary": long}}));
        let record = Normalizer::new("sp").normalize(QueryType::Stalled, &issue);
        assert_eq!(record.summary.chars().count(), 60);
    }

    #[test]
    fn level_always_follows_category() {
        let issue = raw(json!({"key": "GK-1", "fields": {"status": {"name": "Done"}}}));
        let normalizer = Normalizer::new("sp");
        for category in QueryType::ALL {
            let record = normalizer.normalize(category, &issue);
            assert_eq!(record.alert_level, category.alert_level());
            assert_eq!(record.query_type, category);
        }
    }

    #[test]
    fn parses_fractional_and_textual_points() {
        assert_eq!(story_points(&json!(2.5)), Some(3));
        assert_eq!(story_points(&json!("8")), Some(8));
        assert_eq!(story_points(&json!(-1)), None);
        assert_eq!(story_points(&json!(true)), None);
    }
}
