use std::collections::BTreeMap;

use crate::models::{IssueRecord, WorkloadEntry};

/// Story points at or above which an owner may be overloaded.
pub const OVERLOAD_THRESHOLD: u32 = 13;

/// Story points per assignee, heaviest first.
pub fn summarize_workload(records: &[IssueRecord]) -> Vec<WorkloadEntry> {
    let mut totals: BTreeMap<&str, u32> = BTreeMap::new();
    for record in records {
        let total = totals.entry(record.assignee.as_str()).or_insert(0);
        *total = total.saturating_add(record.story_points);
    }

    let mut entries: Vec<WorkloadEntry> = totals
        .into_iter()
        .map(|(assignee, story_points)| WorkloadEntry {
            assignee: assignee.to_string(),
            story_points,
            overloaded: is_overloaded(assignee, story_points),
        })
        .collect();

    entries.sort_by(|a, b| b.story_points.cmp(&a.story_points));
    entries
}

fn is_overloaded(assignee: &str, story_points: u32) -> bool {
    story_points >= OVERLOAD_THRESHOLD && !assignee.eq_ignore_ascii_case(crate::models::UNASSIGNED)
}

pub fn overloaded(records: &[IssueRecord]) -> Vec<WorkloadEntry> {
    summarize_workload(records)
        .into_iter()
        .filter(|entry| entry.overloaded)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueryType, UNASSIGNED};

    fn assigned(assignee: &str, points: u32) -> IssueRecord {
        IssueRecord {
            query_type: QueryType::Stalled,
            issue_key: "GK-1".to_string(),
            summary: "work".to_string(),
            status: "In Progress".to_string(),
            assignee: assignee.to_string(),
            priority: None,
            story_points: points,
            last_updated: None,
            alert_level: QueryType::Stalled.alert_level(),
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let records = vec![
            assigned("Alice", 8),
            assigned("Alice", 5),
            assigned("Bob", 12),
        ];
        let flagged = overloaded(&records);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].assignee, "Alice");
        assert_eq!(flagged[0].story_points, 13);
    }

    #[test]
    fn unassigned_is_never_overloaded() {
        let records = vec![assigned(UNASSIGNED, 20), assigned(UNASSIGNED, 20)];
        let summary = summarize_workload(&records);
        assert_eq!(summary[0].story_points, 40);
        assert!(!summary[0].overloaded);
        assert!(overloaded(&records).is_empty());
    }

    #[test]
    fn huge_estimates_saturate() {
        let records = vec![assigned("Alice", 3_000_000_000), assigned("Alice", 3_000_000_000)];
        let summary = summarize_workload(&records);
        assert_eq!(summary[0].story_points, u32::MAX);
        assert!(summary[0].overloaded);
    }

    #[test]
    fn sorted_heaviest_first() {
        let records = vec![assigned("Carol", 2), assigned("Dan", 9), assigned("Erin", 4)];
        let names: Vec<String> = summarize_workload(&records)
            .into_iter()
            .map(|e| e.assignee)
            .collect();
        assert_eq!(names, vec!["Dan", "Erin", "Carol"]);
    }
}
