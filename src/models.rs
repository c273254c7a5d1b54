use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Owner sentinel for issues nobody has picked up.
pub const UNASSIGNED: &str = "UNASSIGNED";

/// Categorization bucket a record was fetched under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Blockers,
    Stalled,
    Unassigned,
    Done,
}

impl QueryType {
    /// Fetch order. Output files and logs follow it.
    pub const ALL: [QueryType; 4] = [
        QueryType::Blockers,
        QueryType::Stalled,
        QueryType::Unassigned,
        QueryType::Done,
    ];

    /// The one place a category is mapped to its alert level.
    pub fn alert_level(self) -> AlertLevel {
        match self {
            QueryType::Blockers => AlertLevel::Critical,
            QueryType::Stalled => AlertLevel::Warning,
            QueryType::Unassigned => AlertLevel::High,
            QueryType::Done => AlertLevel::Done,
        }
    }

    /// Story points assumed when the source leaves the estimate empty.
    pub fn default_story_points(self) -> u32 {
        match self {
            QueryType::Done => 0,
            _ => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::Blockers => "blockers",
            QueryType::Stalled => "stalled",
            QueryType::Unassigned => "unassigned",
            QueryType::Done => "done",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Critical,
    Warning,
    High,
    Done,
}

/// Canonical row every downstream stage works on.
///
/// Field names double as the record file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    #[serde(rename = "Query_Type")]
    pub query_type: QueryType,
    #[serde(rename = "Issue_Key")]
    pub issue_key: String,
    #[serde(rename = "Summary")]
    pub summary: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Assignee")]
    pub assignee: String,
    #[serde(rename = "Priority")]
    pub priority: Option<String>,
    #[serde(rename = "Story_Points")]
    pub story_points: u32,
    #[serde(rename = "Last_Updated")]
    pub last_updated: Option<NaiveDate>,
    #[serde(rename = "Alert_Level")]
    pub alert_level: AlertLevel,
}

impl IssueRecord {
    pub fn is_unassigned(&self) -> bool {
        self.assignee.eq_ignore_ascii_case(UNASSIGNED)
    }

    pub fn last_updated_label(&self) -> String {
        self.last_updated
            .map(|date| date.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Issue payload as the tracking backend's search endpoint returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIssue {
    pub key: String,
    pub fields: RawFields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<RawNamed>,
    #[serde(default)]
    pub assignee: Option<RawUser>,
    #[serde(default)]
    pub priority: Option<RawNamed>,
    #[serde(default)]
    pub updated: Option<String>,
    /// Custom fields, the story points estimate among them.
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNamed {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawUser {
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<RawIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SprintListResponse {
    #[serde(default)]
    pub values: Vec<Sprint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sprint {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KpiBundle {
    pub committed: u32,
    pub completed: u32,
    pub delivery_pct: f64,
    pub carryover: u32,
    pub risks: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadEntry {
    pub assignee: String,
    pub story_points: u32,
    pub overloaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFlow {
    pub status: &'static str,
    pub count: usize,
    pub story_points: u32,
}
