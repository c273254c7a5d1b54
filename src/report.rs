use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{AlertLevel, IssueRecord};
use crate::workload;

const RULE: &str = "============================================================";

fn by_level(records: &[IssueRecord], level: AlertLevel) -> Vec<&IssueRecord> {
    records.iter().filter(|r| r.alert_level == level).collect()
}

fn unassigned_high(records: &[IssueRecord]) -> Vec<&IssueRecord> {
    records
        .iter()
        .filter(|r| r.alert_level == AlertLevel::High && r.is_unassigned())
        .collect()
}

/// Console digest printed after each run.
pub fn daily_analysis(records: &[IssueRecord]) -> String {
    let blockers = by_level(records, AlertLevel::Critical);
    let stalled = by_level(records, AlertLevel::Warning);
    let unassigned = unassigned_high(records);
    let done = by_level(records, AlertLevel::Done);

    let mut output = String::new();

    if !blockers.is_empty() {
        let _ = writeln!(output, "{} BLOCKERS:", blockers.len());
        for b in &blockers {
            let _ = writeln!(output, " • {} — {} ({})", b.issue_key, b.summary, b.assignee);
        }
    }

    if !stalled.is_empty() {
        let _ = writeln!(output, "\n{} stalled items:", stalled.len());
        for s in &stalled {
            let _ = writeln!(
                output,
                " • {} — {} (last updated {})",
                s.issue_key,
                s.assignee,
                s.last_updated_label()
            );
        }
    }

    if !unassigned.is_empty() {
        let _ = writeln!(output, "\nUnassigned high priority:");
        for u in &unassigned {
            let _ = writeln!(output, " • {} — {}", u.issue_key, u.summary);
        }
    }

    if !done.is_empty() {
        let _ = writeln!(output, "\n{} items completed this sprint", done.len());
    }

    output
}

pub fn team_standup_summary(records: &[IssueRecord], today: NaiveDate) -> String {
    let blockers = by_level(records, AlertLevel::Critical);
    let stalled = by_level(records, AlertLevel::Warning);
    let unassigned = unassigned_high(records);

    let mut output = String::new();
    let _ = writeln!(output, "DAILY STANDUP SUMMARY");
    let _ = writeln!(output, "Date: {today}");
    let _ = writeln!(output, "{RULE}");
    let _ = writeln!(output);

    if blockers.is_empty() {
        let _ = writeln!(output, "No blockers today.");
    } else {
        let _ = writeln!(output, "{} BLOCKERS:", blockers.len());
        for b in &blockers {
            let _ = writeln!(output, " • {} — {} ({})", b.issue_key, b.summary, b.assignee);
        }
    }
    let _ = writeln!(output);

    if stalled.is_empty() {
        let _ = writeln!(output, "No stalled items.");
    } else {
        let _ = writeln!(output, "{} Stalled Items (>2 days inactivity):", stalled.len());
        for s in &stalled {
            let _ = writeln!(
                output,
                " • {} — {} (Last updated {})",
                s.issue_key,
                s.assignee,
                s.last_updated_label()
            );
        }
    }
    let _ = writeln!(output);

    if unassigned.is_empty() {
        let _ = writeln!(output, "No unassigned high-priority items.");
    } else {
        let _ = writeln!(output, "Unassigned High Priority Work:");
        for u in &unassigned {
            let _ = writeln!(output, " • {} — {}", u.issue_key, u.summary);
        }
    }

    output
}

pub fn manager_report(records: &[IssueRecord], today: NaiveDate) -> String {
    let blockers = by_level(records, AlertLevel::Critical);
    let stalled = by_level(records, AlertLevel::Warning);
    let unassigned = unassigned_high(records);
    let overloaded = workload::overloaded(records);

    let mut output = String::new();
    let _ = writeln!(output, "PRIVATE MANAGER INSIGHTS REPORT");
    let _ = writeln!(output, "Date: {today}");
    let _ = writeln!(output, "{RULE}");

    if !blockers.is_empty() {
        let _ = writeln!(output, "\nBLOCKERS ({}), direct risk", blockers.len());
        for b in &blockers {
            let _ = writeln!(output, " • {} — {} ({})", b.issue_key, b.summary, b.assignee);
        }
        let _ = writeln!(output, "\nManagement Action:");
        let _ = writeln!(output, " • Ensure each assignee provides root-cause + ETA for unblocking.");
        let _ = writeln!(output, " • Verify dependencies across teams.");
    }

    if !stalled.is_empty() {
        let _ = writeln!(output, "\nSTALLED WORK (>2 days no movement)");
        for s in &stalled {
            let _ = writeln!(
                output,
                " • {} — {} (Last activity {})",
                s.issue_key,
                s.assignee,
                s.last_updated_label()
            );
        }
        let _ = writeln!(output, "\nRisk:");
        let _ = writeln!(output, " • Potential lack of clarity or unreported technical blockers.");
        let _ = writeln!(output, " • Ask each developer for a plan to move forward today.");
    }

    if !unassigned.is_empty() {
        let _ = writeln!(output, "\nHIGH PRIORITY UNASSIGNED WORK");
        for u in &unassigned {
            let _ = writeln!(output, " • {} — {}", u.issue_key, u.summary);
        }
        let _ = writeln!(output, "\nManagement Action:");
        let _ = writeln!(output, " • Reassign immediately. Drop a low-value item if necessary.");
    }

    if !overloaded.is_empty() {
        let _ = writeln!(output, "\nPOTENTIAL OVERLOAD");
        for entry in &overloaded {
            let _ = writeln!(
                output,
                " • {}: {} story points allocated.",
                entry.assignee, entry.story_points
            );
        }
        let _ = writeln!(output, "\nAction:");
        let _ = writeln!(output, " • Rebalance workload or postpone low-priority items.");
    }

    let _ = writeln!(output, "\nEnd of report.");
    output
}

pub fn director_snapshot(records: &[IssueRecord], today: NaiveDate) -> String {
    let blockers = by_level(records, AlertLevel::Critical).len();
    let stalled = by_level(records, AlertLevel::Warning).len();
    let unassigned = unassigned_high(records).len();

    let assessment = if blockers > 0 {
        "HIGH RISK: blocker resolution required immediately."
    } else if stalled > 0 {
        "MODERATE RISK: monitor stalled work closely."
    } else {
        "LOW RISK: sprint progressing normally."
    };

    let mut output = String::new();
    let _ = writeln!(output, "Director-Level Sprint Snapshot");
    let _ = writeln!(output, "==============================");
    let _ = writeln!(output);
    let _ = writeln!(output, "Date: {today}");
    let _ = writeln!(output);
    let _ = writeln!(output, "Critical Blockers: {blockers}");
    let _ = writeln!(output, "Stalled Items: {stalled}");
    let _ = writeln!(output, "Unassigned High Priority Items: {unassigned}");
    let _ = writeln!(output);
    let _ = writeln!(output, "Overall Assessment:");
    let _ = writeln!(output, "-------------------");
    let _ = writeln!(output, "{assessment}");
    output
}

/// Team, manager and director sections in one body.
pub fn insights_digest(records: &[IssueRecord], today: NaiveDate) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "TEAM STANDUP SUMMARY\n");
    let _ = writeln!(output, "{}", team_standup_summary(records, today));
    let _ = writeln!(output, "\nPRIVATE MANAGER INSIGHTS\n");
    let _ = writeln!(output, "{}", manager_report(records, today));
    let _ = writeln!(output, "\nDIRECTOR SNAPSHOT\n");
    let _ = write!(output, "{}", director_snapshot(records, today));
    output
}
