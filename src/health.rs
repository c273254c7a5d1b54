use crate::models::{AlertLevel, IssueRecord, KpiBundle, StatusFlow};

pub const MAX_SCORE: i64 = 100;
pub const MIN_SCORE: i64 = 5;

const CRITICAL_PENALTY: i64 = 25;
const WARNING_PENALTY: i64 = 10;
const UNASSIGNED_HIGH_PENALTY: i64 = 5;

const DELIVERY_TARGET_PCT: f64 = 80.0;
const CARRYOVER_RATIO: f64 = 0.4;

const FLOW_ORDER: [&str; 4] = ["To Do", "In Progress", "Blocked", "Done"];

/// Alert-level tallies the score is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelCounts {
    pub critical: usize,
    pub warning: usize,
    pub unassigned_high: usize,
}

impl LevelCounts {
    pub fn from_records(records: &[IssueRecord]) -> Self {
        let mut counts = LevelCounts::default();
        for record in records {
            match record.alert_level {
                AlertLevel::Critical => counts.critical += 1,
                AlertLevel::Warning => counts.warning += 1,
                AlertLevel::High if record.is_unassigned() => counts.unassigned_high += 1,
                AlertLevel::High | AlertLevel::Done => {}
            }
        }
        counts
    }
}

/// Sprint health in `[MIN_SCORE, MAX_SCORE]`.
pub fn health_score(records: &[IssueRecord]) -> i64 {
    score_counts(LevelCounts::from_records(records))
}

pub fn score_counts(counts: LevelCounts) -> i64 {
    let penalty = CRITICAL_PENALTY * counts.critical as i64
        + WARNING_PENALTY * counts.warning as i64
        + UNASSIGNED_HIGH_PENALTY * counts.unassigned_high as i64;
    (MAX_SCORE - penalty).max(MIN_SCORE)
}

/// Story point total, saturating at `u32::MAX`.
pub fn total_points<'a>(records: impl IntoIterator<Item = &'a IssueRecord>) -> u32 {
    records
        .into_iter()
        .fold(0u32, |total, r| total.saturating_add(r.story_points))
}

fn is_status(record: &IssueRecord, status: &str) -> bool {
    record.status.trim().eq_ignore_ascii_case(status)
}

/// Delivery KPIs with risk and recommendation lines. Works from status
/// names, not alert levels, so it reflects where work actually sits.
pub fn compute_kpis(records: &[IssueRecord]) -> KpiBundle {
    let committed = total_points(records);
    let completed = total_points(records.iter().filter(|r| is_status(r, "Done")));

    let blockers = records.iter().filter(|r| is_status(r, "Blocked")).count();
    let stalled = records
        .iter()
        .filter(|r| is_status(r, "In Progress") && r.alert_level == AlertLevel::Warning)
        .count();
    let unassigned = records.iter().filter(|r| r.is_unassigned()).count();

    kpis_from_totals(committed, completed, blockers, stalled, unassigned)
}

pub fn kpis_from_totals(
    committed: u32,
    completed: u32,
    blockers: usize,
    stalled: usize,
    unassigned: usize,
) -> KpiBundle {
    let delivery_pct = if committed == 0 {
        0.0
    } else {
        (completed as f64 / committed as f64 * 1000.0).round() / 10.0
    };
    let carryover = committed.saturating_sub(completed);

    let mut risks = Vec::new();
    if blockers > 0 {
        risks.push(format!("{blockers} blockers are impacting throughput."));
    }
    if stalled > 0 {
        risks.push(format!("{stalled} items show prolonged inactivity."));
    }
    if unassigned > 0 {
        risks.push("Unassigned high-priority work is delaying flow.".to_string());
    }
    if carryover as f64 > committed as f64 * CARRYOVER_RATIO {
        risks.push(format!("{carryover} SP likely rolling to next sprint."));
    }
    if risks.is_empty() {
        risks.push("No major risks detected.".to_string());
    }

    let mut recommendations = Vec::new();
    if blockers > 0 {
        recommendations.push("Escalate dependency blockers within 24h.".to_string());
    }
    if stalled > 0 {
        recommendations.push("Introduce aged-WIP triage at daily standup.".to_string());
    }
    if unassigned > 0 {
        recommendations.push("Prevent unassigned high-priority items entering sprint.".to_string());
    }
    if delivery_pct < DELIVERY_TARGET_PCT {
        recommendations.push("Reduce WIP or slice stories smaller next sprint.".to_string());
    }
    if recommendations.is_empty() {
        recommendations.push("Flow appears stable, maintain current practices.".to_string());
    }

    KpiBundle {
        committed,
        completed,
        delivery_pct,
        carryover,
        risks,
        recommendations,
    }
}

/// Issue count and story points per status, in board order.
pub fn status_flow(records: &[IssueRecord]) -> Vec<StatusFlow> {
    FLOW_ORDER
        .into_iter()
        .map(|status| {
            let matching = records.iter().filter(|r| is_status(r, status));
            StatusFlow {
                status,
                count: matching.clone().count(),
                story_points: total_points(matching),
            }
        })
        .collect()
}
