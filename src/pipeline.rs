use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::alerts::{AlertRouter, RoutingReport};
use crate::config::Settings;
use crate::health;
use crate::models::{IssueRecord, KpiBundle, QueryType, RawIssue, WorkloadEntry};
use crate::normalize::Normalizer;
use crate::records::{record_file_path, write_records};
use crate::source::SourceAdapter;
use crate::workload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Fetching,
    Normalizing,
    Scoring,
    Routing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Fetching => "fetching",
            Stage::Normalizing => "normalizing",
            Stage::Scoring => "scoring",
            Stage::Routing => "routing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub record_file: PathBuf,
    pub records: Vec<IssueRecord>,
    pub health_score: i64,
    pub kpis: KpiBundle,
    pub workload: Vec<WorkloadEntry>,
    pub routing: Option<RoutingReport>,
}

/// One fetch → normalize → score → route pass. Holds no state between runs.
pub struct Pipeline<'a> {
    settings: &'a Settings,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            stage: Stage::Idle,
        }
    }

    #[cfg(test)]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage) {
        info!(from = %self.stage, to = %stage, "pipeline stage");
        self.stage = stage;
    }

    /// Fatal errors (settings, source, record file) stop the run before the
    /// next stage. Alert delivery failures are reported in the summary.
    pub async fn run(&mut self, out_dir: &Path, route_alerts: bool) -> anyhow::Result<RunSummary> {
        self.enter(Stage::Fetching);
        let source = SourceAdapter::connect(self.settings).await?;
        let mut fetched: Vec<(QueryType, Vec<RawIssue>)> = Vec::with_capacity(QueryType::ALL.len());
        for category in QueryType::ALL {
            let issues = source.fetch(category).await?;
            info!(%category, count = issues.len(), "fetched category");
            fetched.push((category, issues));
        }

        self.enter(Stage::Normalizing);
        let normalizer = Normalizer::new(&self.settings.jira.story_points_field);
        let records: Vec<IssueRecord> = fetched
            .iter()
            .flat_map(|(category, issues)| normalizer.normalize_all(*category, issues))
            .collect();
        let record_file = record_file_path(out_dir, self.settings.mode, Local::now());
        write_records(&record_file, &records)?;
        info!(path = %record_file.display(), rows = records.len(), "record file written");

        self.enter(Stage::Scoring);
        let health_score = health::health_score(&records);
        let kpis = health::compute_kpis(&records);
        let workload = workload::summarize_workload(&records);

        let routing = if route_alerts && self.settings.alerts.enabled {
            self.enter(Stage::Routing);
            let router = AlertRouter::from_settings(&self.settings.alerts)?;
            Some(router.route(&records).await)
        } else {
            info!("alert routing disabled");
            None
        };

        self.enter(Stage::Done);
        Ok(RunSummary {
            record_file,
            records,
            health_score,
            kpis,
            workload,
            routing,
        })
    }
}
