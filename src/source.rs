use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use tracing::{debug, info};

use crate::config::{JiraSettings, Mode, Settings, SprintSelector};
use crate::error::{ConfigError, SourceError};
use crate::models::{
    QueryType, RawFields, RawIssue, RawNamed, RawUser, SearchResponse, SprintListResponse,
};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RESULTS: u32 = 100;
const STALLED_AFTER: &str = "-2d";

/// Where raw issues come from for one run.
#[derive(Debug)]
pub enum SourceAdapter {
    Mock(MockSource),
    Live(LiveSource),
}

impl SourceAdapter {
    /// Builds the adapter for the configured mode. Live mode resolves the
    /// sprint up front so that a missing active sprint aborts before any
    /// category is fetched.
    pub async fn connect(settings: &Settings) -> anyhow::Result<Self> {
        match settings.mode {
            Mode::Mock => Ok(SourceAdapter::Mock(MockSource::new(
                &settings.jira.story_points_field,
            ))),
            Mode::Live => Ok(SourceAdapter::Live(LiveSource::connect(&settings.jira).await?)),
        }
    }

    pub async fn fetch(&self, category: QueryType) -> Result<Vec<RawIssue>, SourceError> {
        match self {
            SourceAdapter::Mock(source) => Ok(source.fetch(category)),
            SourceAdapter::Live(source) => source.fetch(category).await,
        }
    }
}

/// Hand-authored fixtures, dated relative to `now`.
#[derive(Debug, Clone)]
pub struct MockSource {
    now: DateTime<Utc>,
    story_points_field: String,
}

impl MockSource {
    pub fn new(story_points_field: &str) -> Self {
        Self::at(Utc::now(), story_points_field)
    }

    pub fn at(now: DateTime<Utc>, story_points_field: &str) -> Self {
        Self {
            now,
            story_points_field: story_points_field.to_string(),
        }
    }

    pub fn fetch(&self, category: QueryType) -> Vec<RawIssue> {
        match category {
            QueryType::Blockers => vec![
                self.issue(
                    "GK-124",
                    "POS integration blocked by payment gateway timeout",
                    "Blocked",
                    Some("Alice Smith"),
                    "Highest",
                    2,
                    5,
                ),
                self.issue(
                    "GK-131",
                    "Hotel booking API rate limited by external provider",
                    "Blocked",
                    Some("Bob Jones"),
                    "High",
                    1,
                    2,
                ),
            ],
            QueryType::Stalled => vec![
                self.issue(
                    "GK-115",
                    "Update menu pricing across pub chain",
                    "In Progress",
                    Some("Charlie Brown"),
                    "Medium",
                    4,
                    3,
                ),
                self.issue(
                    "GK-119",
                    "Refactor loyalty points calculation",
                    "In Progress",
                    Some("Diana Prince"),
                    "Medium",
                    6,
                    3,
                ),
            ],
            QueryType::Unassigned => vec![self.issue(
                "GK-130",
                "URGENT: Fix production bug in table ordering app",
                "To Do",
                None,
                "Highest",
                0,
                3,
            )],
            QueryType::Done => vec![
                self.issue(
                    "GK-101",
                    "Migrate legacy reports to new BI platform",
                    "Done",
                    Some("Alice Smith"),
                    "Medium",
                    1,
                    5,
                ),
                self.issue(
                    "GK-109",
                    "Fix table ordering crash on Android",
                    "Done",
                    Some("Bob Jones"),
                    "High",
                    2,
                    3,
                ),
                self.issue(
                    "GK-113",
                    "Improve menu recommendation algorithm",
                    "Done",
                    Some("Diana Prince"),
                    "Medium",
                    3,
                    8,
                ),
            ],
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn issue(
        &self,
        key: &str,
        summary: &str,
        status: &str,
        assignee: Option<&str>,
        priority: &str,
        days_ago: i64,
        story_points: u32,
    ) -> RawIssue {
        let mut custom = serde_json::Map::new();
        custom.insert(self.story_points_field.clone(), json!(story_points));

        RawIssue {
            key: key.to_string(),
            fields: RawFields {
                summary: Some(summary.to_string()),
                status: Some(RawNamed {
                    name: status.to_string(),
                }),
                assignee: assignee.map(|name| RawUser {
                    display_name: name.to_string(),
                }),
                priority: Some(RawNamed {
                    name: priority.to_string(),
                }),
                updated: Some((self.now - ChronoDuration::days(days_ago)).to_rfc3339()),
                custom,
            },
        }
    }
}

/// Search-endpoint client scoped to one project and one sprint.
#[derive(Debug)]
pub struct LiveSource {
    client: reqwest::Client,
    base_url: String,
    email: String,
    token: String,
    project_key: String,
    story_points_field: String,
    sprint_id: u64,
}

impl LiveSource {
    pub async fn connect(jira: &JiraSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()?;

        let mut source = Self {
            client,
            base_url: jira.base_url().to_string(),
            email: jira.email.clone(),
            token: jira.token.clone(),
            project_key: jira.project_key.clone(),
            story_points_field: jira.story_points_field.clone(),
            sprint_id: 0,
        };

        source.sprint_id = match jira.sprint() {
            SprintSelector::Id(id) => id,
            SprintSelector::Auto => {
                let board_id = jira.board_id.ok_or(ConfigError::Missing("jira.board_id"))?;
                source.active_sprint(board_id).await?
            }
        };
        info!(sprint_id = source.sprint_id, "using sprint");

        Ok(source)
    }

    #[cfg(test)]
    pub fn sprint_id(&self) -> u64 {
        self.sprint_id
    }

    async fn active_sprint(&self, board_id: u64) -> Result<u64, SourceError> {
        let url = format!("{}/rest/agile/1.0/board/{board_id}/sprint", self.base_url);
        let request = self.client.get(&url).query(&[("state", "active")]);
        let sprints: SprintListResponse = self.send(&url, request).await?;

        let sprint = sprints
            .values
            .first()
            .ok_or(SourceError::NoActiveSprint(board_id))?;
        debug!(board_id, sprint_id = sprint.id, name = ?sprint.name, "detected active sprint");
        Ok(sprint.id)
    }

    pub fn jql(&self, category: QueryType) -> String {
        let scope = format!("project = {} AND sprint = {}", self.project_key, self.sprint_id);
        match category {
            QueryType::Blockers => format!("{scope} AND status = \"Blocked\""),
            QueryType::Stalled => {
                format!("{scope} AND status = \"In Progress\" AND updated <= {STALLED_AFTER}")
            }
            QueryType::Unassigned => {
                format!("{scope} AND assignee is EMPTY AND priority in (High, Highest)")
            }
            QueryType::Done => format!("{scope} AND status = Done"),
        }
    }

    pub async fn fetch(&self, category: QueryType) -> Result<Vec<RawIssue>, SourceError> {
        let url = format!("{}/rest/api/3/search", self.base_url);
        let fields = format!(
            "summary,status,assignee,priority,updated,{}",
            self.story_points_field
        );
        let max_results = MAX_RESULTS.to_string();
        let jql = self.jql(category);
        let request = self.client.get(&url).query(&[
            ("jql", jql.as_str()),
            ("maxResults", max_results.as_str()),
            ("fields", fields.as_str()),
        ]);

        let response: SearchResponse = self.send(&url, request).await?;
        debug!(%category, count = response.issues.len(), "fetched issues");
        Ok(response.issues)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SourceError> {
        let response = request
            .basic_auth(&self.email, Some(&self.token))
            .send()
            .await
            .map_err(|source| SourceError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|source| SourceError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn jira(url: &str, sprint_id: Option<SprintSelector>) -> JiraSettings {
        JiraSettings {
            url: url.to_string(),
            email: "bot@example.com".to_string(),
            token: "secret".to_string(),
            project_key: "GK".to_string(),
            board_id: Some(7),
            sprint_id,
            story_points_field: "customfield_10016".to_string(),
        }
    }

    #[test]
    fn mock_fixtures_cover_every_category() {
        let source = MockSource::new("customfield_10016");
        let counts: Vec<usize> = QueryType::ALL
            .iter()
            .map(|category| source.fetch(*category).len())
            .collect();
        assert_eq!(counts, vec![2, 2, 1, 3]);
    }

    #[test]
    fn mock_dates_follow_now() {
        let now = Utc::now();
        let source = MockSource::at(now, "sp");
        let stalled = source.fetch(QueryType::Stalled);
        let updated = stalled[1].fields.updated.clone().unwrap();
        let expected = (now - ChronoDuration::days(6)).date_naive().to_string();
        assert_eq!(&updated[..10], expected);
        assert_eq!(stalled[1].fields.custom["sp"], json!(3));
    }

    #[test]
    fn mock_unassigned_fixture_has_no_owner() {
        let source = MockSource::new("sp");
        let issues = source.fetch(QueryType::Unassigned);
        assert!(issues[0].fields.assignee.is_none());
    }

    #[tokio::test]
    async fn detects_active_sprint_and_scopes_queries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/agile/1.0/board/7/sprint"))
            .and(query_param("state", "active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [{"id": 55, "name": "Sprint 12"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/search"))
            .and(query_param(
                "jql",
                "project = GK AND sprint = 55 AND status = \"Blocked\"",
            ))
            .and(query_param("maxResults", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issues": [{
                    "key": "GK-9",
                    "fields": {
                        "summary": "Stuck",
                        "status": {"name": "Blocked"},
                        "assignee": null,
                        "priority": {"name": "High"},
                        "updated": "2026-10-01T09:00:00.000+0000",
                        "customfield_10016": 5
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = LiveSource::connect(&jira(&server.uri(), None)).await.unwrap();
        assert_eq!(source.sprint_id(), 55);

        let issues = source.fetch(QueryType::Blockers).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key, "GK-9");
    }

    #[tokio::test]
    async fn no_active_sprint_is_a_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/agile/1.0/board/7/sprint"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": []})))
            .mount(&server)
            .await;

        let err = LiveSource::connect(&jira(&server.uri(), None))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::NoActiveSprint(7))
        ));
    }

    #[tokio::test]
    async fn non_success_search_is_a_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/search"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let source = LiveSource::connect(&jira(&server.uri(), Some(SprintSelector::Id(3))))
            .await
            .unwrap();
        let err = source.fetch(QueryType::Done).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 401, .. }));
    }

    #[test]
    fn jql_matches_category_semantics() {
        let source = LiveSource {
            client: reqwest::Client::new(),
            base_url: String::new(),
            email: String::new(),
            token: String::new(),
            project_key: "GK".to_string(),
            story_points_field: "sp".to_string(),
            sprint_id: 9,
        };
        assert_eq!(
            source.jql(QueryType::Stalled),
            "project = GK AND sprint = 9 AND status = \"In Progress\" AND updated <= -2d"
        );
        assert_eq!(
            source.jql(QueryType::Unassigned),
            "project = GK AND sprint = 9 AND assignee is EMPTY AND priority in (High, Highest)"
        );
    }
}
