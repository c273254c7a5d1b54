use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

pub const TOKEN_ENV: &str = "JIRA_API_TOKEN";

const DEFAULT_STORY_POINTS_FIELD: &str = "customfield_10016";

/// Run settings, loaded once and passed by reference to each component.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub mode: Mode,
    #[serde(default)]
    pub jira: JiraSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Mock,
    Live,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Mock => "MOCK",
            Mode::Live => "LIVE",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub project_key: String,
    #[serde(default)]
    pub board_id: Option<u64>,
    #[serde(default)]
    pub sprint_id: Option<SprintSelector>,
    #[serde(default = "default_story_points_field")]
    pub story_points_field: String,
}

impl Default for JiraSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            email: String::new(),
            token: String::new(),
            project_key: String::new(),
            board_id: None,
            sprint_id: None,
            story_points_field: default_story_points_field(),
        }
    }
}

impl JiraSettings {
    pub fn sprint(&self) -> SprintSelector {
        self.sprint_id.unwrap_or(SprintSelector::Auto)
    }

    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

fn default_story_points_field() -> String {
    DEFAULT_STORY_POINTS_FIELD.to_string()
}

/// Which sprint the live source queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSprintId")]
pub enum SprintSelector {
    Auto,
    Id(u64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSprintId {
    Number(u64),
    Text(String),
}

impl TryFrom<RawSprintId> for SprintSelector {
    type Error = String;

    fn try_from(value: RawSprintId) -> Result<Self, Self::Error> {
        match value {
            RawSprintId::Number(id) => Ok(SprintSelector::Id(id)),
            RawSprintId::Text(text) if text.eq_ignore_ascii_case("auto") => {
                Ok(SprintSelector::Auto)
            }
            RawSprintId::Text(text) => text
                .trim()
                .parse()
                .map(SprintSelector::Id)
                .map_err(|_| format!("sprint_id must be a number or \"auto\", got {text:?}")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Destination entries keyed by type tag, in file order. Decoded per
    /// variant at routing time.
    #[serde(default)]
    pub destinations: serde_json::Map<String, serde_json::Value>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Settings = serde_json::from_str(&raw)?;
        if settings.jira.token.is_empty() {
            if let Ok(token) = std::env::var(TOKEN_ENV) {
                settings.jira.token = token;
            }
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jira.story_points_field.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "jira.story_points_field",
                reason: "must not be empty".to_string(),
            });
        }

        if self.mode == Mode::Mock {
            return Ok(());
        }

        let required = [
            ("jira.url", &self.jira.url),
            ("jira.email", &self.jira.email),
            ("jira.token", &self.jira.token),
            ("jira.project_key", &self.jira.project_key),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(key));
            }
        }

        if !self.jira.url.starts_with("http://") && !self.jira.url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "jira.url",
                reason: format!("expected an http(s) URL, got {:?}", self.jira.url),
            });
        }

        if self.jira.sprint() == SprintSelector::Auto && self.jira.board_id.is_none() {
            return Err(ConfigError::Missing("jira.board_id"));
        }

        Ok(())
    }
}
