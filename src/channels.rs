//! Notification destinations and their payload shapes.

use std::time::Duration;

use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::DestinationError;
use crate::models::IssueRecord;

pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// MessageCard theme color for critical findings.
pub const CRITICAL_THEME_COLOR: &str = "D70000";

const DEFAULT_SUBJECT_PREFIX: &str = "[SPRINT ALERT]";

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub webhook_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub webhook_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    pub smtp_server: Option<String>,
    pub smtp_port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_addresses: Vec<String>,
    pub subject_prefix: Option<String>,
}

/// A configured channel, selected by its type tag.
#[derive(Debug, Clone)]
pub enum Destination {
    Slack(SlackConfig),
    Teams(TeamsConfig),
    Email(EmailConfig),
}

impl Destination {
    /// Decodes one settings entry. Unknown type tags yield `None`.
    pub fn decode(kind: &str, entry: &Value) -> Result<Option<Self>, DestinationError> {
        let destination = match kind {
            "slack" => Destination::Slack(serde_json::from_value(entry.clone())?),
            "teams" => Destination::Teams(serde_json::from_value(entry.clone())?),
            "email" => Destination::Email(serde_json::from_value(entry.clone())?),
            _ => return Ok(None),
        };
        Ok(Some(destination))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Destination::Slack(_) => "slack",
            Destination::Teams(_) => "teams",
            Destination::Email(_) => "email",
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            Destination::Slack(config) => config.enabled,
            Destination::Teams(config) => config.enabled,
            Destination::Email(config) => config.enabled,
        }
    }

    pub async fn dispatch(
        &self,
        client: &reqwest::Client,
        critical: &[IssueRecord],
    ) -> Result<(), DestinationError> {
        match self {
            Destination::Slack(config) => {
                post_webhook(client, &config.webhook_url, &slack_payload(critical)).await
            }
            Destination::Teams(config) => {
                post_webhook(client, &config.webhook_url, &teams_payload(critical)).await
            }
            Destination::Email(config) => {
                let subject = format!(
                    "{} Critical blockers detected",
                    config
                        .subject_prefix
                        .as_deref()
                        .unwrap_or(DEFAULT_SUBJECT_PREFIX)
                );
                config.send(&subject, email_body(critical), None).await
            }
        }
    }
}

fn issue_line(issue: &IssueRecord) -> String {
    format!("{} — {} ({})", issue.issue_key, issue.summary, issue.assignee)
}

pub fn slack_payload(critical: &[IssueRecord]) -> Value {
    let mut text = format!("{} Sprint Blockers Detected\n", critical.len());
    for issue in critical {
        text.push_str("• ");
        text.push_str(&issue_line(issue));
        text.push('\n');
    }
    json!({ "text": text })
}

pub fn teams_payload(critical: &[IssueRecord]) -> Value {
    let body = critical
        .iter()
        .map(|issue| escape_html(&issue_line(issue)))
        .collect::<Vec<_>>()
        .join("<br>");

    json!({
        "@type": "MessageCard",
        "@context": "https://schema.org/extensions",
        "themeColor": CRITICAL_THEME_COLOR,
        "summary": format!("{} sprint blockers detected", critical.len()),
        "title": "Sprint Blockers Detected",
        "sections": [{
            "activityTitle": format!("{} critical issues need attention", critical.len()),
            "activitySubtitle": "Escalate within 24h",
            "text": body,
        }],
    })
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn email_body(critical: &[IssueRecord]) -> String {
    let mut body = String::from("CRITICAL BLOCKERS:\n\n");
    for issue in critical {
        body.push_str(&format!(
            "{} — {}\n  Assignee: {}\n  Priority: {}\n  Last updated: {}\n\n",
            issue.issue_key,
            issue.summary,
            issue.assignee,
            issue.priority.as_deref().unwrap_or("None"),
            issue.last_updated_label(),
        ));
    }
    body
}

async fn post_webhook(
    client: &reqwest::Client,
    url: &str,
    payload: &Value,
) -> Result<(), DestinationError> {
    if url.trim().is_empty() {
        return Err(DestinationError::MissingField("webhook_url"));
    }

    let response = client
        .post(url)
        .timeout(WEBHOOK_TIMEOUT)
        .json(payload)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DestinationError::Status(status.as_u16()));
    }
    Ok(())
}

/// Email settings with every required field present.
struct SmtpTarget<'a> {
    server: &'a str,
    port: u16,
    username: &'a str,
    password: &'a str,
    from: &'a str,
    to: &'a [String],
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, DestinationError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(DestinationError::MissingField(field))
}

fn address(raw: &str) -> Result<Address, DestinationError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|source| DestinationError::Address {
            address: raw.to_string(),
            source,
        })
}

impl EmailConfig {
    fn target(&self) -> Result<SmtpTarget<'_>, DestinationError> {
        let target = SmtpTarget {
            server: required(&self.smtp_server, "smtp_server")?,
            port: self.smtp_port.ok_or(DestinationError::MissingField("smtp_port"))?,
            username: required(&self.username, "username")?,
            password: required(&self.password, "password")?,
            from: required(&self.from_address, "from_address")?,
            to: &self.to_addresses,
        };
        if target.to.iter().all(|to| to.trim().is_empty()) {
            return Err(DestinationError::MissingField("to_addresses"));
        }
        Ok(target)
    }

    pub fn build_message(
        &self,
        subject: &str,
        body: String,
        sender_name: Option<&str>,
    ) -> Result<Message, DestinationError> {
        let target = self.target()?;
        let from = Mailbox::new(sender_name.map(str::to_string), address(target.from)?);

        let mut builder = Message::builder().from(from).subject(subject);
        for to in target.to.iter().filter(|to| !to.trim().is_empty()) {
            builder = builder.to(Mailbox::new(None, address(to)?));
        }

        Ok(builder.multipart(MultiPart::mixed().singlepart(SinglePart::plain(body)))?)
    }

    /// Sends a plain-text message over an authenticated STARTTLS session.
    pub async fn send(
        &self,
        subject: &str,
        body: String,
        sender_name: Option<&str>,
    ) -> Result<(), DestinationError> {
        let message = self.build_message(subject, body, sender_name)?;
        let target = self.target()?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(target.server)?
            .port(target.port)
            .credentials(Credentials::new(
                target.username.to_string(),
                target.password.to_string(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        transport.send(message).await?;
        info!(server = target.server, recipients = target.to.len(), "email sent");
        Ok(())
    }
}
