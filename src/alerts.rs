use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::channels::{Destination, WEBHOOK_TIMEOUT};
use crate::config::AlertSettings;
use crate::error::DestinationError;
use crate::models::{AlertLevel, IssueRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub destination: String,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingReport {
    pub critical: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl RoutingReport {
    pub fn no_alerts_sent(&self) -> bool {
        !self
            .outcomes
            .iter()
            .any(|outcome| outcome.status == DeliveryStatus::Sent)
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, DeliveryStatus::Failed(_)))
            .count()
    }
}

/// A destination entry as configured: its name and the decoded channel.
#[derive(Debug, Clone)]
pub struct NamedDestination {
    pub name: String,
    pub destination: Destination,
}

/// Sends critical findings to every enabled destination. One destination
/// failing never stops the others.
#[derive(Debug)]
pub struct AlertRouter {
    client: reqwest::Client,
    destinations: Vec<NamedDestination>,
    rejected: Vec<DeliveryOutcome>,
}

impl AlertRouter {
    /// Entry keys name a destination; the type tag is the entry's `type`
    /// field, or the key itself when absent.
    pub fn from_settings(settings: &AlertSettings) -> anyhow::Result<Self> {
        let mut destinations = Vec::new();
        let mut rejected = Vec::new();

        for (name, entry) in &settings.destinations {
            if !entry.get("enabled").and_then(Value::as_bool).unwrap_or(false) {
                debug!(destination = %name, "destination disabled");
                continue;
            }

            let kind = entry.get("type").and_then(Value::as_str).unwrap_or(name);
            match Destination::decode(kind, entry) {
                Ok(Some(destination)) => destinations.push(NamedDestination {
                    name: name.clone(),
                    destination,
                }),
                Ok(None) => warn!(destination = %name, kind, "unknown destination type, skipping"),
                Err(err) => {
                    warn!(destination = %name, error = %err, "destination settings rejected");
                    rejected.push(DeliveryOutcome {
                        destination: name.clone(),
                        status: DeliveryStatus::Failed(err.to_string()),
                    });
                }
            }
        }

        Ok(Self {
            client: reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?,
            destinations,
            rejected,
        })
    }

    #[cfg(test)]
    pub fn with_destinations(destinations: Vec<NamedDestination>) -> Self {
        Self {
            client: reqwest::Client::new(),
            destinations,
            rejected: Vec::new(),
        }
    }

    pub async fn route(&self, records: &[IssueRecord]) -> RoutingReport {
        let critical: Vec<IssueRecord> = records
            .iter()
            .filter(|record| record.alert_level == AlertLevel::Critical)
            .cloned()
            .collect();

        if critical.is_empty() {
            info!("no critical issues, no alerts sent");
            return RoutingReport::default();
        }

        info!(count = critical.len(), "sending alerts for critical issues");
        let mut report = RoutingReport {
            critical: critical.len(),
            outcomes: self.rejected.clone(),
        };

        for named in &self.destinations {
            if !named.destination.enabled() {
                continue;
            }
            let status = match named.destination.dispatch(&self.client, &critical).await {
                Ok(()) => {
                    info!(destination = %named.name, kind = named.destination.kind(), "alert delivered");
                    DeliveryStatus::Sent
                }
                Err(DestinationError::MissingField(field)) => {
                    warn!(destination = %named.name, field, "destination incomplete, skipping");
                    DeliveryStatus::Skipped(format!("missing `{field}`"))
                }
                Err(err) => {
                    error!(destination = %named.name, error = %err, "alert delivery failed");
                    DeliveryStatus::Failed(err.to_string())
                }
            };
            report.outcomes.push(DeliveryOutcome {
                destination: named.name.clone(),
                status,
            });
        }

        report
    }
}
