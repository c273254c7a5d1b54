use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod alerts;
mod channels;
mod config;
mod error;
mod health;
mod models;
mod normalize;
mod pipeline;
mod records;
mod report;
mod source;
mod workload;

use crate::alerts::{AlertRouter, DeliveryStatus, RoutingReport};
use crate::channels::Destination;
use crate::config::Settings;
use crate::models::{KpiBundle, WorkloadEntry};

#[derive(Parser)]
#[command(name = "sprint-health")]
#[command(about = "Sprint health checks, insights and blocker alerts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, normalize, score and route alerts for the current sprint
    Run {
        #[arg(long, default_value = "settings.json")]
        config: PathBuf,
        #[arg(long, default_value = "reports")]
        out_dir: PathBuf,
        /// Skip alert routing even when alerts are enabled
        #[arg(long)]
        no_alerts: bool,
    },
    /// Score an existing record file
    Score {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Route critical issues from an existing record file
    Alert {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "settings.json")]
        config: PathBuf,
    },
    /// Build the team, manager and director insights digest
    Insights {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Send the digest through the configured email destination
        #[arg(long)]
        email: bool,
        #[arg(long, default_value = "settings.json")]
        config: PathBuf,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            out_dir,
            no_alerts,
        } => {
            let settings = load_settings(&config)?;
            let summary = pipeline::Pipeline::new(&settings)
                .run(&out_dir, !no_alerts)
                .await
                .context("sprint health run failed")?;

            println!("Record file written to {}.", summary.record_file.display());
            println!("\nDAILY ANALYSIS:\n");
            println!("{}", report::daily_analysis(&summary.records));
            print_scores(summary.health_score, &summary.kpis, &summary.workload);
            if let Some(routing) = &summary.routing {
                print_routing(routing);
            }
        }
        Commands::Score { csv } => {
            let records = records::read_records(&csv)
                .with_context(|| format!("failed to read {}", csv.display()))?;
            print_scores(
                health::health_score(&records),
                &health::compute_kpis(&records),
                &workload::summarize_workload(&records),
            );

            println!("\nStatus flow:");
            for flow in health::status_flow(&records) {
                println!(
                    "- {}: {} issues, {} SP",
                    flow.status, flow.count, flow.story_points
                );
            }
        }
        Commands::Alert { csv, config } => {
            let settings = load_settings(&config)?;
            if !settings.alerts.enabled {
                println!("Alerts are disabled in {}.", config.display());
                return Ok(());
            }
            let critical = records::read_critical(&csv)?;
            let router = AlertRouter::from_settings(&settings.alerts)?;
            print_routing(&router.route(&critical).await);
        }
        Commands::Insights {
            csv,
            out,
            email,
            config,
        } => {
            let records = records::read_records(&csv)
                .with_context(|| format!("failed to read {}", csv.display()))?;
            let digest = report::insights_digest(&records, Local::now().date_naive());

            match &out {
                Some(path) => {
                    std::fs::write(path, &digest)?;
                    println!("Insights digest written to {}.", path.display());
                }
                None => println!("{digest}"),
            }

            if email {
                let settings = load_settings(&config)?;
                send_digest(&settings, digest).await?;
            }
        }
    }

    Ok(())
}

fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    Settings::load(path).with_context(|| format!("invalid settings in {}", path.display()))
}

async fn send_digest(settings: &Settings, digest: String) -> anyhow::Result<()> {
    let entry = settings
        .alerts
        .destinations
        .get("email")
        .context("no email destination configured")?;
    let Some(Destination::Email(email)) = Destination::decode("email", entry)? else {
        anyhow::bail!("email destination could not be decoded");
    };

    email
        .send(
            "Daily Engineering Insights Report",
            digest,
            Some("Engineering Insights Service"),
        )
        .await
        .context("failed to send insights digest")?;
    println!("Insights digest emailed.");
    Ok(())
}

fn print_scores(health_score: i64, kpis: &KpiBundle, workload: &[WorkloadEntry]) {
    println!("Sprint health score: {health_score}/100");
    println!(
        "Committed {} SP, completed {} SP ({:.1}% delivered), carryover {} SP",
        kpis.committed, kpis.completed, kpis.delivery_pct, kpis.carryover
    );

    println!("\nRisks:");
    for risk in &kpis.risks {
        println!("- {risk}");
    }
    println!("\nRecommendations:");
    for rec in &kpis.recommendations {
        println!("- {rec}");
    }

    println!("\nWorkload:");
    for entry in workload {
        let flag = if entry.overloaded { " (potential overload)" } else { "" };
        println!("- {}: {} SP{flag}", entry.assignee, entry.story_points);
    }
}

fn print_routing(routing: &RoutingReport) {
    if routing.critical == 0 {
        println!("No critical alerts to send.");
        return;
    }

    println!("\nAlerts for {} critical issues:", routing.critical);
    for outcome in &routing.outcomes {
        match &outcome.status {
            DeliveryStatus::Sent => println!("- {}: sent", outcome.destination),
            DeliveryStatus::Skipped(reason) => {
                println!("- {}: skipped ({reason})", outcome.destination)
            }
            DeliveryStatus::Failed(reason) => {
                warn!(destination = %outcome.destination, "alert not delivered");
                println!("- {}: failed ({reason})", outcome.destination)
            }
        }
    }
    if routing.no_alerts_sent() {
        println!("No alerts sent.");
    } else if routing.failures() > 0 {
        println!("{} destination(s) failed, see log for details.", routing.failures());
    }
}
