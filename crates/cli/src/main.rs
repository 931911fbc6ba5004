//! Incident Triage CLI
//!
//! A command-line tool for scoring and classifying signals offline,
//! submitting signal batches to the triage agent, and checking its health.

mod client;
mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, signals};
use rust_decimal::Decimal;
use triage_lib::config::DEFAULT_RISK_THRESHOLD;

/// Incident Triage CLI
#[derive(Parser)]
#[command(name = "triage")]
#[command(author, version, about = "CLI for the Incident Triage engine", long_about = None)]
pub struct Cli {
    /// Agent endpoint URL (can also be set via TRIAGE_API_URL env var)
    #[arg(long, env = "TRIAGE_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute a risk score locally
    Score {
        /// Observed latency in milliseconds
        #[arg(long)]
        latency_ms: Option<f64>,

        /// Observed error rate in percent
        #[arg(long)]
        error_rate_pct: Option<f64>,

        /// DNS resolution anomaly observed
        #[arg(long)]
        nxdomain: bool,

        /// Risk threshold to compare against
        #[arg(long, default_value_t = DEFAULT_RISK_THRESHOLD)]
        threshold: Decimal,
    },

    /// Show which remediation a resource identifier maps to
    Classify {
        /// Resource identifier (e.g. i-0a1b2c3d or ecs-service/<cluster>/<service>)
        resource_id: String,
    },

    /// Submit a JSON file with one event or an array of events to the agent
    Submit {
        /// Path to the JSON invocation file
        file: PathBuf,
    },

    /// Show agent component health and readiness
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            latency_ms,
            error_rate_pct,
            nxdomain,
            threshold,
        } => {
            signals::score_signal(latency_ms, error_rate_pct, nxdomain, threshold, cli.format)?;
        }
        Commands::Classify { resource_id } => {
            signals::classify_resource(&resource_id, cli.format)?;
        }
        Commands::Submit { file } => {
            let client = client::ApiClient::new(&cli.api_url)?;
            signals::submit_signals(&client, &file, cli.format).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&cli.api_url)?;
            health::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
