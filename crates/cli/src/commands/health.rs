//! Agent health command

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;
use triage_lib::{HealthResponse, ReadinessResponse};

use crate::client::ApiClient;
use crate::output::{color_status, format_timestamp, print_json, print_table, print_warning, OutputFormat};

/// Row for the components table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Failures")]
    failures: u32,
    #[tabled(rename = "Last Check")]
    last_check: String,
    #[tabled(rename = "Last Error")]
    last_error: String,
}

#[derive(Serialize)]
struct HealthReport {
    health: HealthResponse,
    readiness: ReadinessResponse,
}

/// Show the agent's component health and readiness
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (_, health): (_, HealthResponse) = client.get_with_status("healthz").await?;
    let (_, readiness): (_, ReadinessResponse) = client.get_with_status("readyz").await?;

    match format {
        OutputFormat::Json => print_json(&HealthReport { health, readiness })?,
        OutputFormat::Table => {
            println!("{}", "Agent Health".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Status:  {}",
                color_status(health.status.as_str())
            );
            println!(
                "Ready:   {}",
                color_status(if readiness.ready { "ready" } else { "not ready" })
            );
            if let Some(reason) = &readiness.reason {
                print_warning(reason);
            }
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(component.status.as_str()),
                    failures: component.consecutive_failures,
                    last_check: format_timestamp(component.last_check_timestamp),
                    last_error: component.last_error.clone().unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));

            print_table(&rows);
        }
    }

    Ok(())
}
