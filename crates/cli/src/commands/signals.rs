//! Signal scoring, classification and submission commands

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;
use triage_lib::{classify, score, BatchResponse, ClassifiedTarget, RiskScore};

use crate::client::ApiClient;
use crate::output::{
    color_risk, color_status, print_info, print_json, print_success, print_table, print_warning,
    OutputFormat,
};

/// Offline scoring result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub latency_ms: Option<f64>,
    pub error_rate_pct: Option<f64>,
    pub nxdomain_anomaly: bool,
    pub risk: RiskScore,
    pub threshold: Decimal,
    pub at_risk: bool,
}

impl ScoreReport {
    pub fn compute(
        latency_ms: Option<f64>,
        error_rate_pct: Option<f64>,
        nxdomain_anomaly: bool,
        threshold: Decimal,
    ) -> Self {
        let risk = score(latency_ms, error_rate_pct, nxdomain_anomaly);
        Self {
            latency_ms,
            error_rate_pct,
            nxdomain_anomaly,
            risk,
            threshold,
            at_risk: risk.meets(threshold),
        }
    }
}

/// Row for the outcomes table
#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Auto-heal")]
    auto_heal: String,
    #[tabled(rename = "Automation ID")]
    automation_id: String,
}

/// Score indicators locally without contacting the agent
pub fn score_signal(
    latency_ms: Option<f64>,
    error_rate_pct: Option<f64>,
    nxdomain_anomaly: bool,
    threshold: Decimal,
    format: OutputFormat,
) -> Result<()> {
    let report = ScoreReport::compute(latency_ms, error_rate_pct, nxdomain_anomaly, threshold);

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Risk Score".bold());
            println!("{}", "=".repeat(40));
            println!("Latency (ms):      {}", format_measurement(report.latency_ms));
            println!("Error rate (%):    {}", format_measurement(report.error_rate_pct));
            println!("NXDOMAIN anomaly:  {}", report.nxdomain_anomaly);
            println!();
            println!(
                "Risk:              {}",
                color_risk(report.risk.as_f64(), report.at_risk)
            );
            println!("Threshold:         {}", report.threshold);
            println!();

            if report.at_risk {
                print_warning("At or above threshold: alert and auto-heal eligible");
            } else {
                print_success("Below threshold");
            }
        }
    }

    Ok(())
}

/// Show how a resource identifier would be remediated
pub fn classify_resource(resource_id: &str, format: OutputFormat) -> Result<()> {
    let target = classify(resource_id);

    match format {
        OutputFormat::Json => print_json(&target)?,
        OutputFormat::Table => {
            println!("Resource:  {}", resource_id.cyan());
            println!("Kind:      {}", target.kind());
            match &target {
                ClassifiedTarget::ComputeInstance { instance_id } => {
                    println!("Instance:  {}", instance_id);
                }
                ClassifiedTarget::ManagedService { cluster, service } => {
                    println!("Cluster:   {}", cluster);
                    println!("Service:   {}", service);
                }
                ClassifiedTarget::Unrecognized => {
                    print_info("No runbook applies; this resource is never auto-remediated");
                }
            }
        }
    }

    Ok(())
}

/// Submit a JSON invocation file (single event or array) to the agent
pub async fn submit_signals(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let invocation: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;

    let response: BatchResponse = client.post("v1/signals", &invocation).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let rows: Vec<OutcomeRow> = response
                .results
                .iter()
                .map(|o| OutcomeRow {
                    resource: o.resource.clone(),
                    risk: format!("{:.2}", o.risk.as_f64()),
                    auto_heal: color_status(if o.auto_heal_started {
                        "started"
                    } else {
                        "skipped"
                    }),
                    automation_id: o.automation_id.clone().unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            print_table(&rows);

            let started = response.results.iter().filter(|o| o.auto_heal_started).count();
            println!(
                "\nTotal: {} signals, {} auto-heal started",
                response.results.len(),
                started
            );
        }
    }

    Ok(())
}

fn format_measurement(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_report() {
        let report = ScoreReport::compute(Some(250.0), Some(2.0), false, Decimal::new(75, 2));

        assert_eq!(report.risk.value(), Decimal::new(90, 2));
        assert!(report.at_risk);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["atRisk"], true);
        assert_eq!(json["latencyMs"], 250.0);
    }

    #[test]
    fn test_score_report_below_threshold() {
        let report = ScoreReport::compute(None, None, true, Decimal::new(75, 2));

        assert_eq!(report.risk.value(), Decimal::new(15, 2));
        assert!(!report.at_risk);
    }

    #[test]
    fn test_format_measurement() {
        assert_eq!(format_measurement(None), "-");
        assert_eq!(format_measurement(Some(250.0)), "250");
    }
}
