//! Stats command implementation.

use anyhow::Result;
use console::style;
use serde::Serialize;

use qdash_core::{CacheRecord, DashboardStats, DataOrigin};

use super::common::{OutputFormat, Session, format_time, load_snapshot, print_origin_banner};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsReport<'a> {
    #[serde(flatten)]
    stats: &'a DashboardStats,
    fetched_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    origin: &'a DataOrigin,
}

/// Execute the stats command.
pub async fn execute(session: &Session, format: OutputFormat) -> Result<()> {
    let dashboard = session.dashboard()?;
    let record = load_snapshot(&dashboard).await?;
    print_origin_banner(&record, *dashboard.advisories().borrow());

    match format {
        OutputFormat::Json => {
            let report = StatsReport {
                stats: &record.stats,
                fetched_at: record.fetched_at,
                origin: &record.origin,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => print_stats(&record),
    }

    Ok(())
}

/// Counter block shared with `watch`.
pub fn print_stats(record: &CacheRecord) {
    let stats = &record.stats;

    println!(
        "{} Dashboard ({}, {})",
        style("qdash").cyan().bold(),
        record.origin,
        format_time(record.fetched_at)
    );
    println!("  Jobs:      {}", style(stats.total_jobs).bold());
    println!("    Queued:    {}", style(stats.queued_jobs).yellow());
    println!("    Running:   {}", style(stats.running_jobs).cyan());
    println!("    Completed: {}", style(stats.completed_jobs).green());
    println!("    Error:     {}", style(stats.error_jobs).red());
    println!(
        "  Backends:  {} online, {} qubits",
        style(stats.active_backends).bold(),
        style(stats.total_qubits).bold()
    );
}

/// One-line summary for periodic output.
pub fn summary_line(record: &CacheRecord) -> String {
    let stats = &record.stats;
    format!(
        "[{}] {} jobs ({} queued, {} running, {} completed, {} error) | {} backends online, {} qubits | {}",
        record.fetched_at.format("%H:%M:%S"),
        stats.total_jobs,
        stats.queued_jobs,
        stats.running_jobs,
        stats.completed_jobs,
        stats.error_jobs,
        stats.active_backends,
        stats.total_qubits,
        record.origin
    )
}
