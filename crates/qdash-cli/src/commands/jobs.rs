//! Jobs command implementation.

use anyhow::Result;
use console::{StyledObject, style};

use qdash_core::{Job, JobFilter, JobPhase, JobStatus};

use super::common::{OutputFormat, Session, format_time, load_snapshot, print_origin_banner, truncate};

/// Execute the jobs command.
pub async fn execute(
    session: &Session,
    status: Option<JobStatus>,
    search: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let dashboard = session.dashboard()?;
    let record = load_snapshot(&dashboard).await?;
    print_origin_banner(&record, *dashboard.advisories().borrow());

    let filter = build_filter(status, search);
    let jobs = filter.apply(&record.jobs);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&jobs)?),
        OutputFormat::Table => print_table(&jobs, record.jobs.len()),
    }

    Ok(())
}

/// Filter from the command-line options.
pub fn build_filter(status: Option<JobStatus>, search: Option<&str>) -> JobFilter {
    let mut filter = JobFilter::all();
    if let Some(status) = status {
        filter = filter.with_status(status);
    }
    if let Some(term) = search {
        filter = filter.with_search(term);
    }
    filter
}

fn print_table(jobs: &[&Job], total: usize) {
    if jobs.is_empty() {
        println!("No matching jobs ({total} total)");
        return;
    }

    println!(
        "{}",
        style(format!(
            "  {:<10} {:<24} {:<16} {:<10} {:>6} {:>6}  {:<12} {:<19}  {}",
            "ID", "NAME", "BACKEND", "STATUS", "QUBITS", "SHOTS", "USER", "CREATED", "DETAIL"
        ))
        .bold()
    );

    for job in jobs {
        println!(
            "  {:<10} {:<24} {:<16} {} {:>6} {:>6}  {:<12} {:<19}  {}",
            truncate(&job.id, 10),
            truncate(&job.name, 24),
            truncate(&job.backend, 16),
            status_label(job.status()),
            job.qubits,
            job.shots,
            truncate(&job.user_id, 12),
            format_time(job.created_at),
            style(detail(job)).dim()
        );
    }

    println!("\n  {} of {} jobs", jobs.len(), total);
}

fn status_label(status: JobStatus) -> StyledObject<String> {
    let label = format!("{:<10}", status.as_str());
    match status {
        JobStatus::Queued => style(label).yellow(),
        JobStatus::Running => style(label).cyan(),
        JobStatus::Completed => style(label).green(),
        JobStatus::Error => style(label).red(),
    }
}

/// Status-specific column: queue position, start time, runtime.
fn detail(job: &Job) -> String {
    match &job.phase {
        JobPhase::Queued { position } => {
            position.map_or_else(|| "waiting".to_string(), |p| format!("position {p}"))
        }
        JobPhase::Running { started_at } => format!("started {}", started_at.format("%H:%M:%S")),
        JobPhase::Completed { error_rate, .. } => {
            let runtime = job
                .execution_time()
                .map_or_else(String::new, |secs| format!("{secs}s"));
            match error_rate {
                Some(rate) => format!("{runtime}, error rate {:.2}%", rate * 100.0),
                None => runtime,
            }
        }
        JobPhase::Error { started_at } => match started_at {
            Some(at) => format!("failed after start {}", at.format("%H:%M:%S")),
            None => "failed before start".to_string(),
        },
    }
}
