//! Backends command implementation.

use anyhow::Result;
use console::{StyledObject, style};

use qdash_core::{Backend, BackendKind, BackendStatus};

use super::common::{OutputFormat, Session, format_minutes, load_snapshot, print_origin_banner};

/// Execute the backends command.
pub async fn execute(session: &Session, format: OutputFormat) -> Result<()> {
    let dashboard = session.dashboard()?;
    let record = load_snapshot(&dashboard).await?;
    print_origin_banner(&record, *dashboard.advisories().borrow());

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&record.backends)?);
        return Ok(());
    }

    println!("{} Backends:\n", style("qdash").cyan().bold());

    if record.backends.is_empty() {
        println!("  No backends reported");
        return Ok(());
    }

    for backend in &record.backends {
        print_backend(backend);
    }

    Ok(())
}

fn print_backend(backend: &Backend) {
    println!(
        "  {} {} ({}, {})",
        status_symbol(backend.status),
        style(&backend.name).bold(),
        backend.kind.as_str(),
        backend.location
    );
    println!("    Qubits: {}", backend.qubits);
    println!(
        "    Queue: {} pending, ~{}",
        backend.pending_jobs,
        format_minutes(backend.average_queue_time)
    );
    println!("    Error rate: {:.2}%", backend.error_rate * 100.0);
    if backend.kind == BackendKind::Hardware {
        println!("    Temperature: {:.1} mK", backend.temperature * 1000.0);
    }
    if backend.status != BackendStatus::Online {
        println!("    Status: {}", style(backend.status).yellow());
    }
    println!();
}

fn status_symbol(status: BackendStatus) -> StyledObject<&'static str> {
    match status {
        BackendStatus::Online => style("●").green(),
        BackendStatus::Maintenance => style("○").yellow(),
        BackendStatus::Offline => style("○").red(),
    }
}
