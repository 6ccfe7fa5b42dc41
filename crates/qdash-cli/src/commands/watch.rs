//! Watch command implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use console::style;

use super::common::{Session, load_snapshot, print_origin_banner};
use super::stats::{print_stats, summary_line};

/// Execute the watch command.
///
/// Prints the counters once, then a summary line after every background
/// refresh until Ctrl-C.
pub async fn execute(session: Session, interval: Option<u64>) -> Result<()> {
    let mut cache = session.config.cache.clone();
    if let Some(secs) = interval {
        if secs == 0 {
            anyhow::bail!("--interval must be at least 1 second");
        }
        cache.refresh_interval_seconds = secs;
    }
    let period = cache.refresh_interval_seconds;

    let dashboard = Arc::new(session.dashboard_with(cache)?);
    let record = load_snapshot(&dashboard).await?;
    print_origin_banner(&record, *dashboard.advisories().borrow());
    print_stats(&record);

    println!(
        "\n{} Refreshing every {}s, press Ctrl-C to stop\n",
        style("→").cyan().bold(),
        period
    );

    let advisories = dashboard.advisories();
    let advised = AtomicBool::new(advisories.borrow().is_some());
    let subscription = dashboard.subscribe(move |record| {
        println!("{}", summary_line(&record));
        if let Some(advisory) = *advisories.borrow() {
            if !advised.swap(true, Ordering::Relaxed) {
                eprintln!("{} {}", style("!").yellow().bold(), advisory);
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    subscription.cancel();
    println!("\n{} Stopped", style("✓").green().bold());

    Ok(())
}
