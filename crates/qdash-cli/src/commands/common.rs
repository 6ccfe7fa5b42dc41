//! Shared helpers for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qdash_adapter_ibm::IbmClient;
use qdash_core::{
    Advisory, CacheConfig, CacheRecord, Config, CredentialStore, Credentials, Dashboard, FileStore,
};

/// Output format for data commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// Pretty-printed JSON
    Json,
}

/// Configuration and credentials for one CLI invocation.
pub struct Session {
    pub config: Config,
    pub credentials: Arc<CredentialStore>,
    /// Credential file used by `auth login` / `auth logout`.
    pub credentials_path: PathBuf,
    /// Credentials came from `IBM_API_KEY` / `IBM_SERVICE_CRN`.
    pub from_env: bool,
}

impl Session {
    /// Load configuration and pick the credential source.
    ///
    /// Environment credentials win over the credential file and are never
    /// written to disk.
    pub fn open(config_file: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_file).context("Failed to load configuration")?;
        let credentials_path = match &config.credentials.path {
            Some(path) => path.clone(),
            None => FileStore::default_path().context("Failed to locate credential file")?,
        };

        let (credentials, from_env) = match Credentials::from_env() {
            Some(creds) => (
                CredentialStore::with_credentials(&creds)
                    .context("Failed to load credentials from environment")?,
                true,
            ),
            None => (
                CredentialStore::new(FileStore::new(&credentials_path)),
                false,
            ),
        };

        tracing::debug!(
            path = %credentials_path.display(),
            from_env,
            "credential source selected"
        );

        Ok(Self {
            config,
            credentials: Arc::new(credentials),
            credentials_path,
            from_env,
        })
    }

    /// A store over the credential file, regardless of the active source.
    pub fn file_store(&self) -> CredentialStore {
        CredentialStore::new(FileStore::new(&self.credentials_path))
    }

    /// Dashboard wired to IBM Quantum with the configured cache settings.
    pub fn dashboard(&self) -> Result<Dashboard> {
        self.dashboard_with(self.config.cache.clone())
    }

    /// Dashboard wired to IBM Quantum with explicit cache settings.
    pub fn dashboard_with(&self, cache: CacheConfig) -> Result<Dashboard> {
        let client = IbmClient::from_config(Arc::clone(&self.credentials), &self.config.remote)
            .context("Failed to create IBM Quantum client")?;

        Ok(Dashboard::new(Arc::clone(&self.credentials))
            .with_source(Arc::new(client))
            .with_config(cache))
    }
}

/// Read a snapshot behind a spinner.
pub async fn load_snapshot(dashboard: &Dashboard) -> Result<Arc<CacheRecord>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map_err(|e| anyhow::anyhow!("Invalid progress template: {e}"))?,
    );
    spinner.set_message("Fetching dashboard data...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let record = dashboard.snapshot().await;
    spinner.finish_and_clear();

    Ok(record)
}

/// Warn on stderr when the record is synthetic.
pub fn print_origin_banner(record: &CacheRecord, advisory: Option<Advisory>) {
    if let Some(advisory) = advisory {
        eprintln!("{} {}", style("!").yellow().bold(), advisory);
    }

    if let Some(reason) = record.origin.fallback_reason() {
        eprintln!(
            "{} Showing demonstration data: {}",
            style("!").yellow().bold(),
            style(reason).yellow()
        );
    }
}

/// Timestamp in the local display format.
pub fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Cut `text` to `width` characters, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Minutes as `1h 05m` or `12.5 min`.
pub fn format_minutes(minutes: f64) -> String {
    if minutes >= 60.0 {
        let total = minutes.round() as u64;
        format!("{}h {:02}m", total / 60, total % 60)
    } else {
        format!("{minutes:.1} min")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("ibm_kyoto", 20), "ibm_kyoto");
        assert_eq!(truncate("Bell State Preparation", 10), "Bell Stat…");
        assert_eq!(truncate("", 3), "");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(12.46), "12.5 min");
        assert_eq!(format_minutes(65.0), "1h 05m");
        assert_eq!(format_minutes(0.0), "0.0 min");
    }

    #[test]
    fn test_format_time() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(format_time(at), "2023-11-14 22:13:20");
    }
}
