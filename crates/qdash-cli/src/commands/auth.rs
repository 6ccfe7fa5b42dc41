//! Auth command implementation.
//!
//! Manage the IBM Quantum API key and service CRN used by data commands.

use anyhow::{Context, Result};
use console::style;

use qdash_core::credentials::{API_KEY_ENV, SERVICE_CRN_ENV};

use super::common::Session;

/// Execute the auth login subcommand.
pub fn execute_login(session: &Session, api_key: &str, service_crn: &str) -> Result<()> {
    let api_key = api_key.trim();
    let service_crn = service_crn.trim();
    if api_key.is_empty() || service_crn.is_empty() {
        anyhow::bail!("Both --api-key and --service-crn must be non-empty");
    }

    session
        .file_store()
        .set_credentials(api_key, service_crn)
        .with_context(|| {
            format!(
                "Failed to write credentials to {}",
                session.credentials_path.display()
            )
        })?;

    println!(
        "{} Credentials saved to {}",
        style("✓").green().bold(),
        style(session.credentials_path.display()).dim()
    );
    println!("  Service CRN: {}", style(service_crn).yellow());

    if session.from_env {
        println!(
            "  {} {} and {} are set and take precedence over the saved credentials",
            style("!").yellow().bold(),
            API_KEY_ENV,
            SERVICE_CRN_ENV
        );
    }

    Ok(())
}

/// Execute the auth status subcommand.
pub fn execute_status(session: &Session) -> Result<()> {
    println!("{} Authentication status:\n", style("→").cyan().bold());

    let Some(credentials) = session.credentials.credentials() else {
        println!("  {}", style("not configured").red());
        println!("  Commands will show demonstration data.");
        println!(
            "  Run {} to configure.",
            style("qdash auth login --api-key <key> --service-crn <crn>").dim()
        );
        return Ok(());
    };

    let source = if session.from_env {
        format!("environment ({API_KEY_ENV}, {SERVICE_CRN_ENV})")
    } else {
        session.credentials_path.display().to_string()
    };

    println!("  Source:      {}", style(source).bold());
    println!("  API key:     {}", redact(&credentials.api_key));
    println!("  Service CRN: {}", style(&credentials.service_crn).yellow());

    Ok(())
}

/// Execute the auth logout subcommand.
pub fn execute_logout(session: &Session) -> Result<()> {
    println!("{} Logging out...", style("→").cyan().bold());

    session.file_store().clear().with_context(|| {
        format!(
            "Failed to clear credentials in {}",
            session.credentials_path.display()
        )
    })?;

    if session.from_env {
        println!(
            "  {} {} and {} are still set in the environment",
            style("!").yellow().bold(),
            API_KEY_ENV,
            SERVICE_CRN_ENV
        );
    }

    println!("{} Done.", style("✓").green().bold());

    Ok(())
}

/// Show only the last four characters of a secret.
fn redact(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 8 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(len - 4).collect();
    format!("****{tail}")
}
