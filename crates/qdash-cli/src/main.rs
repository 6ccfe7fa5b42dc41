//! qdash Command-Line Interface
//!
//! A terminal view of IBM Quantum jobs and backends. Without credentials,
//! or when the service cannot be reached, every command still works on
//! synthetic demonstration data and says so.
//!
//! ```text
//! qdash jobs --status running
//! qdash backends --format json
//! qdash watch --interval 10
//! qdash auth login --api-key <key> --service-crn <crn>
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use qdash_core::JobStatus;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::{OutputFormat, Session};
use commands::{auth, backends, jobs, stats, version, watch};

/// qdash - quantum job and backend dashboard
#[derive(Parser)]
#[command(name = "qdash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (YAML)
    #[arg(long, global = true, env = "QDASH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List jobs
    Jobs {
        /// Only jobs with this status (queued, running, completed, error)
        #[arg(short, long)]
        status: Option<JobStatus>,

        /// Only jobs whose name, backend or user contains this text
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// List backends
    Backends {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show job and backend counters
    Stats {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Refresh periodically and print counters until interrupted
    Watch {
        /// Refresh interval in seconds (defaults to the configured interval)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Manage IBM Quantum credentials
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Store an API key and service CRN
    Login {
        /// IBM Cloud API key
        #[arg(long)]
        api_key: String,

        /// Service CRN of the IBM Quantum instance
        #[arg(long)]
        service_crn: String,
    },

    /// Show which credentials are in use
    Status,

    /// Remove stored credentials
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over -v.
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    let result = run(cli).await;

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Jobs {
            status,
            search,
            format,
        } => jobs::execute(&Session::open(config)?, status, search.as_deref(), format).await,

        Commands::Backends { format } => backends::execute(&Session::open(config)?, format).await,

        Commands::Stats { format } => stats::execute(&Session::open(config)?, format).await,

        Commands::Watch { interval } => watch::execute(Session::open(config)?, interval).await,

        Commands::Auth { action } => {
            let session = Session::open(config)?;
            match action {
                AuthAction::Login {
                    api_key,
                    service_crn,
                } => auth::execute_login(&session, &api_key, &service_crn),
                AuthAction::Status => auth::execute_status(&session),
                AuthAction::Logout => auth::execute_logout(&session),
            }
        }

        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
