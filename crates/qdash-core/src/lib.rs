//! qdash core - data sourcing and caching for a quantum job dashboard.
//!
//! This crate holds everything a dashboard view needs to show quantum jobs
//! and backends without caring where the data came from:
//!
//! - A [`Dashboard`] orchestrator that caches one consistent snapshot,
//!   refreshes it when stale and coalesces concurrent refreshes
//! - A [`DataSource`] trait implemented by live providers (see
//!   `qdash-adapter-ibm`)
//! - A seedable [`SyntheticGenerator`] used whenever live data is unavailable
//! - A [`CredentialStore`] for the API key and service CRN
//! - [`compute_stats`] for the aggregate header counters
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qdash_core::{CredentialStore, Dashboard};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials = Arc::new(CredentialStore::open_default()?);
//!     let dashboard = Arc::new(Dashboard::new(credentials));
//!
//!     // No source attached: this is a synthetic snapshot.
//!     let record = dashboard.snapshot().await;
//!     println!("{} jobs ({})", record.jobs.len(), record.origin);
//!
//!     let _sub = dashboard.subscribe(|record| {
//!         println!("refreshed: {} running", record.stats.running_jobs);
//!     });
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod model;
pub mod source;
pub mod stats;
pub mod subscription;
pub mod synthetic;

pub use cache::{Advisory, CacheRecord, Dashboard, DataOrigin, FallbackReason};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, Config, ConfigError, CredentialsConfig, RemoteConfig};
pub use credentials::{
    CredentialStore, Credentials, FileStore, KeyValueStore, MemoryStore,
};
pub use error::{DashError, DashResult};
pub use model::{Backend, BackendKind, BackendStatus, Job, JobFilter, JobPhase, JobStatus};
pub use source::DataSource;
pub use stats::{DashboardStats, compute_stats};
pub use subscription::Subscription;
pub use synthetic::{SyntheticGenerator, backend_catalog};
