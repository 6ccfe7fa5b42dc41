//! The seam between the orchestrator and a live data provider.

use async_trait::async_trait;

use crate::error::DashResult;
use crate::model::{Backend, Job};

/// A live provider of backend and job listings.
///
/// Implementations must return errors rather than empty lists when a call
/// fails: the orchestrator treats an `Ok(vec![])` as real data and only falls
/// back to synthetic data on `Err`.
///
/// # Example
///
/// ```ignore
/// use qdash_core::{Backend, DashResult, DataSource, Job};
/// use async_trait::async_trait;
///
/// struct Fixed(Vec<Backend>);
///
/// #[async_trait]
/// impl DataSource for Fixed {
///     fn name(&self) -> &str { "fixed" }
///     async fn fetch_backends(&self) -> DashResult<Vec<Backend>> { Ok(self.0.clone()) }
///     async fn fetch_jobs(&self) -> DashResult<Vec<Job>> { Ok(Vec::new()) }
/// }
/// ```
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// List backends.
    async fn fetch_backends(&self) -> DashResult<Vec<Backend>>;

    /// List jobs.
    async fn fetch_jobs(&self) -> DashResult<Vec<Job>>;
}
