//! The dashboard orchestrator.
//!
//! [`Dashboard`] owns the current [`CacheRecord`] and decides, on every read,
//! whether it is still fresh. Stale reads trigger a refresh that pulls both
//! listings from the configured [`DataSource`] or, when that is impossible or
//! fails, builds a complete synthetic snapshot. Remote failures never reach
//! callers of the read API.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::credentials::CredentialStore;
use crate::error::{DashError, DashResult};
use crate::model::{Backend, Job};
use crate::source::DataSource;
use crate::stats::{DashboardStats, compute_stats};
use crate::subscription::Subscription;
use crate::synthetic::SyntheticGenerator;

/// Why a snapshot was built from synthetic data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// No API key or service CRN configured.
    MissingCredentials,
    /// No live data source attached.
    NoSource,
    /// The source failed (authentication, transport or HTTP status).
    RemoteFailure(String),
    /// The service refused this client after a successful token exchange.
    AccessBlocked,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::MissingCredentials => write!(f, "no credentials configured"),
            FallbackReason::NoSource => write!(f, "no live data source"),
            FallbackReason::RemoteFailure(msg) => write!(f, "remote request failed: {msg}"),
            FallbackReason::AccessBlocked => write!(f, "remote access blocked"),
        }
    }
}

impl From<&DashError> for FallbackReason {
    fn from(err: &DashError) -> Self {
        if err.is_access_blocked() {
            FallbackReason::AccessBlocked
        } else if err.is_configuration() {
            FallbackReason::MissingCredentials
        } else {
            FallbackReason::RemoteFailure(err.to_string())
        }
    }
}

/// Where the data in a [`CacheRecord`] came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum DataOrigin {
    /// Both listings came from the live source.
    Live,
    /// The whole record is synthetic.
    Synthetic(FallbackReason),
}

impl DataOrigin {
    /// Whether the record holds live data.
    pub fn is_live(&self) -> bool {
        matches!(self, DataOrigin::Live)
    }

    /// The fallback reason, for synthetic records.
    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            DataOrigin::Live => None,
            DataOrigin::Synthetic(reason) => Some(reason),
        }
    }
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataOrigin::Live => write!(f, "live"),
            DataOrigin::Synthetic(reason) => write!(f, "synthetic ({reason})"),
        }
    }
}

/// A one-time notice for the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    /// The remote service refused this client; data will stay synthetic.
    AccessBlocked,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::AccessBlocked => write!(
                f,
                "The IBM Quantum API refused this client; showing demonstration data instead"
            ),
        }
    }
}

/// One consistent snapshot of the dashboard data.
///
/// `stats` is always computed from `jobs` and `backends` of the same record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub jobs: Vec<Job>,
    pub backends: Vec<Backend>,
    pub stats: DashboardStats,
    pub fetched_at: DateTime<Utc>,
    pub origin: DataOrigin,
}

impl CacheRecord {
    /// Build a record, computing its stats.
    pub fn new(
        jobs: Vec<Job>,
        backends: Vec<Backend>,
        fetched_at: DateTime<Utc>,
        origin: DataOrigin,
    ) -> Self {
        let stats = compute_stats(&jobs, &backends);
        Self {
            jobs,
            backends,
            stats,
            fetched_at,
            origin,
        }
    }

    /// Whether the record is older than `threshold` at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        now - self.fetched_at > threshold
    }

    /// Whether the record was built from synthetic data.
    pub fn is_synthetic(&self) -> bool {
        !self.origin.is_live()
    }
}

/// Cached access to jobs, backends and stats.
///
/// Share it behind an [`Arc`]; every method takes `&self`.
pub struct Dashboard {
    config: CacheConfig,
    credentials: Arc<CredentialStore>,
    source: Option<Arc<dyn DataSource>>,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    generator: SyntheticGenerator,
    record: RwLock<Option<Arc<CacheRecord>>>,
    refresh_lock: tokio::sync::Mutex<()>,
    advisory: watch::Sender<Option<Advisory>>,
    advisory_sent: AtomicBool,
}

impl fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dashboard")
            .field("config", &self.config)
            .field("source", &self.source.as_ref().map(|s| s.name().to_string()))
            .field("has_record", &self.current().is_some())
            .finish()
    }
}

impl Dashboard {
    /// Create a dashboard with no live source, the system clock and an
    /// entropy-seeded generator.
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        let config = CacheConfig::default();
        let (advisory, _) = watch::channel(None);
        Self {
            generator: SyntheticGenerator::new(config.synthetic_jobs),
            config,
            credentials,
            source: None,
            clock: Arc::new(SystemClock),
            rng: Mutex::new(StdRng::from_entropy()),
            record: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            advisory,
            advisory_sent: AtomicBool::new(false),
        }
    }

    /// Attach a live data source.
    pub fn with_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the synthetic generator for reproducible snapshots.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Apply cache settings.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.generator = SyntheticGenerator::new(config.synthetic_jobs);
        self.config = config;
        self
    }

    /// Cache settings in effect.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The shared credential store.
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Jobs, newest first for synthetic data, refreshing first if stale.
    pub async fn get_jobs(&self) -> Vec<Job> {
        self.ensure_fresh().await.jobs.clone()
    }

    /// Backends, refreshing first if stale.
    pub async fn get_backends(&self) -> Vec<Backend> {
        self.ensure_fresh().await.backends.clone()
    }

    /// Stats of the current record, refreshing first if stale.
    pub async fn get_stats(&self) -> DashboardStats {
        self.ensure_fresh().await.stats
    }

    /// The whole current record, refreshing first if stale.
    pub async fn snapshot(&self) -> Arc<CacheRecord> {
        self.ensure_fresh().await
    }

    /// The current record without refreshing.
    pub fn cached(&self) -> Option<Arc<CacheRecord>> {
        self.current()
    }

    /// Store new credentials. Tokens issued under the old ones are invalidated.
    pub fn set_credentials(&self, api_key: &str, service_crn: &str) -> DashResult<()> {
        self.credentials.set_credentials(api_key, service_crn)
    }

    /// Whether an API key and service CRN are configured.
    pub fn has_credentials(&self) -> bool {
        self.credentials.has_credentials()
    }

    /// Receiver for one-time advisories.
    ///
    /// `borrow()` shows an advisory that was published before subscribing.
    pub fn advisories(&self) -> watch::Receiver<Option<Advisory>> {
        self.advisory.subscribe()
    }

    /// Refresh every `refresh_interval_seconds` and hand each new record to
    /// `callback` until the returned handle is cancelled or dropped.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(Arc<CacheRecord>) + Send + Sync + 'static,
    {
        Subscription::spawn(Arc::downgrade(self), self.config.refresh_interval(), callback)
    }

    /// Rebuild the record unconditionally.
    ///
    /// Waits for an in-flight refresh to finish first; the two never overlap.
    pub async fn refresh(&self) -> Arc<CacheRecord> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn ensure_fresh(&self) -> Arc<CacheRecord> {
        let seen = self.current();
        if let Some(record) = &seen {
            if !self.is_stale(record) {
                debug!("serving cached dashboard data");
                return Arc::clone(record);
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // A refresh may have completed while we waited for the guard.
        if let Some(record) = self.current() {
            let replaced = match &seen {
                Some(old) => !Arc::ptr_eq(old, &record),
                None => true,
            };
            if replaced || !self.is_stale(&record) {
                debug!("joined concurrent refresh");
                return record;
            }
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Arc<CacheRecord> {
        let record = match self.load_live().await {
            Ok((jobs, backends)) => {
                CacheRecord::new(jobs, backends, self.clock.now(), DataOrigin::Live)
            }
            Err(reason) => {
                warn!("using synthetic dashboard data: {reason}");
                self.synthetic_record(reason)
            }
        };

        info!(
            origin = %record.origin,
            jobs = record.jobs.len(),
            backends = record.backends.len(),
            "dashboard data refreshed"
        );

        let record = Arc::new(record);
        *self.record.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&record));
        record
    }

    async fn load_live(&self) -> Result<(Vec<Job>, Vec<Backend>), FallbackReason> {
        if !self.credentials.has_credentials() {
            return Err(FallbackReason::MissingCredentials);
        }
        let source = self.source.as_ref().ok_or(FallbackReason::NoSource)?;

        let result = tokio::try_join!(source.fetch_jobs(), source.fetch_backends());
        result.map_err(|e| {
            if e.is_access_blocked() {
                self.publish_advisory(Advisory::AccessBlocked);
            }
            debug!(source = source.name(), "live fetch failed: {e}");
            FallbackReason::from(&e)
        })
    }

    fn synthetic_record(&self, reason: FallbackReason) -> CacheRecord {
        let now = self.clock.now();
        let jobs = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            self.generator.generate_jobs(&mut *rng, now)
        };
        let backends = self.generator.backends().to_vec();
        CacheRecord::new(jobs, backends, now, DataOrigin::Synthetic(reason))
    }

    fn publish_advisory(&self, advisory: Advisory) {
        if !self.advisory_sent.swap(true, Ordering::SeqCst) {
            warn!("{advisory}");
            self.advisory.send_replace(Some(advisory));
        }
    }

    fn current(&self) -> Option<Arc<CacheRecord>> {
        self.record
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(Arc::clone)
    }

    fn is_stale(&self, record: &CacheRecord) -> bool {
        record.is_stale(self.clock.now(), self.config.staleness())
    }
}
