//! Orchestrator behavior against a scripted data source.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qdash_core::{
    Advisory, Backend, BackendKind, BackendStatus, CacheConfig, CredentialStore, DashError,
    DashResult, Dashboard, DataOrigin, DataSource, FallbackReason, Job, JobPhase, ManualClock,
    backend_catalog, compute_stats,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Behavior {
    Live,
    BackendsFail,
    Blocked,
    MissingCrn,
}

struct ScriptedSource {
    behavior: Mutex<Behavior>,
    delay: Duration,
    backend_calls: AtomicUsize,
    job_calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            delay: Duration::from_millis(20),
            backend_calls: AtomicUsize::new(0),
            job_calls: AtomicUsize::new(0),
        })
    }

    fn behavior(&self) -> Behavior {
        *self.behavior.lock().unwrap()
    }

    fn calls(&self) -> (usize, usize) {
        (
            self.backend_calls.load(Ordering::SeqCst),
            self.job_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_backends(&self) -> DashResult<Vec<Backend>> {
        self.backend_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match self.behavior() {
            Behavior::Live => Ok(vec![live_backend()]),
            Behavior::BackendsFail => Err(DashError::RemoteRequest {
                status: Some(500),
                message: "internal error".into(),
            }),
            Behavior::Blocked => Err(DashError::AccessBlocked("HTTP 403".into())),
            Behavior::MissingCrn => Err(DashError::Configuration("service CRN not set".into())),
        }
    }

    async fn fetch_jobs(&self) -> DashResult<Vec<Job>> {
        self.job_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match self.behavior() {
            Behavior::Blocked => Err(DashError::AccessBlocked("HTTP 403".into())),
            Behavior::MissingCrn => Err(DashError::Configuration("service CRN not set".into())),
            _ => Ok(vec![live_job()]),
        }
    }
}

fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn live_backend() -> Backend {
    Backend {
        id: "ibm_torino".into(),
        name: "ibm_torino".into(),
        status: BackendStatus::Online,
        qubits: 133,
        pending_jobs: 7,
        average_queue_time: 0.0,
        error_rate: 0.0,
        temperature: 0.0,
        location: "Unknown".into(),
        kind: BackendKind::Hardware,
    }
}

fn live_job() -> Job {
    Job {
        id: "d0abc".into(),
        name: "Job d0abc".into(),
        backend: "ibm_torino".into(),
        qubits: 2,
        shots: 1024,
        circuit_depth: 0,
        user_id: "unknown".into(),
        created_at: start(),
        phase: JobPhase::Queued { position: Some(3) },
    }
}

fn dashboard(source: Arc<ScriptedSource>, clock: Arc<ManualClock>) -> Arc<Dashboard> {
    let credentials = Arc::new(CredentialStore::in_memory());
    credentials.set_credentials("key", "crn:v1:bluemix:public:quantum-computing:us-east").unwrap();
    Arc::new(
        Dashboard::new(credentials)
            .with_source(source)
            .with_clock(clock)
            .with_rng_seed(42),
    )
}

#[tokio::test]
async fn test_live_record() {
    let source = ScriptedSource::new(Behavior::Live);
    let dash = dashboard(Arc::clone(&source), Arc::new(ManualClock::new(start())));

    let record = dash.snapshot().await;
    assert_eq!(record.origin, DataOrigin::Live);
    assert_eq!(record.jobs, vec![live_job()]);
    assert_eq!(record.backends, vec![live_backend()]);
    assert_eq!(record.stats, compute_stats(&record.jobs, &record.backends));
    assert_eq!(record.stats.total_qubits, 133);
}

#[tokio::test]
async fn test_concurrent_reads_share_one_refresh() {
    let source = ScriptedSource::new(Behavior::Live);
    let dash = dashboard(Arc::clone(&source), Arc::new(ManualClock::new(start())));

    let reads = (0..16).map(|_| {
        let dash = Arc::clone(&dash);
        async move { dash.get_jobs().await }
    });
    let results = futures::future::join_all(reads).await;

    assert!(results.iter().all(|jobs| jobs == &vec![live_job()]));
    assert_eq!(source.calls(), (1, 1));
}

#[tokio::test]
async fn test_concurrent_reads_across_tasks_share_one_refresh() {
    let source = ScriptedSource::new(Behavior::Live);
    let dash = dashboard(Arc::clone(&source), Arc::new(ManualClock::new(start())));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dash = Arc::clone(&dash);
            tokio::spawn(async move { dash.get_backends().await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), vec![live_backend()]);
    }

    assert_eq!(source.calls(), (1, 1));
}

#[tokio::test]
async fn test_stale_record_is_refetched() {
    let source = ScriptedSource::new(Behavior::Live);
    let clock = Arc::new(ManualClock::new(start()));
    let dash = dashboard(Arc::clone(&source), Arc::clone(&clock));

    dash.get_stats().await;
    clock.advance(chrono::Duration::seconds(10));
    dash.get_stats().await;
    assert_eq!(source.calls(), (1, 1));

    clock.advance(chrono::Duration::seconds(21));
    dash.get_stats().await;
    assert_eq!(source.calls(), (2, 2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_of_stale_record_share_one_refresh() {
    let source = ScriptedSource::new(Behavior::Live);
    let clock = Arc::new(ManualClock::new(start()));
    let dash = dashboard(Arc::clone(&source), Arc::clone(&clock));

    let first = dash.snapshot().await;
    assert_eq!(source.calls(), (1, 1));

    clock.advance(chrono::Duration::seconds(31));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let dash = Arc::clone(&dash);
            tokio::spawn(async move { dash.get_stats().await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), first.stats);
    }

    assert_eq!(source.calls(), (2, 2));
    let second = dash.cached().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.fetched_at, start() + chrono::Duration::seconds(31));
}

#[tokio::test]
async fn test_custom_staleness_threshold() {
    let source = ScriptedSource::new(Behavior::Live);
    let clock = Arc::new(ManualClock::new(start()));
    let credentials = Arc::new(CredentialStore::in_memory());
    credentials.set_credentials("key", "crn").unwrap();
    let dash = Dashboard::new(credentials)
        .with_source(Arc::clone(&source) as Arc<dyn DataSource>)
        .with_clock(Arc::clone(&clock) as Arc<dyn qdash_core::Clock>)
        .with_config(CacheConfig {
            staleness_seconds: 5,
            ..CacheConfig::default()
        });

    dash.get_jobs().await;
    clock.advance(chrono::Duration::seconds(6));
    dash.get_jobs().await;
    assert_eq!(source.calls(), (2, 2));
}

#[tokio::test]
async fn test_partial_failure_falls_back_entirely() {
    let source = ScriptedSource::new(Behavior::BackendsFail);
    let dash = dashboard(Arc::clone(&source), Arc::new(ManualClock::new(start())));

    let record = dash.snapshot().await;
    assert!(matches!(
        record.origin,
        DataOrigin::Synthetic(FallbackReason::RemoteFailure(_))
    ));
    // Jobs succeeded but must not be mixed into a synthetic record.
    assert!(!record.jobs.contains(&live_job()));
    assert_eq!(record.jobs.len(), 20);
    assert_eq!(record.backends, backend_catalog());
    assert_eq!(record.stats, compute_stats(&record.jobs, &record.backends));
}

#[tokio::test]
async fn test_recovers_after_remote_failure() {
    let source = ScriptedSource::new(Behavior::BackendsFail);
    let clock = Arc::new(ManualClock::new(start()));
    let dash = dashboard(Arc::clone(&source), Arc::clone(&clock));

    assert!(dash.snapshot().await.is_synthetic());

    *source.behavior.lock().unwrap() = Behavior::Live;
    clock.advance(chrono::Duration::seconds(31));
    assert_eq!(dash.snapshot().await.origin, DataOrigin::Live);
}

#[tokio::test]
async fn test_missing_credentials_skip_source() {
    let source = ScriptedSource::new(Behavior::Live);
    let dash = Dashboard::new(Arc::new(CredentialStore::in_memory()))
        .with_source(Arc::clone(&source) as Arc<dyn DataSource>)
        .with_rng_seed(3);

    assert!(!dash.has_credentials());
    let jobs = dash.get_jobs().await;
    assert!(!jobs.is_empty());
    assert!(jobs.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    assert_eq!(source.calls(), (0, 0));
    assert_eq!(
        dash.cached().unwrap().origin,
        DataOrigin::Synthetic(FallbackReason::MissingCredentials)
    );
}

#[tokio::test]
async fn test_configuration_error_reported_as_missing_credentials() {
    let source = ScriptedSource::new(Behavior::MissingCrn);
    let dash = dashboard(Arc::clone(&source), Arc::new(ManualClock::new(start())));

    let record = dash.snapshot().await;
    assert_eq!(
        record.origin,
        DataOrigin::Synthetic(FallbackReason::MissingCredentials)
    );
}

#[tokio::test]
async fn test_access_blocked_advisory_published_once() {
    let source = ScriptedSource::new(Behavior::Blocked);
    let dash = dashboard(Arc::clone(&source), Arc::new(ManualClock::new(start())));
    let mut advisories = dash.advisories();

    let record = dash.snapshot().await;
    assert_eq!(
        record.origin,
        DataOrigin::Synthetic(FallbackReason::AccessBlocked)
    );
    assert!(advisories.has_changed().unwrap());
    assert_eq!(*advisories.borrow_and_update(), Some(Advisory::AccessBlocked));

    dash.refresh().await;
    dash.refresh().await;
    assert!(!advisories.has_changed().unwrap());

    // Late subscribers still see it.
    assert_eq!(*dash.advisories().borrow(), Some(Advisory::AccessBlocked));
}

#[tokio::test(start_paused = true)]
async fn test_subscription_refreshes_from_source() {
    let source = ScriptedSource::new(Behavior::Live);
    let dash = dashboard(Arc::clone(&source), Arc::new(ManualClock::new(start())));
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);

    let sub = dash.subscribe(move |record| {
        assert_eq!(record.origin, DataOrigin::Live);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(delivered.load(Ordering::SeqCst), 2);
    assert_eq!(source.calls(), (2, 2));

    sub.cancel();
    tokio::time::sleep(Duration::from_secs(90)).await;
    assert_eq!(source.calls(), (2, 2));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_refresh_skips_callback() {
    let source = Arc::new(ScriptedSource {
        behavior: Mutex::new(Behavior::Live),
        delay: Duration::from_secs(10),
        backend_calls: AtomicUsize::new(0),
        job_calls: AtomicUsize::new(0),
    });
    let dash = dashboard(Arc::clone(&source), Arc::new(ManualClock::new(start())));
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);

    let sub = dash.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // Tick at 30 s starts a refresh that takes 10 s.
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(source.calls(), (1, 1));
    sub.cancel();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(delivered.load(Ordering::SeqCst), 0);
    // The in-flight refresh still completed and replaced the record.
    assert_eq!(dash.cached().unwrap().origin, DataOrigin::Live);
    assert_eq!(source.calls(), (1, 1));
}
