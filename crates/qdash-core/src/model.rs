//! Canonical job and backend records.
//!
//! Remote responses and synthetic data are both normalized into these types
//! before they reach the cache. Status-dependent job fields live in
//! [`JobPhase`], so a queued job cannot carry a start time and a running job
//! cannot carry a queue position.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::DashError;

// ============================================================================
// Jobs
// ============================================================================

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Error,
    ];

    /// Wire/display name.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "error" => Ok(JobStatus::Error),
            other => Err(DashError::InvalidStatus(other.to_string())),
        }
    }
}

/// Status together with the fields that are only meaningful for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum JobPhase {
    /// Waiting for a backend slot.
    Queued {
        /// Position in the backend queue (1 = next).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<u32>,
    },
    /// Executing.
    Running {
        /// When execution started.
        started_at: DateTime<Utc>,
    },
    /// Finished successfully.
    Completed {
        /// When execution started.
        started_at: DateTime<Utc>,
        /// When execution finished.
        completed_at: DateTime<Utc>,
        /// Measured error rate of the run.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_rate: Option<f64>,
    },
    /// Failed.
    Error {
        /// When execution started, if it got that far.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
    },
}

impl JobPhase {
    /// Build a completed phase; `completed_at` is clamped to `started_at`.
    pub fn completed(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        error_rate: Option<f64>,
    ) -> Self {
        JobPhase::Completed {
            started_at,
            completed_at: completed_at.max(started_at),
            error_rate,
        }
    }

    /// The plain status of this phase.
    pub fn status(&self) -> JobStatus {
        match self {
            JobPhase::Queued { .. } => JobStatus::Queued,
            JobPhase::Running { .. } => JobStatus::Running,
            JobPhase::Completed { .. } => JobStatus::Completed,
            JobPhase::Error { .. } => JobStatus::Error,
        }
    }
}

/// A submitted quantum computation.
///
/// Serializes with the derived `executionTime` for completed jobs; the field
/// is ignored when deserializing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Job ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Name of the backend the job is assigned to.
    pub backend: String,
    /// Number of qubits used.
    pub qubits: u32,
    /// Number of shots.
    pub shots: u32,
    /// Circuit depth.
    pub circuit_depth: u32,
    /// Submitting user.
    pub user_id: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Status and status-specific fields.
    #[serde(flatten)]
    pub phase: JobPhase,
}

/// Serialized shape of a [`Job`].
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobRepr<'a> {
    id: &'a str,
    name: &'a str,
    backend: &'a str,
    qubits: u32,
    shots: u32,
    circuit_depth: u32,
    user_id: &'a str,
    created_at: DateTime<Utc>,
    #[serde(flatten)]
    phase: &'a JobPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    execution_time: Option<u64>,
}

impl Serialize for Job {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        JobRepr {
            id: &self.id,
            name: &self.name,
            backend: &self.backend,
            qubits: self.qubits,
            shots: self.shots,
            circuit_depth: self.circuit_depth,
            user_id: &self.user_id,
            created_at: self.created_at,
            phase: &self.phase,
            execution_time: self.execution_time(),
        }
        .serialize(serializer)
    }
}

impl Job {
    /// Lifecycle status.
    pub fn status(&self) -> JobStatus {
        self.phase.status()
    }

    /// When execution started (running, completed, and some failed jobs).
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self.phase {
            JobPhase::Running { started_at } | JobPhase::Completed { started_at, .. } => {
                Some(started_at)
            }
            JobPhase::Error { started_at } => started_at,
            JobPhase::Queued { .. } => None,
        }
    }

    /// When execution finished (completed jobs only).
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self.phase {
            JobPhase::Completed { completed_at, .. } => Some(completed_at),
            _ => None,
        }
    }

    /// Execution time in whole seconds, rounded (completed jobs only).
    pub fn execution_time(&self) -> Option<u64> {
        match self.phase {
            JobPhase::Completed {
                started_at,
                completed_at,
                ..
            } => {
                let millis = (completed_at - started_at).num_milliseconds().max(0);
                Some(((millis + 500) / 1000) as u64)
            }
            _ => None,
        }
    }

    /// Queue position (queued jobs only).
    pub fn position(&self) -> Option<u32> {
        match self.phase {
            JobPhase::Queued { position } => position,
            _ => None,
        }
    }

    /// Measured error rate (completed jobs only).
    pub fn error_rate(&self) -> Option<f64> {
        match self.phase {
            JobPhase::Completed { error_rate, .. } => error_rate,
            _ => None,
        }
    }
}

/// Search and status filter over a job list.
///
/// The search term matches job name, backend name or user id,
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    /// Only jobs with this status.
    pub status: Option<JobStatus>,
    /// Free-text search term.
    pub search: Option<String>,
}

impl JobFilter {
    /// Filter that matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to one status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to jobs whose name, backend or user contains `term`.
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = if term.trim().is_empty() {
            None
        } else {
            Some(term.to_lowercase())
        };
        self
    }

    /// Whether a job passes the filter.
    pub fn matches(&self, job: &Job) -> bool {
        if self.status.is_some_and(|s| s != job.status()) {
            return false;
        }
        match &self.search {
            None => true,
            Some(term) => {
                job.name.to_lowercase().contains(term)
                    || job.backend.to_lowercase().contains(term)
                    || job.user_id.to_lowercase().contains(term)
            }
        }
    }

    /// Apply the filter, preserving order.
    pub fn apply<'a>(&self, jobs: &'a [Job]) -> Vec<&'a Job> {
        jobs.iter().filter(|job| self.matches(job)).collect()
    }
}

// ============================================================================
// Backends
// ============================================================================

/// Operational status of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Online,
    Offline,
    Maintenance,
}

impl BackendStatus {
    /// Wire/display name.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendStatus::Online => "online",
            BackendStatus::Offline => "offline",
            BackendStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a backend is a physical device or a simulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Hardware,
    Simulator,
}

impl BackendKind {
    /// Wire/display name.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Hardware => "hardware",
            BackendKind::Simulator => "simulator",
        }
    }
}

/// A quantum execution target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    /// Backend ID (e.g. "ibm_kyoto").
    pub id: String,
    /// Display name.
    pub name: String,
    /// Operational status.
    pub status: BackendStatus,
    /// Number of qubits.
    pub qubits: u32,
    /// Jobs waiting in the queue.
    pub pending_jobs: u32,
    /// Average queue wait in minutes.
    pub average_queue_time: f64,
    /// Average error rate, a fraction in [0, 1].
    pub error_rate: f64,
    /// Operating temperature in Kelvin.
    pub temperature: f64,
    /// Physical location.
    pub location: String,
    /// Hardware or simulator.
    #[serde(rename = "type")]
    pub kind: BackendKind,
}

impl Backend {
    /// Whether the backend is accepting work.
    pub fn is_online(&self) -> bool {
        self.status == BackendStatus::Online
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn job(name: &str, phase: JobPhase) -> Job {
        Job {
            id: format!("id-{name}"),
            name: name.to_string(),
            backend: "IBM Kyoto".to_string(),
            qubits: 5,
            shots: 1024,
            circuit_depth: 12,
            user_id: "alice.quantum".to_string(),
            created_at: t0(),
            phase,
        }
    }

    #[test]
    fn test_execution_time_rounds_to_seconds() {
        let started = t0();
        let j = job(
            "bell",
            JobPhase::completed(started, started + Duration::milliseconds(90_600), None),
        );
        assert_eq!(j.execution_time(), Some(91));
        assert_eq!(j.completed_at(), Some(started + Duration::milliseconds(90_600)));
    }

    #[test]
    fn test_completed_clamps_inverted_timestamps() {
        let started = t0();
        let j = job(
            "clock-skew",
            JobPhase::completed(started, started - Duration::seconds(5), Some(0.01)),
        );
        assert_eq!(j.execution_time(), Some(0));
        assert_eq!(j.completed_at(), Some(started));
    }

    #[test]
    fn test_fields_follow_status() {
        let queued = job("q", JobPhase::Queued { position: Some(3) });
        assert_eq!(queued.status(), JobStatus::Queued);
        assert_eq!(queued.position(), Some(3));
        assert!(queued.started_at().is_none());
        assert!(queued.execution_time().is_none());

        let running = job("r", JobPhase::Running { started_at: t0() });
        assert_eq!(running.started_at(), Some(t0()));
        assert!(running.position().is_none());
        assert!(running.completed_at().is_none());

        let failed = job("e", JobPhase::Error { started_at: None });
        assert_eq!(failed.status(), JobStatus::Error);
        assert!(failed.error_rate().is_none());
    }

    #[test]
    fn test_job_serializes_with_flattened_status() {
        let j = job("q", JobPhase::Queued { position: Some(7) });
        let value = serde_json::to_value(&j).unwrap();
        assert_eq!(value["status"], "queued");
        assert_eq!(value["position"], 7);
        assert_eq!(value["userId"], "alice.quantum");
        assert!(value.get("startedAt").is_none());

        let r = job("r", JobPhase::Running { started_at: t0() });
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["status"], "running");
        assert!(value["startedAt"].is_string());
        assert!(value.get("executionTime").is_none());

        let c = job(
            "c",
            JobPhase::completed(t0(), t0() + Duration::seconds(42), Some(0.02)),
        );
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["executionTime"], 42);
        assert!(value["completedAt"].is_string());
    }

    #[test]
    fn test_completed_job_reads_back_with_execution_time() {
        let c = job(
            "c",
            JobPhase::completed(t0(), t0() + Duration::seconds(42), None),
        );
        let json = serde_json::to_string(&c).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
        assert_eq!(back.execution_time(), Some(42));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Running".parse::<JobStatus>().unwrap(), JobStatus::Running);
        let err = "cancelled".parse::<JobStatus>().unwrap_err();
        assert!(matches!(err, DashError::InvalidStatus(ref s) if s == "cancelled"));
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn test_filter_search_and_status() {
        let jobs = vec![
            job("VQE sweep", JobPhase::Running { started_at: t0() }),
            job("Grover", JobPhase::Queued { position: Some(1) }),
            job("QAOA", JobPhase::Error { started_at: None }),
        ];

        let by_name = JobFilter::all().with_search("grov");
        assert_eq!(by_name.apply(&jobs).len(), 1);

        let by_user = JobFilter::all().with_search("ALICE");
        assert_eq!(by_user.apply(&jobs).len(), 3);

        let by_status = JobFilter::all()
            .with_status(JobStatus::Running)
            .with_search("kyoto");
        let hits = by_status.apply(&jobs);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "VQE sweep");

        let blank = JobFilter::all().with_search("   ");
        assert!(blank.search.is_none());
    }

    #[test]
    fn test_backend_type_field_name() {
        let backend = Backend {
            id: "ibm_simulator".into(),
            name: "QASM Simulator".into(),
            status: BackendStatus::Online,
            qubits: 1000,
            pending_jobs: 0,
            average_queue_time: 0.0,
            error_rate: 0.0,
            temperature: 298.0,
            location: "Cloud".into(),
            kind: BackendKind::Simulator,
        };
        let value = serde_json::to_value(&backend).unwrap();
        assert_eq!(value["type"], "simulator");
        assert_eq!(value["pendingJobs"], 0);
        assert!(backend.is_online());
    }
}
