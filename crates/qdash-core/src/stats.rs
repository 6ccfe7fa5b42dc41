//! Aggregate counters shown in the dashboard header.

use serde::{Deserialize, Serialize};

use crate::model::{Backend, Job, JobStatus};

/// Derived dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Number of jobs.
    pub total_jobs: usize,
    /// Jobs waiting in a queue.
    pub queued_jobs: usize,
    /// Jobs executing.
    pub running_jobs: usize,
    /// Jobs finished successfully.
    pub completed_jobs: usize,
    /// Jobs that failed.
    pub error_jobs: usize,
    /// Backends with status online.
    pub active_backends: usize,
    /// Sum of qubits over online backends.
    pub total_qubits: u64,
}

impl DashboardStats {
    /// Number of jobs with the given status.
    pub fn count(&self, status: JobStatus) -> usize {
        match status {
            JobStatus::Queued => self.queued_jobs,
            JobStatus::Running => self.running_jobs,
            JobStatus::Completed => self.completed_jobs,
            JobStatus::Error => self.error_jobs,
        }
    }
}

/// Compute dashboard counters from the current collections.
pub fn compute_stats(jobs: &[Job], backends: &[Backend]) -> DashboardStats {
    let mut stats = DashboardStats {
        total_jobs: jobs.len(),
        ..DashboardStats::default()
    };

    for job in jobs {
        match job.status() {
            JobStatus::Queued => stats.queued_jobs += 1,
            JobStatus::Running => stats.running_jobs += 1,
            JobStatus::Completed => stats.completed_jobs += 1,
            JobStatus::Error => stats.error_jobs += 1,
        }
    }

    for backend in backends.iter().filter(|b| b.is_online()) {
        stats.active_backends += 1;
        stats.total_qubits += u64::from(backend.qubits);
    }

    stats
}
