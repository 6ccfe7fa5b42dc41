//! Synthetic backends and jobs for sessions without live data.
//!
//! Used whenever credentials are missing or the remote service fails. The
//! random source is passed in, so a seeded [`rand::rngs::StdRng`] reproduces
//! the exact same snapshot.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Builder;

use crate::model::{Backend, BackendKind, BackendStatus, Job, JobPhase, JobStatus};

/// Default number of synthetic jobs per snapshot.
pub const DEFAULT_JOB_COUNT: usize = 20;

/// Shot counts a synthetic job picks from.
const SHOT_CHOICES: [u32; 4] = [1024, 2048, 4096, 8192];

/// Users a synthetic job is attributed to.
const USERS: [&str; 5] = [
    "alice.quantum",
    "bob.researcher",
    "carol.phd",
    "david.lab",
    "eve.student",
];

/// Synthetic jobs never use more qubits than this.
const MAX_JOB_QUBITS: u32 = 20;

/// The fixed synthetic backend catalog.
///
/// Spans online/maintenance and hardware/simulator.
pub fn backend_catalog() -> Vec<Backend> {
    vec![
        Backend {
            id: "ibm_kyoto".into(),
            name: "IBM Kyoto".into(),
            status: BackendStatus::Online,
            qubits: 127,
            pending_jobs: 42,
            average_queue_time: 180.0,
            error_rate: 0.02,
            temperature: 0.015,
            location: "Kyoto, Japan".into(),
            kind: BackendKind::Hardware,
        },
        Backend {
            id: "ibm_osaka".into(),
            name: "IBM Osaka".into(),
            status: BackendStatus::Online,
            qubits: 127,
            pending_jobs: 28,
            average_queue_time: 95.0,
            error_rate: 0.018,
            temperature: 0.013,
            location: "Osaka, Japan".into(),
            kind: BackendKind::Hardware,
        },
        Backend {
            id: "ibm_cleveland".into(),
            name: "IBM Cleveland".into(),
            status: BackendStatus::Maintenance,
            qubits: 433,
            pending_jobs: 0,
            average_queue_time: 0.0,
            error_rate: 0.015,
            temperature: 0.012,
            location: "Cleveland, USA".into(),
            kind: BackendKind::Hardware,
        },
        Backend {
            id: "ibm_simulator".into(),
            name: "QASM Simulator".into(),
            status: BackendStatus::Online,
            qubits: 1000,
            pending_jobs: 156,
            average_queue_time: 15.0,
            error_rate: 0.0,
            temperature: 298.0,
            location: "Cloud".into(),
            kind: BackendKind::Simulator,
        },
    ]
}

/// Generator for synthetic job lists.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    job_count: usize,
    backends: Vec<Backend>,
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_COUNT)
    }
}

impl SyntheticGenerator {
    /// Create a generator producing `job_count` jobs per call.
    pub fn new(job_count: usize) -> Self {
        Self {
            job_count,
            backends: backend_catalog(),
        }
    }

    /// Number of jobs produced per call.
    pub fn job_count(&self) -> usize {
        self.job_count
    }

    /// The backend catalog jobs are assigned to.
    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// Generate jobs created within the 24 hours before `now`, newest first.
    ///
    /// All timestamps are whole seconds and none lies after `now`.
    pub fn generate_jobs<R: Rng + ?Sized>(&self, rng: &mut R, now: DateTime<Utc>) -> Vec<Job> {
        let now = now.trunc_subsecs(0);
        let mut jobs: Vec<Job> = (0..self.job_count)
            .map(|i| self.generate_job(rng, now, i))
            .collect();

        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    fn generate_job<R: Rng + ?Sized>(&self, rng: &mut R, now: DateTime<Utc>, index: usize) -> Job {
        let status = *JobStatus::ALL
            .choose(rng)
            .unwrap_or(&JobStatus::Queued);
        let backend = &self.backends[rng.gen_range(0..self.backends.len())];
        let created_at = now - Duration::seconds(rng.gen_range(0..24 * 60 * 60));

        let id = Builder::from_random_bytes(rng.r#gen()).into_uuid();
        let max_qubits = backend.qubits.clamp(1, MAX_JOB_QUBITS);
        let qubits = rng.gen_range(1..=max_qubits);
        let shots = SHOT_CHOICES[rng.gen_range(0..SHOT_CHOICES.len())];
        let user_id = USERS[rng.gen_range(0..USERS.len())];
        let circuit_depth = rng.gen_range(5..=54);

        let phase = match status {
            JobStatus::Queued => JobPhase::Queued {
                position: Some(rng.gen_range(1..=100)),
            },
            JobStatus::Running => JobPhase::Running {
                started_at: Self::start_after(rng, created_at, now),
            },
            JobStatus::Completed => {
                let started_at = Self::start_after(rng, created_at, now);
                let completed_at =
                    (started_at + Duration::seconds(rng.gen_range(0..30 * 60))).min(now);
                JobPhase::completed(started_at, completed_at, Some(rng.gen_range(0.0..0.1)))
            }
            JobStatus::Error => JobPhase::Error { started_at: None },
        };

        Job {
            id: id.to_string(),
            name: format!("Quantum Algorithm {}", index + 1),
            backend: backend.name.clone(),
            qubits,
            shots,
            circuit_depth,
            user_id: user_id.to_string(),
            created_at,
            phase,
        }
    }

    fn start_after<R: Rng + ?Sized>(
        rng: &mut R,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        (created_at + Duration::seconds(rng.gen_range(0..60 * 60))).min(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 250_000_000).unwrap()
    }

    #[test]
    fn test_catalog_shape() {
        let catalog = backend_catalog();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.iter().any(|b| b.status == BackendStatus::Maintenance));
        assert!(catalog.iter().any(|b| b.kind == BackendKind::Simulator));
        assert!(
            catalog
                .iter()
                .all(|b| (0.0..=1.0).contains(&b.error_rate))
        );
    }

    #[test]
    fn test_same_seed_same_jobs() {
        let generator = SyntheticGenerator::default();
        let a = generator.generate_jobs(&mut StdRng::seed_from_u64(42), now());
        let b = generator.generate_jobs(&mut StdRng::seed_from_u64(42), now());
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_JOB_COUNT);
    }

    #[test]
    fn test_different_seeds_differ() {
        let generator = SyntheticGenerator::default();
        let a = generator.generate_jobs(&mut StdRng::seed_from_u64(1), now());
        let b = generator.generate_jobs(&mut StdRng::seed_from_u64(2), now());
        assert_ne!(a, b);
    }

    #[test]
    fn test_sorted_newest_first() {
        let jobs = SyntheticGenerator::new(50).generate_jobs(&mut StdRng::seed_from_u64(3), now());
        assert!(jobs.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn test_field_ranges() {
        let generator = SyntheticGenerator::new(200);
        let jobs = generator.generate_jobs(&mut StdRng::seed_from_u64(9), now());
        let truncated_now = now().trunc_subsecs(0);

        for job in &jobs {
            let backend = generator
                .backends()
                .iter()
                .find(|b| b.name == job.backend)
                .expect("job assigned to catalog backend");
            assert!(job.qubits >= 1 && job.qubits <= backend.qubits.min(MAX_JOB_QUBITS));
            assert!(SHOT_CHOICES.contains(&job.shots));
            assert!(USERS.contains(&job.user_id.as_str()));
            assert!((5..=54).contains(&job.circuit_depth));
            assert!(job.created_at <= truncated_now);
            assert!(truncated_now - job.created_at < Duration::hours(24));

            if let Some(position) = job.position() {
                assert!((1..=100).contains(&position));
            }
            if let Some(started) = job.started_at() {
                assert!(started >= job.created_at);
                assert!(started - job.created_at < Duration::hours(1));
            }
            if let JobPhase::Completed {
                started_at,
                completed_at,
                error_rate,
            } = job.phase
            {
                assert!(completed_at - started_at < Duration::minutes(30));
                assert!(completed_at <= truncated_now);
                let rate = error_rate.expect("completed jobs carry an error rate");
                assert!((0.0..0.1).contains(&rate));
            }
        }
    }

    #[test]
    fn test_all_statuses_appear() {
        let jobs = SyntheticGenerator::new(200).generate_jobs(&mut StdRng::seed_from_u64(5), now());
        for status in JobStatus::ALL {
            assert!(jobs.iter().any(|j| j.status() == status), "missing {status}");
        }
    }

    #[test]
    fn test_zero_jobs() {
        let jobs = SyntheticGenerator::new(0).generate_jobs(&mut StdRng::seed_from_u64(5), now());
        assert!(jobs.is_empty());
    }
}
