//! IBM Quantum Platform API client.
//!
//! This module implements the read side of the IBM Quantum Cloud REST API:
//! - Authentication via IAM token exchange (see [`crate::token`])
//! - Listing backends
//! - Listing jobs
//!
//! Wire records are lenient: every field is optional and missing values take
//! documented defaults. Records that cannot be placed in the dashboard model
//! at all (no id, unknown status, no creation time) are skipped.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qdash_core::config::{DEFAULT_API_BASE_URL, DEFAULT_IAM_TOKEN_URL};
use qdash_core::{
    Backend, BackendKind, BackendStatus, Clock, CredentialStore, DashResult, DataSource, Job,
    JobPhase, JobStatus, RemoteConfig,
};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{IbmError, IbmResult};
use crate::token::TokenManager;

/// User-Agent sent with requests.
const USER_AGENT: &str = concat!("qdash/", env!("CARGO_PKG_VERSION"));

/// Default connection timeout.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Shots assumed when a job record has none.
const DEFAULT_SHOTS: u32 = 1024;

/// Where the client sends requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IbmEndpoints {
    /// Listing API base, e.g. `https://quantum.cloud.ibm.com/api/v1`.
    pub api_base_url: String,
    /// IAM token endpoint.
    pub iam_token_url: String,
}

impl Default for IbmEndpoints {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            iam_token_url: DEFAULT_IAM_TOKEN_URL.to_string(),
        }
    }
}

impl From<&RemoteConfig> for IbmEndpoints {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            api_base_url: config.api_base_url.clone(),
            iam_token_url: config.iam_token_url.clone(),
        }
    }
}

/// IBM Quantum API client.
pub struct IbmClient {
    /// HTTP client.
    client: Client,
    /// Endpoint URLs.
    endpoints: IbmEndpoints,
    /// Source of the service CRN.
    credentials: Arc<CredentialStore>,
    /// Bearer token cache.
    tokens: TokenManager,
}

impl fmt::Debug for IbmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmClient")
            .field("endpoints", &self.endpoints)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl IbmClient {
    /// Create a client for the public IBM Quantum Cloud endpoints.
    pub fn new(credentials: Arc<CredentialStore>) -> IbmResult<Self> {
        Self::with_endpoints(credentials, IbmEndpoints::default())
    }

    /// Create a client for custom endpoints.
    pub fn with_endpoints(
        credentials: Arc<CredentialStore>,
        endpoints: IbmEndpoints,
    ) -> IbmResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self::from_parts(client, endpoints, credentials))
    }

    /// Create a client from the remote section of the configuration.
    pub fn from_config(
        credentials: Arc<CredentialStore>,
        config: &RemoteConfig,
    ) -> IbmResult<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds));
        if let Some(secs) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self::from_parts(builder.build()?, config.into(), credentials))
    }

    fn from_parts(
        client: Client,
        endpoints: IbmEndpoints,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        let tokens = TokenManager::new(
            client.clone(),
            endpoints.iam_token_url.clone(),
            Arc::clone(&credentials),
        );
        Self {
            client,
            endpoints,
            credentials,
            tokens,
        }
    }

    /// Replace the clock used for token expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.tokens = self.tokens.with_clock(clock);
        self
    }

    /// The bearer token cache.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Endpoint URLs in use.
    pub fn endpoints(&self) -> &IbmEndpoints {
        &self.endpoints
    }

    /// Authenticated GET of `{api_base_url}{endpoint}`, decoded as JSON.
    pub async fn request<T: DeserializeOwned>(&self, endpoint: &str) -> IbmResult<T> {
        let bearer_token = self.tokens.bearer_token().await?;
        let service_crn = self
            .credentials
            .service_crn()
            .ok_or(IbmError::MissingServiceCrn)?;
        let service_crn = header::HeaderValue::from_str(&service_crn)
            .map_err(|_| IbmError::InvalidParameter("invalid Service-CRN value".into()))?;

        let url = format!(
            "{}{}",
            self.endpoints.api_base_url.trim_end_matches('/'),
            endpoint
        );
        debug!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&bearer_token)
            .header("Service-CRN", service_crn)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());

            if status == StatusCode::FORBIDDEN {
                return Err(IbmError::AccessBlocked(format!(
                    "{endpoint} returned {status}: {body}"
                )));
            }
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            return Err(IbmError::ApiError {
                status: status.as_u16(),
                message: format!("{endpoint} failed: {body}"),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// List backends; fails on any error.
    pub async fn fetch_backends(&self) -> IbmResult<Vec<Backend>> {
        let listing: Listing<BackendRecord> = self.request("/backends").await?;
        Ok(listing
            .into_vec()
            .into_iter()
            .filter_map(BackendRecord::into_backend)
            .collect())
    }

    /// List jobs; fails on any error.
    pub async fn fetch_jobs(&self) -> IbmResult<Vec<Job>> {
        let listing: Listing<JobRecord> = self.request("/jobs").await?;
        Ok(listing
            .into_vec()
            .into_iter()
            .filter_map(JobRecord::into_job)
            .collect())
    }

    /// List backends, returning an empty list on failure.
    pub async fn get_backends(&self) -> Vec<Backend> {
        self.fetch_backends().await.unwrap_or_else(|e| {
            warn!("failed to fetch backends: {e}");
            Vec::new()
        })
    }

    /// List jobs, returning an empty list on failure.
    pub async fn get_jobs(&self) -> Vec<Job> {
        self.fetch_jobs().await.unwrap_or_else(|e| {
            warn!("failed to fetch jobs: {e}");
            Vec::new()
        })
    }
}

#[async_trait]
impl DataSource for IbmClient {
    fn name(&self) -> &str {
        "ibm-quantum"
    }

    async fn fetch_backends(&self) -> DashResult<Vec<Backend>> {
        Ok(IbmClient::fetch_backends(self).await?)
    }

    async fn fetch_jobs(&self) -> DashResult<Vec<Job>> {
        Ok(IbmClient::fetch_jobs(self).await?)
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// A listing body: a bare array, or an object wrapping one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Array(Vec<T>),
    Backends {
        #[serde(alias = "devices")]
        backends: Vec<T>,
    },
    Jobs {
        jobs: Vec<T>,
    },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Array(items) => items,
            Listing::Backends { backends } => backends,
            Listing::Jobs { jobs } => jobs,
        }
    }
}

/// Backend record as returned by `/backends`.
#[derive(Debug, Default, Deserialize)]
pub struct BackendRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub num_qubits: Option<u64>,
    #[serde(default)]
    pub pending_jobs: Option<u64>,
    #[serde(default)]
    pub queue_time: Option<f64>,
    #[serde(default)]
    pub error_rate: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub backend_type: Option<String>,
}

impl BackendRecord {
    /// Normalize into a [`Backend`]; `None` if the record has no id or name.
    pub fn into_backend(self) -> Option<Backend> {
        let id = non_empty(self.id).or_else(|| non_empty(self.name.clone()));
        let Some(id) = id else {
            warn!("skipping backend record without id");
            return None;
        };
        let name = non_empty(self.name).unwrap_or_else(|| id.clone());

        let status = match self.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("online") => BackendStatus::Online,
            Some("maintenance") => BackendStatus::Maintenance,
            _ => BackendStatus::Offline,
        };
        let kind = match self.backend_type.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("simulator") => BackendKind::Simulator,
            _ => BackendKind::Hardware,
        };

        Some(Backend {
            id,
            name,
            status,
            qubits: saturate(self.num_qubits.unwrap_or(0)),
            pending_jobs: saturate(self.pending_jobs.unwrap_or(0)),
            average_queue_time: finite_or_zero(self.queue_time),
            error_rate: finite_or_zero(self.error_rate),
            temperature: finite_or_zero(self.temperature),
            location: non_empty(self.location).unwrap_or_else(|| "Unknown".to_string()),
            kind,
        })
    }
}

/// Job record as returned by `/jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct JobRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub backend: Option<String>,
    #[serde(default)]
    pub qubits: Option<u64>,
    #[serde(default)]
    pub shots: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub position: Option<u64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub circuit_depth: Option<u64>,
    #[serde(default)]
    pub error_rate: Option<f64>,
}

impl JobRecord {
    /// Normalize into a [`Job`].
    ///
    /// `None` if the record has no id, an unknown status or no parseable
    /// creation time.
    pub fn into_job(self) -> Option<Job> {
        let Some(id) = non_empty(self.id) else {
            warn!("skipping job record without id");
            return None;
        };
        let status = match self.status.as_deref().map(str::parse::<JobStatus>) {
            Some(Ok(status)) => status,
            _ => {
                warn!(job = %id, status = ?self.status, "skipping job record with unknown status");
                return None;
            }
        };
        let Some(created_at) = parse_time(self.created_at.as_deref()) else {
            warn!(job = %id, "skipping job record without valid created_at");
            return None;
        };
        let started_at = parse_time(self.started_at.as_deref());

        let phase = match status {
            JobStatus::Queued => JobPhase::Queued {
                position: self.position.map(saturate),
            },
            JobStatus::Running => JobPhase::Running {
                started_at: started_at.unwrap_or(created_at),
            },
            JobStatus::Completed => {
                let started = started_at.unwrap_or(created_at);
                let completed = parse_time(self.completed_at.as_deref())
                    .or_else(|| {
                        self.execution_time
                            .filter(|secs| secs.is_finite() && *secs >= 0.0)
                            .map(|secs| started + chrono::Duration::milliseconds((secs * 1000.0) as i64))
                    })
                    .unwrap_or(started);
                JobPhase::completed(started, completed, self.error_rate.filter(|r| r.is_finite()))
            }
            JobStatus::Error => JobPhase::Error { started_at },
        };

        Some(Job {
            name: non_empty(self.name).unwrap_or_else(|| format!("Job {id}")),
            id,
            backend: non_empty(self.backend).unwrap_or_else(|| "unknown".to_string()),
            qubits: self.qubits.filter(|q| *q > 0).map(saturate).unwrap_or(1),
            shots: self
                .shots
                .filter(|s| *s > 0)
                .map(saturate)
                .unwrap_or(DEFAULT_SHOTS),
            circuit_depth: saturate(self.circuit_depth.unwrap_or(0)),
            user_id: non_empty(self.user_id).unwrap_or_else(|| "unknown".to_string()),
            created_at,
            phase,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn parse_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
