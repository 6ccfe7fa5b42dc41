//! qdash data source for IBM Quantum Cloud
//!
//! This crate lists backends and jobs from the IBM Quantum Cloud REST API
//! (`https://quantum.cloud.ibm.com/api/v1`) and normalizes them into the
//! `qdash-core` model.
//!
//! # Authentication
//!
//! Requests need an IBM Cloud API key and the service CRN of a Quantum
//! instance, both read from the shared [`CredentialStore`]. The API key is
//! exchanged for an IAM bearer token at
//! `https://iam.cloud.ibm.com/identity/token`; the token is cached until ten
//! minutes before it expires or until the credentials change.
//!
//! | Status | Error |
//! |--------|-------|
//! | no API key / CRN | [`IbmError::MissingApiKey`] / [`IbmError::MissingServiceCrn`] |
//! | IAM failure | [`IbmError::IamTokenExchange`] |
//! | listing 403 | [`IbmError::AccessBlocked`] |
//! | other non-2xx | [`IbmError::ApiError`] |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qdash_adapter_ibm::IbmClient;
//! use qdash_core::{CredentialStore, Dashboard};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials = Arc::new(CredentialStore::open_default()?);
//!     let client = Arc::new(IbmClient::new(Arc::clone(&credentials))?);
//!     let dashboard = Dashboard::new(credentials).with_source(client);
//!
//!     for job in dashboard.get_jobs().await {
//!         println!("{} {} {}", job.id, job.status(), job.backend);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! [`CredentialStore`]: qdash_core::CredentialStore

mod api;
mod error;
mod token;

pub use api::{BackendRecord, IbmClient, IbmEndpoints, JobRecord};
pub use error::{IbmError, IbmResult};
pub use token::{TOKEN_SAFETY_MARGIN_SECS, TokenManager};
