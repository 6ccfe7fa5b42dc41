//! IAM bearer token cache.
//!
//! Exchanges the stored API key for a bearer token at the IBM Cloud IAM
//! endpoint and reuses it until shortly before it expires, or until the
//! credentials change.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use qdash_core::{Clock, CredentialStore, SystemClock};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{IbmError, IbmResult};

/// OAuth grant type for API key exchange.
const GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Tokens are treated as expired this many seconds before IAM says they are.
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 600;

/// Lifetime assumed when IAM omits `expires_in`.
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// IAM token response from `iam.cloud.ibm.com`.
#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// A bearer token and the credential generation it was issued under.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
    generation: u64,
}

impl CachedToken {
    fn is_valid(&self, now: DateTime<Utc>, generation: u64) -> bool {
        self.generation == generation && now < self.expires_at
    }
}

/// Issues and caches IAM bearer tokens.
///
/// The cache lock is held across the exchange, so concurrent callers that
/// find no usable token wait for one exchange instead of starting their own.
pub struct TokenManager {
    client: Client,
    iam_url: String,
    credentials: Arc<CredentialStore>,
    clock: Arc<dyn Clock>,
    cache: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("iam_url", &self.iam_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TokenManager {
    /// Create a token manager for the given IAM endpoint.
    pub fn new(client: Client, iam_url: impl Into<String>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            client,
            iam_url: iam_url.into(),
            credentials,
            clock: Arc::new(SystemClock),
            cache: Mutex::new(None),
        }
    }

    /// Replace the clock used for expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// A valid bearer token, exchanging the API key if needed.
    pub async fn bearer_token(&self) -> IbmResult<String> {
        let mut cache = self.cache.lock().await;

        let generation = self.credentials.generation();
        let now = self.clock.now();
        if let Some(token) = cache.as_ref().filter(|t| t.is_valid(now, generation)) {
            debug!("reusing cached IAM token");
            return Ok(token.access_token.clone());
        }

        let api_key = self.credentials.api_key().ok_or(IbmError::MissingApiKey)?;
        let token = self.exchange(&api_key, generation).await?;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token; the next call exchanges again.
    pub async fn invalidate(&self) {
        self.cache.lock().await.take();
    }

    async fn exchange(&self, api_key: &str, generation: u64) -> IbmResult<CachedToken> {
        let params = [("grant_type", GRANT_TYPE), ("apikey", api_key)];

        let response = self
            .client
            .post(&self.iam_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| IbmError::IamTokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            return Err(IbmError::IamTokenExchange(format!(
                "IAM returned {status}: {body}"
            )));
        }

        let iam_token: IamTokenResponse = response.json().await.map_err(|e| {
            IbmError::IamTokenExchange(format!("failed to parse IAM response: {e}"))
        })?;

        let issued_at = self.clock.now();
        let expires_in = iam_token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        let lifetime = expires_in.clamp(0, i64::from(u32::MAX)) - TOKEN_SAFETY_MARGIN_SECS;
        let expires_at = issued_at + Duration::seconds(lifetime);

        info!(%expires_at, "obtained IAM bearer token");

        Ok(CachedToken {
            access_token: iam_token.access_token,
            expires_at,
            generation,
        })
    }
}
