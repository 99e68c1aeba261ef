// Service-account OAuth for the Sheets API
//
// Signs an RS256 JWT assertion with the account's private key, exchanges it
// at the token endpoint and caches the access token until shortly before it
// expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use lineup_core::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Assertion lifetime requested from the token endpoint (the maximum allowed)
const ASSERTION_TTL_SECS: i64 = 3600;

/// A cached token is replaced this long before it expires
const REFRESH_MARGIN_SECS: i64 = 60;

/// The fields of a service-account key file this adapter needs
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Config(format!("invalid service account key: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "cannot read credentials file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_TTL_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

enum Source {
    ServiceAccount {
        key: ServiceAccountKey,
        signing_key: EncodingKey,
    },
    /// Pre-issued bearer token, used as-is
    Static(String),
}

/// Hands out bearer tokens for Sheets requests
pub struct TokenProvider {
    source: Source,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn service_account(key: ServiceAccountKey) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AppError::Config(format!("invalid service account private key: {e}")))?;
        Ok(Self {
            source: Source::ServiceAccount { key, signing_key },
            cache: Mutex::new(None),
        })
    }

    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: Source::Static(token.into()),
            cache: Mutex::new(None),
        }
    }

    /// A valid access token, fetching a new one when the cached one is stale
    pub async fn access_token(&self, client: &reqwest::Client) -> Result<String> {
        let (key, signing_key) = match &self.source {
            Source::Static(token) => return Ok(token.clone()),
            Source::ServiceAccount { key, signing_key } => (key, signing_key),
        };

        // Held across the exchange so concurrent callers share one refresh
        let mut cache = self.cache.lock().await;
        let now = Utc::now();
        if let Some(token) = cache.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let assertion = sign_assertion(key, signing_key, now)?;
        let response = client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Store(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Store(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Store(format!("invalid token response: {e}")))?;

        debug!(expires_in = token.expires_in, "Obtained Sheets access token");
        let cached = CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        };
        let value = cached.value.clone();
        *cache = Some(cached);
        Ok(value)
    }
}

fn sign_assertion(
    key: &ServiceAccountKey,
    signing_key: &EncodingKey,
    now: DateTime<Utc>,
) -> Result<String> {
    let iat = now.timestamp();
    let claims = Claims {
        iss: &key.client_email,
        scope: SHEETS_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_TTL_SECS,
    };
    encode(&Header::new(Algorithm::RS256), &claims, signing_key)
        .map_err(|e| AppError::Internal(format!("failed to sign token assertion: {e}")))
}
