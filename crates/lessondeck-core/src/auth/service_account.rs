//! Service-account credentials (JWT bearer grant)
//!
//! Signs an RS256 assertion with the key's private key and trades it at the
//! key's `token_uri`. The resulting token lives in memory only.

use super::credential::StoredToken;
use super::SCOPES;
use crate::error::{DeckError, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion (Google's maximum)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Service-account key file as downloaded from the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| DeckError::auth_config(format!("invalid service-account key: {e}")))?;

        if key.key_type != "service_account" {
            return Err(DeckError::auth_config(format!(
                "expected a service_account key, got type \"{}\"",
                key.key_type
            )));
        }

        Ok(key)
    }
}

/// JWT claim set for the bearer grant
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct TokenEndpointError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Issues access tokens for one service account
pub struct ServiceAccountAuthorizer {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<StoredToken>>,
}

impl ServiceAccountAuthorizer {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            DeckError::auth_config(format!("service-account private key is not valid RSA PEM: {e}"))
        })?;

        Ok(Self {
            key,
            signing_key,
            http,
            cached: Mutex::new(None),
        })
    }

    pub fn email(&self) -> &str {
        &self.key.client_email
    }

    pub fn claims(&self, now: DateTime<Utc>) -> AssertionClaims {
        let iat = now.timestamp();
        AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: SCOPES.join(" "),
            aud: self.key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Signed JWT assertion
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        jsonwebtoken::encode(&header, &self.claims(now), &self.signing_key)
            .map_err(|e| DeckError::auth_config(format!("cannot sign service-account assertion: {e}")))
    }

    /// Cached token, or a fresh one when the cached token is near expiry
    pub async fn token(&self) -> Result<StoredToken> {
        let now = Utc::now();
        let cached = self.cached.lock().clone();
        if let Some(token) = cached.filter(|t| !t.is_expired(now)) {
            return Ok(token);
        }

        let token = self.fetch_token(now).await?;
        *self.cached.lock() = Some(token.clone());
        Ok(token)
    }

    async fn fetch_token(&self, now: DateTime<Utc>) -> Result<StoredToken> {
        let assertion = self.assertion(now)?;
        tracing::info!("Requesting service-account token for {}", self.key.client_email);

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| DeckError::auth_flow(format!("service-account token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DeckError::auth_flow(format!("cannot read token response: {e}")))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenEndpointError>(&body) {
                Ok(err) => match err.error_description {
                    Some(desc) => format!("{}: {}", err.error, desc),
                    None => err.error,
                },
                Err(_) => format!("HTTP {status}"),
            };
            return Err(DeckError::auth_flow(format!(
                "service-account token rejected: {message}"
            )));
        }

        let parsed: TokenEndpointResponse = serde_json::from_str(&body)
            .map_err(|e| DeckError::auth_flow(format!("unexpected token response: {e}")))?;

        Ok(StoredToken {
            access_token: parsed.access_token,
            refresh_token: None,
            expires_at: StoredToken::expiry_from(
                now,
                parsed.expires_in.map(std::time::Duration::from_secs),
            ),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        })
    }
}
