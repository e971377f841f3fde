//! Credential and cached-token types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tokens are treated as expired this long before Google's stated expiry
const EXPIRY_SKEW_SECS: i64 = 60;

/// Bearer token sent on every Google API call
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Who the credential acts as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// An end user who went through the consent screen
    User,
    /// A service account (robot identity)
    ServiceAccount { email: String },
}

/// A resolved, currently valid credential
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: AccessToken,
    pub expires_at: Option<DateTime<Utc>>,
    pub identity: Identity,
}

/// Token pair as persisted in the credential store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    /// Expiry from a relative `expires_in` as returned by token endpoints
    pub fn expiry_from(now: DateTime<Utc>, expires_in: Option<std::time::Duration>) -> Option<DateTime<Utc>> {
        expires_in.and_then(|d| Duration::from_std(d).ok()).map(|d| now + d)
    }

    /// True when the token is past (or within a minute of) its expiry.
    /// Tokens without an expiry never expire locally.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expires_at,
            None => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn to_credential(&self, identity: Identity) -> Credential {
        Credential {
            token: AccessToken::new(self.access_token.clone()),
            expires_at: self.expires_at,
            identity,
        }
    }
}
