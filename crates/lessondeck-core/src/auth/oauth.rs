//! # Google OAuth 2.0 user flow
//!
//! Authorization Code flow with PKCE against Google's endpoints, requesting
//! offline access so a refresh token is issued.
//!
//! ## Flow
//!
//! 1. [`UserAuthorizer::authorization_url`] builds the consent URL, generates
//!    a PKCE challenge and remembers the CSRF state + verifier for ten minutes.
//! 2. Google redirects back with `?code=...&state=...`.
//! 3. [`UserAuthorizer::exchange_code`] consumes the pending state (a state is
//!    usable once) and trades the code + verifier for a token pair.
//! 4. [`UserAuthorizer::refresh`] renews an expired access token.

use super::credential::StoredToken;
use super::SCOPES;
use crate::error::{DeckError, Result};
use chrono::Utc;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenResponse,
    TokenUrl,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// How long a consent URL stays redeemable
const PENDING_TTL: Duration = Duration::from_secs(10 * 60);

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// OAuth client secrets as downloaded from the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<OAuthClientSecrets>,
    web: Option<OAuthClientSecrets>,
}

impl OAuthClientSecrets {
    /// Parse `{"installed": {...}}`, `{"web": {...}}` or a bare client object
    pub fn from_json(json: &str) -> Result<Self> {
        if let Ok(file) = serde_json::from_str::<ClientSecretsFile>(json) {
            if let Some(secrets) = file.installed.or(file.web) {
                return Ok(secrets);
            }
        }

        serde_json::from_str::<OAuthClientSecrets>(json)
            .map_err(|e| DeckError::auth_config(format!("invalid OAuth client secrets: {e}")))
    }
}

/// Consent URL handed to the user
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

struct PendingAuthorization {
    verifier: String,
    redirect: RedirectUrl,
    expires: Instant,
}

/// Google OAuth handler for end-user consent.
pub struct UserAuthorizer {
    client: ConfiguredClient,
    http: reqwest::Client,
    redirect: RedirectUrl,
    pending: Mutex<HashMap<String, PendingAuthorization>>,
}

impl UserAuthorizer {
    /// Create a handler for `secrets`, redirecting to `redirect_uri` by default.
    pub fn new(secrets: &OAuthClientSecrets, redirect_uri: &str) -> Result<Self> {
        let auth_url = AuthUrl::new(secrets.auth_uri.clone())
            .map_err(|e| DeckError::auth_config(format!("invalid auth_uri: {e}")))?;
        let token_url = TokenUrl::new(secrets.token_uri.clone())
            .map_err(|e| DeckError::auth_config(format!("invalid token_uri: {e}")))?;
        let redirect = parse_redirect(redirect_uri)?;

        let client = BasicClient::new(ClientId::new(secrets.client_id.clone()))
            .set_client_secret(ClientSecret::new(secrets.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url);

        // Token endpoints must not follow redirects (SSRF hardening)
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| DeckError::auth_config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            http,
            redirect,
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// Generate a consent URL with PKCE.
    ///
    /// `redirect_override` replaces the configured redirect URI, which the
    /// CLI uses for its loopback listener.
    pub fn authorization_url(&self, redirect_override: Option<&str>) -> Result<AuthorizationRequest> {
        let redirect = match redirect_override {
            Some(uri) => parse_redirect(uri)?,
            None => self.redirect.clone(),
        };

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .set_redirect_uri(Cow::Owned(redirect.clone()))
            .url();

        let state = csrf_state.secret().clone();
        let now = Instant::now();
        let mut pending = self.pending.lock();
        pending.retain(|_, p| p.expires > now);
        pending.insert(
            state.clone(),
            PendingAuthorization {
                verifier: pkce_verifier.secret().clone(),
                redirect,
                expires: now + PENDING_TTL,
            },
        );

        Ok(AuthorizationRequest {
            url: auth_url.to_string(),
            state,
        })
    }

    /// Number of consent URLs still awaiting a callback
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(&self, state: &str, code: &str) -> Result<StoredToken> {
        let pending = self
            .pending
            .lock()
            .remove(state)
            .filter(|p| p.expires > Instant::now())
            .ok_or_else(|| DeckError::auth_flow("invalid or expired OAuth state"))?;

        if code.trim().is_empty() {
            return Err(DeckError::auth_flow("authorization code is empty"));
        }

        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.trim().to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pending.verifier))
            .set_redirect_uri(Cow::Owned(pending.redirect))
            .request_async(&self.http)
            .await
            .map_err(|e| DeckError::auth_flow(format!("token exchange failed: {e}")))?;

        tracing::info!("Google authorization completed");
        Ok(stored_from_response(&response, None))
    }

    /// Renew an expired access token, keeping the old refresh token when
    /// Google does not rotate it.
    pub async fn refresh(&self, token: &StoredToken) -> Result<StoredToken> {
        let refresh = token
            .refresh_token
            .clone()
            .ok_or_else(|| DeckError::auth_flow("cached token has no refresh token"))?;

        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh.clone()))
            .request_async(&self.http)
            .await
            .map_err(|e| DeckError::auth_flow(format!("token refresh failed: {e}")))?;

        tracing::debug!("Refreshed Google access token");
        Ok(stored_from_response(&response, Some(refresh)))
    }
}

fn parse_redirect(uri: &str) -> Result<RedirectUrl> {
    RedirectUrl::new(uri.to_string())
        .map_err(|e| DeckError::auth_config(format!("invalid redirect URI {uri}: {e}")))
}

fn stored_from_response(response: &BasicTokenResponse, previous_refresh: Option<String>) -> StoredToken {
    StoredToken {
        access_token: response.access_token().secret().clone(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or(previous_refresh),
        expires_at: StoredToken::expiry_from(Utc::now(), response.expires_in()),
        scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTALLED: &str = r#"{
        "installed": {
            "client_id": "1234.apps.googleusercontent.com",
            "client_secret": "GOCSPX-secret",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn test_parse_installed_and_web_secrets() {
        let secrets = OAuthClientSecrets::from_json(INSTALLED).unwrap();
        assert_eq!(secrets.client_id, "1234.apps.googleusercontent.com");
        assert_eq!(secrets.redirect_uris, vec!["http://localhost"]);

        let web = OAuthClientSecrets::from_json(
            r#"{"web": {"client_id": "web-id", "client_secret": "s"}}"#,
        )
        .unwrap();
        assert_eq!(web.client_id, "web-id");
        assert_eq!(web.token_uri, GOOGLE_TOKEN_URI);
    }

    #[test]
    fn test_parse_bare_and_invalid_secrets() {
        let bare =
            OAuthClientSecrets::from_json(r#"{"client_id": "bare", "client_secret": "s"}"#).unwrap();
        assert_eq!(bare.auth_uri, GOOGLE_AUTH_URI);

        assert!(matches!(
            OAuthClientSecrets::from_json(r#"{"installed": {"client_id": "x"}}"#),
            Err(DeckError::AuthConfig { .. })
        ));
    }

    #[test]
    fn test_authorization_url_contents() {
        let secrets = OAuthClientSecrets::from_json(INSTALLED).unwrap();
        let authorizer =
            UserAuthorizer::new(&secrets, "http://localhost:3333/auth/callback").unwrap();

        let request = authorizer.authorization_url(None).unwrap();
        assert!(request.url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(request.url.contains("client_id=1234.apps.googleusercontent.com"));
        assert!(request.url.contains("access_type=offline"));
        assert!(request.url.contains("code_challenge_method=S256"));
        assert!(request.url.contains("presentations"));
        assert!(request.url.contains(&format!("state={}", request.state)));
        assert_eq!(authorizer.pending_count(), 1);
    }

    #[test]
    fn test_redirect_override() {
        let secrets = OAuthClientSecrets::from_json(INSTALLED).unwrap();
        let authorizer = UserAuthorizer::new(&secrets, "http://localhost:3333/auth/callback").unwrap();
        let request = authorizer
            .authorization_url(Some("http://127.0.0.1:49152/"))
            .unwrap();
        assert!(request.url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A49152%2F"));
    }

    #[tokio::test]
    async fn test_exchange_rejects_unknown_state() {
        let secrets = OAuthClientSecrets::from_json(INSTALLED).unwrap();
        let authorizer = UserAuthorizer::new(&secrets, "http://localhost:3333/auth/callback").unwrap();
        let result = authorizer.exchange_code("forged-state", "4/0AX4").await;
        assert!(matches!(result, Err(DeckError::AuthFlow { .. })));
    }

    #[tokio::test]
    async fn test_state_is_single_use() {
        let secrets = OAuthClientSecrets::from_json(INSTALLED).unwrap();
        let authorizer = UserAuthorizer::new(&secrets, "http://localhost:3333/auth/callback").unwrap();
        let request = authorizer.authorization_url(None).unwrap();

        // Empty code fails after the state was consumed, without any network call
        let first = authorizer.exchange_code(&request.state, "  ").await;
        assert!(matches!(first, Err(DeckError::AuthFlow { .. })));
        assert_eq!(authorizer.pending_count(), 0);

        let second = authorizer.exchange_code(&request.state, "4/0AX4").await;
        assert!(matches!(second, Err(DeckError::AuthFlow { .. })));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let secrets = OAuthClientSecrets::from_json(INSTALLED).unwrap();
        let authorizer = UserAuthorizer::new(&secrets, "http://localhost:3333/auth/callback").unwrap();
        let token = StoredToken {
            access_token: "old".to_string(),
            refresh_token: None,
            expires_at: None,
            scopes: vec![],
        };
        assert!(matches!(
            authorizer.refresh(&token).await,
            Err(DeckError::AuthFlow { .. })
        ));
    }
}
