//! Credential Provider
//!
//! Resolves Google credentials in one of two modes fixed at startup:
//! a service account (robot identity) or an end user through OAuth consent.

pub mod credential;
pub mod oauth;
pub mod service_account;
pub mod store;

pub use credential::{AccessToken, Credential, Identity, StoredToken};
pub use oauth::{AuthorizationRequest, OAuthClientSecrets, UserAuthorizer};
pub use service_account::{ServiceAccountAuthorizer, ServiceAccountKey};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

use crate::config::{AuthSettings, CredentialSource};
use crate::error::{DeckError, Result};
use chrono::Utc;
use std::sync::Arc;

/// Scopes requested in both modes
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/presentations",
];

/// Credential mode selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    ServiceAccount,
    OAuthUser,
}

enum Backend {
    ServiceAccount(ServiceAccountAuthorizer),
    User {
        authorizer: UserAuthorizer,
        store: Arc<dyn CredentialStore>,
    },
}

/// Resolves a valid credential for every Google call
pub struct CredentialProvider {
    backend: Backend,
}

impl CredentialProvider {
    /// Build the provider described by `settings`, using the file token cache
    pub fn from_settings(settings: &AuthSettings, http: reqwest::Client) -> Result<Self> {
        if settings.use_service_account {
            let material = settings
                .service_account
                .as_deref()
                .ok_or_else(|| DeckError::auth_config("no service-account key configured"))?;
            let key = ServiceAccountKey::from_json(&CredentialSource::parse(material).read()?)?;
            return Self::service_account(key, http);
        }

        let material = settings
            .oauth_client
            .as_deref()
            .ok_or_else(|| DeckError::auth_config("no OAuth client secrets configured"))?;
        let secrets = OAuthClientSecrets::from_json(&CredentialSource::parse(material).read()?)?;
        let store = Arc::new(FileCredentialStore::new(settings.token_cache_path()));
        Self::oauth_user(&secrets, &settings.redirect_uri, store)
    }

    pub fn service_account(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self> {
        let authorizer = ServiceAccountAuthorizer::new(key, http)?;
        tracing::info!("Using service account {}", authorizer.email());
        Ok(Self {
            backend: Backend::ServiceAccount(authorizer),
        })
    }

    pub fn oauth_user(
        secrets: &OAuthClientSecrets,
        redirect_uri: &str,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let authorizer = UserAuthorizer::new(secrets, redirect_uri)?;
        Ok(Self {
            backend: Backend::User { authorizer, store },
        })
    }

    pub fn mode(&self) -> AuthMode {
        match self.backend {
            Backend::ServiceAccount(_) => AuthMode::ServiceAccount,
            Backend::User { .. } => AuthMode::OAuthUser,
        }
    }

    /// Return a valid credential.
    ///
    /// In OAuth mode a missing or unrefreshable token yields
    /// [`DeckError::AuthorizationRequired`] carrying a fresh consent URL.
    pub async fn resolve(&self) -> Result<Credential> {
        match &self.backend {
            Backend::ServiceAccount(authorizer) => {
                let token = authorizer.token().await?;
                Ok(token.to_credential(Identity::ServiceAccount {
                    email: authorizer.email().to_string(),
                }))
            }
            Backend::User { authorizer, store } => {
                if let Some(token) = store.load()? {
                    if !token.is_expired(Utc::now()) {
                        return Ok(token.to_credential(Identity::User));
                    }

                    if token.can_refresh() {
                        match authorizer.refresh(&token).await {
                            Ok(refreshed) => {
                                store.save(&refreshed)?;
                                return Ok(refreshed.to_credential(Identity::User));
                            }
                            Err(e) => {
                                tracing::warn!("Token refresh failed, consent needed again: {}", e)
                            }
                        }
                    }
                }

                let request = authorizer.authorization_url(None)?;
                Err(DeckError::AuthorizationRequired {
                    consent_url: request.url,
                })
            }
        }
    }

    /// Start the consent flow explicitly (OAuth mode only)
    pub fn begin_authorization(&self, redirect_override: Option<&str>) -> Result<AuthorizationRequest> {
        match &self.backend {
            Backend::User { authorizer, .. } => authorizer.authorization_url(redirect_override),
            Backend::ServiceAccount(_) => Err(DeckError::auth_config(
                "interactive authorization is not used in service-account mode",
            )),
        }
    }

    /// Finish the consent flow: exchange `code`, cache the token
    pub async fn complete_authorization(&self, state: &str, code: &str) -> Result<Credential> {
        match &self.backend {
            Backend::User { authorizer, store } => {
                let token = authorizer.exchange_code(state, code).await?;
                store.save(&token)?;
                Ok(token.to_credential(Identity::User))
            }
            Backend::ServiceAccount(_) => Err(DeckError::auth_config(
                "interactive authorization is not used in service-account mode",
            )),
        }
    }
}
