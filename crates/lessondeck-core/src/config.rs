//! Startup configuration for lessondeck
//!
//! Loaded once from `lessondeck.toml` (optional) and then overridden by CLI
//! flags. The credential mode chosen here is fixed for the process lifetime.

use crate::content::CatalogKind;
use crate::error::{DeckError, Result};
use crate::google::ThumbnailSize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "lessondeck.toml";

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub auth: AuthSettings,
    pub deck: DeckSettings,
    pub server: ServerSettings,
}

/// Credential mode and credential material
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Use a service account instead of per-user OAuth consent
    pub use_service_account: bool,

    /// Service-account key: file path or inline JSON
    pub service_account: Option<String>,

    /// OAuth client secrets (`installed` or `web`): file path or inline JSON
    pub oauth_client: Option<String>,

    /// Where the OAuth user token is cached
    pub token_cache: Option<PathBuf>,

    /// Redirect URI registered for the web OAuth client
    pub redirect_uri: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            use_service_account: false,
            service_account: None,
            oauth_client: None,
            token_cache: None,
            redirect_uri: "http://localhost:3333/auth/callback".to_string(),
        }
    }
}

impl AuthSettings {
    /// Token cache path, falling back to `<cache dir>/lessondeck/token.json`
    pub fn token_cache_path(&self) -> PathBuf {
        self.token_cache.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .map(|dir| dir.join("lessondeck").join("token.json"))
                .unwrap_or_else(|| PathBuf::from("token.json"))
        })
    }
}

/// A template the user can pick, with the placeholder set it is built around
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedTemplate {
    /// Name shown in the template picker and accepted by `--template`
    pub name: String,

    /// Presentation to copy; blank decks are built when unset
    #[serde(default)]
    pub presentation_id: Option<String>,

    #[serde(default)]
    pub catalog: CatalogKind,
}

impl NamedTemplate {
    /// Blank-deck template over the lesson deck catalog
    pub fn blank() -> Self {
        Self {
            name: "Lesson Deck".to_string(),
            presentation_id: None,
            catalog: CatalogKind::LessonDeck,
        }
    }
}

/// How decks are produced and exported
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckSettings {
    /// Templates offered to the user, in display order
    pub templates: Vec<NamedTemplate>,

    /// Template used when none is chosen; the first one when unset
    pub default_template: Option<String>,

    /// Drive folder the new deck is moved into
    pub destination_folder: Option<String>,

    /// Thumbnail sizes tried in order for each exported slide
    pub thumbnail_sizes: Vec<ThumbnailSize>,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            templates: vec![NamedTemplate::blank()],
            default_template: None,
            destination_folder: None,
            thumbnail_sizes: vec![
                ThumbnailSize::Large,
                ThumbnailSize::Medium,
                ThumbnailSize::Small,
            ],
        }
    }
}

impl DeckSettings {
    /// Drive folder URL for the "Open folder" link
    pub fn folder_url(&self) -> Option<String> {
        self.destination_folder
            .as_ref()
            .map(|id| format!("https://drive.google.com/drive/folders/{id}"))
    }

    /// Template named `name`, or the default one when `name` is `None`
    pub fn template(&self, name: Option<&str>) -> Result<&NamedTemplate> {
        let wanted = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or(self.default_template.as_deref());

        let found = match wanted {
            Some(wanted) => self.templates.iter().find(|t| t.name == wanted),
            None => self.templates.first(),
        };

        found.ok_or_else(|| {
            DeckError::invalid_input(format!(
                "unknown template {:?}; available: {}",
                wanted.unwrap_or_default(),
                self.template_names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.name.as_str())
    }

    /// Point the default template at another presentation
    pub fn set_default_presentation(&mut self, presentation_id: String) {
        let index = self
            .default_template
            .as_deref()
            .and_then(|name| self.templates.iter().position(|t| t.name == name))
            .unwrap_or(0);
        match self.templates.get_mut(index) {
            Some(template) => template.presentation_id = Some(presentation_id),
            None => self.templates.push(NamedTemplate {
                presentation_id: Some(presentation_id),
                ..NamedTemplate::blank()
            }),
        }
    }

    /// Reject template and export settings that cannot produce a deck
    pub fn validate(&self) -> Result<()> {
        if self.templates.is_empty() {
            return Err(DeckError::InvalidConfig {
                message: "at least one deck template is required".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for template in &self.templates {
            if template.name.trim().is_empty() {
                return Err(DeckError::InvalidConfig {
                    message: "template names must not be empty".to_string(),
                });
            }
            if !seen.insert(template.name.as_str()) {
                return Err(DeckError::InvalidConfig {
                    message: format!("template {:?} is listed twice", template.name),
                });
            }
            if matches!(template.presentation_id.as_deref(), Some(id) if id.trim().is_empty()) {
                return Err(DeckError::InvalidConfig {
                    message: format!("template {:?} has an empty presentation_id", template.name),
                });
            }
        }

        if let Some(name) = &self.default_template {
            if !seen.contains(name.as_str()) {
                return Err(DeckError::InvalidConfig {
                    message: format!("default_template {name:?} is not a configured template"),
                });
            }
        }

        if self.thumbnail_sizes.is_empty() {
            return Err(DeckError::InvalidConfig {
                message: "at least one thumbnail size is required".to_string(),
            });
        }

        Ok(())
    }
}

/// Web server binding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: IpAddr,
    pub port: u16,

    /// Minutes without a request before a browser session is dropped
    pub session_idle_minutes: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3333,
            session_idle_minutes: 120,
        }
    }
}

impl ServerSettings {
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_minutes * 60)
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from `lessondeck.toml` if present,
    /// or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|source| DeckError::FileRead {
            path: path.clone(),
            source,
        })?;

        let config = Self::from_toml(&content)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DeckError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Reject setups that cannot work before any request is served
    pub fn validate(&self) -> Result<()> {
        if self.auth.use_service_account {
            if self.auth.service_account.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err(DeckError::auth_config(
                    "service-account mode is enabled but no service-account key was provided",
                ));
            }
        } else if self.auth.oauth_client.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(DeckError::auth_config(
                "OAuth mode requires client secrets (set LESSONDECK_OAUTH_CLIENT)",
            ));
        }

        if self.server.port == 0 {
            return Err(DeckError::InvalidConfig {
                message: "server port must be non-zero".to_string(),
            });
        }

        if self.server.session_idle_minutes == 0 {
            return Err(DeckError::InvalidConfig {
                message: "session_idle_minutes must be non-zero".to_string(),
            });
        }

        self.deck.validate()
    }
}

/// Credential material given either inline or as a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Inline(String),
    File(PathBuf),
}

impl CredentialSource {
    /// Inline JSON when the value starts with `{`, otherwise a file path
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.starts_with('{') {
            CredentialSource::Inline(trimmed.to_string())
        } else {
            CredentialSource::File(PathBuf::from(trimmed))
        }
    }

    /// Read the JSON text
    pub fn read(&self) -> Result<String> {
        match self {
            CredentialSource::Inline(json) => Ok(json.clone()),
            CredentialSource::File(path) => {
                std::fs::read_to_string(path).map_err(|e| {
                    DeckError::auth_config(format!(
                        "cannot read credential file {}: {}",
                        path.display(),
                        e
                    ))
                })
            }
        }
    }
}
