//! Error types for lessondeck-core
//!
//! One error hierarchy shared by every step of the deck flow. Each variant maps
//! to a class of failure the UI reports differently: bad input is re-prompted,
//! configuration problems are fatal until fixed, API failures end the step.

use std::path::PathBuf;
use thiserror::Error;

use crate::workflow::FlowState;

/// Result alias used throughout lessondeck-core
pub type Result<T> = std::result::Result<T, DeckError>;

/// Core error type for lessondeck operations
#[derive(Error, Debug)]
pub enum DeckError {
    // ===================
    // Input Errors
    // ===================
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    // ===================
    // Auth Errors
    // ===================
    #[error("Credential configuration error: {message}")]
    AuthConfig { message: String },

    #[error("Google authorization failed: {message}")]
    AuthFlow { message: String },

    #[error("Google authorization required: open {consent_url}")]
    AuthorizationRequired { consent_url: String },

    // ===================
    // API Errors
    // ===================
    #[error("Google API error{}: {message}", status_suffix(.status))]
    Api { status: Option<u16>, message: String },

    #[error("Failed to build image archive: {message}")]
    Archive { message: String },

    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===================
    // Config / Flow Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Cannot {action} while the session is {state}")]
    InvalidTransition { state: FlowState, action: &'static str },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl DeckError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        DeckError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn auth_config(message: impl Into<String>) -> Self {
        DeckError::AuthConfig {
            message: message.into(),
        }
    }

    pub fn auth_flow(message: impl Into<String>) -> Self {
        DeckError::AuthFlow {
            message: message.into(),
        }
    }

    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        DeckError::Api {
            status,
            message: message.into(),
        }
    }

    /// Errors the user can fix without restarting the flow
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DeckError::InvalidInput { .. } | DeckError::AuthorizationRequired { .. }
        )
    }

    /// HTTP status of a failed Google call, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            DeckError::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Actionable hint shown next to the error message
    pub fn suggestion(&self) -> Option<String> {
        match self {
            DeckError::AuthConfig { .. } => Some(
                "Check LESSONDECK_OAUTH_CLIENT or LESSONDECK_SERVICE_ACCOUNT points at valid Google credentials"
                    .to_string(),
            ),
            DeckError::AuthFlow { .. } => {
                Some("Restart authorization and approve the consent screen again".to_string())
            }
            DeckError::Api {
                status: Some(401 | 403),
                ..
            } => Some(
                "The account lacks access: share the template and folder with it, or re-authorize"
                    .to_string(),
            ),
            DeckError::Api {
                status: Some(404), ..
            } => Some("Verify the presentation, template or folder id exists".to_string()),
            DeckError::FileRead { path, .. } => {
                Some(format!("Check the file exists and is readable: {}", path.display()))
            }
            DeckError::FileWrite { path, .. } => {
                Some(format!("Check write permissions for: {}", path.display()))
            }
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for DeckError {
    fn from(e: zip::result::ZipError) -> Self {
        DeckError::Archive {
            message: e.to_string(),
        }
    }
}
