//! lessondeck-core - Core library for lessondeck
//!
//! Credentials, prompt building, content parsing, and the Google Slides/Drive
//! orchestration behind the lesson deck flow.

pub mod assembler;
pub mod auth;
pub mod config;
pub mod content;
pub mod deck;
pub mod error;
pub mod exporter;
pub mod google;
pub mod prompts;
pub mod publisher;
pub mod workflow;

pub use assembler::{AssemblyError, DeckAssembler};
pub use auth::{AuthMode, CredentialProvider};
pub use config::{AppConfig, NamedTemplate};
pub use content::{parse_content, CatalogKind, TemplateCatalog};
pub use deck::{DeckRef, ShareLink, SlideContent};
pub use error::{DeckError, Result};
pub use exporter::{archive_file_name, extract_presentation_id, ExportBundle, Exporter};
pub use prompts::{build_prompts, Prompt, PromptStage};
pub use publisher::Publisher;
pub use workflow::{FlowState, Services, Session, Workflow};
