//! Per-session flow state machine
//!
//! `Idle -> Authenticated -> PromptsGenerated -> ContentApproved ->
//! DeckCreated -> Published -> Exported`, plus a terminal `Failed`.
//! Repeating the current step keeps the state. Rejected input and pending
//! authorization leave the state alone; any other step error fails the
//! session.

use crate::assembler::DeckAssembler;
use crate::auth::{CredentialProvider, Identity};
use crate::config::{AppConfig, DeckSettings, NamedTemplate};
use crate::content::{parse_content, ApprovedContent, LimitWarning};
use crate::deck::{deck_title, DeckRef, ShareLink};
use crate::error::{DeckError, Result};
use crate::exporter::{extract_presentation_id, ExportBundle, Exporter};
use crate::google::{DriveApi, GoogleClient, SlidesApi};
use crate::prompts::{build_prompts, slide_content_prompt, Prompt};
use crate::publisher::Publisher;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Where a session is in the deck flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    Idle,
    Authenticated,
    PromptsGenerated,
    ContentApproved,
    DeckCreated,
    Published,
    Exported,
    Failed(String),
}

impl FlowState {
    pub fn is_failed(&self) -> bool {
        matches!(self, FlowState::Failed(_))
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Idle => f.write_str("idle"),
            FlowState::Authenticated => f.write_str("authenticated"),
            FlowState::PromptsGenerated => f.write_str("prompts generated"),
            FlowState::ContentApproved => f.write_str("content approved"),
            FlowState::DeckCreated => f.write_str("deck created"),
            FlowState::Published => f.write_str("published"),
            FlowState::Exported => f.write_str("exported"),
            FlowState::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// Everything one user has produced so far
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: FlowState,
    pub identity: Option<Identity>,
    pub topic: Option<String>,
    /// Template picked with the topic; its catalog drives the later steps
    pub template: Option<NamedTemplate>,
    pub prompts: Option<[Prompt; 3]>,
    pub slide_prompt: Option<String>,
    pub content: Option<ApprovedContent>,
    pub warnings: Vec<LimitWarning>,
    pub deck: Option<DeckRef>,
    pub share_link: Option<ShareLink>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    fn require(&self, action: &'static str, allowed: bool) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(DeckError::InvalidTransition {
                state: self.state.clone(),
                action,
            })
        }
    }

    /// Fail the session unless the error is one the user can fix in place
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if !e.is_recoverable() {
                tracing::warn!("Session failed: {}", e);
                self.state = FlowState::Failed(e.to_string());
            }
        }
        result
    }
}

/// Shared, process-wide collaborators of every session
pub struct Services {
    pub credentials: Arc<CredentialProvider>,
    pub slides: Arc<dyn SlidesApi>,
    pub drive: Arc<dyn DriveApi>,
    pub deck: DeckSettings,
}

impl Services {
    pub fn new(
        credentials: Arc<CredentialProvider>,
        slides: Arc<dyn SlidesApi>,
        drive: Arc<dyn DriveApi>,
        deck: DeckSettings,
    ) -> Self {
        Self {
            credentials,
            slides,
            drive,
            deck,
        }
    }

    /// Wire the real Google client from startup configuration
    pub fn from_config(config: &AppConfig, http: reqwest::Client) -> Result<Self> {
        let credentials = Arc::new(CredentialProvider::from_settings(&config.auth, http.clone())?);
        let google = Arc::new(GoogleClient::new(http, Arc::clone(&credentials)));
        Ok(Self::new(
            credentials,
            google.clone(),
            google,
            config.deck.clone(),
        ))
    }

    pub fn assembler(&self) -> DeckAssembler {
        DeckAssembler::new(Arc::clone(&self.slides), Arc::clone(&self.drive))
    }

    pub fn publisher(&self) -> Publisher {
        Publisher::new(Arc::clone(&self.drive))
    }

    pub fn exporter(&self) -> Exporter {
        Exporter::new(Arc::clone(&self.slides), self.deck.thumbnail_sizes.clone())
    }
}

/// Drives sessions through the flow
#[derive(Clone)]
pub struct Workflow {
    services: Arc<Services>,
}

impl Workflow {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Resolve credentials for the session.
    ///
    /// In OAuth mode without a cached token this returns
    /// [`DeckError::AuthorizationRequired`] and the session stays idle.
    pub async fn authenticate(&self, session: &mut Session) -> Result<()> {
        session.require("authenticate", !session.state.is_failed())?;

        let resolved = self.services.credentials.resolve().await;
        let credential = session.settle(resolved)?;
        tracing::info!("Session authenticated as {:?}", credential.identity);

        session.identity = Some(credential.identity);
        if session.state == FlowState::Idle {
            session.state = FlowState::Authenticated;
        }
        Ok(())
    }

    /// Build the three design prompts and the slide-content prompt for `topic`.
    /// `template` names one of the configured templates; `None` picks the
    /// default one.
    pub fn generate_prompts<'s>(
        &self,
        session: &'s mut Session,
        topic: &str,
        template: Option<&str>,
    ) -> Result<&'s [Prompt; 3]> {
        session.require(
            "generate prompts",
            matches!(
                session.state,
                FlowState::Authenticated | FlowState::PromptsGenerated
            ),
        )?;

        let template = self.services.deck.template(template)?.clone();
        let prompts = build_prompts(topic)?;
        let slide_prompt = slide_content_prompt(topic, &template.catalog.catalog())?;

        tracing::debug!("Prompts built for template {:?}", template.name);
        session.topic = Some(topic.trim().to_string());
        session.template = Some(template);
        session.slide_prompt = Some(slide_prompt);
        session.state = FlowState::PromptsGenerated;
        Ok(session.prompts.insert(prompts))
    }

    /// Parse pasted AI output; every catalog placeholder must be present.
    /// Returns fields that exceed their character limit.
    pub fn approve_content<'s>(&self, session: &'s mut Session, text: &str) -> Result<&'s [LimitWarning]> {
        session.require(
            "approve content",
            matches!(
                session.state,
                FlowState::PromptsGenerated | FlowState::ContentApproved
            ),
        )?;

        if text.trim().is_empty() {
            return Err(DeckError::invalid_input("paste the AI output before continuing"));
        }

        let catalog = self.template_of(session)?.catalog.catalog();
        let parsed = parse_content(text, &catalog);
        let warnings = parsed.over_limit(&catalog);
        let approved = parsed.approve(&catalog)?;

        tracing::info!(
            "Content approved ({} field(s) over their limit)",
            warnings.len()
        );
        session.content = Some(approved);
        session.warnings = warnings;
        session.state = FlowState::ContentApproved;
        Ok(&session.warnings)
    }

    /// Build the deck, copying the chosen template's presentation when it has
    /// one.
    ///
    /// A partial deck is kept on the session only when the session fails. When
    /// the error can be fixed in place (pending authorization) the deck stays
    /// unset so the step can be retried.
    pub async fn create_deck<'s>(&self, session: &'s mut Session) -> Result<&'s DeckRef> {
        session.require(
            "create a deck",
            session.state == FlowState::ContentApproved && session.deck.is_none(),
        )?;
        let Some(content) = session.content.clone() else {
            return Err(DeckError::invalid_input("no approved content"));
        };

        let title = deck_title(content.title(), session.topic.as_deref(), Utc::now());
        let template = self.template_of(session)?;
        let catalog = template.catalog.catalog();
        let assembler = self.services.assembler();

        let result = match template.presentation_id.as_deref() {
            Some(template_id) => {
                assembler
                    .from_template(
                        template_id,
                        &title,
                        self.services.deck.destination_folder.as_deref(),
                        &content.replacements(&catalog),
                    )
                    .await
            }
            None => assembler.create_deck(&title, &content.to_slides(&catalog)).await,
        };

        match result {
            Ok(deck) => {
                session.state = FlowState::DeckCreated;
                Ok(session.deck.insert(deck))
            }
            Err(e) if e.source.is_recoverable() => {
                if let Some(partial) = &e.partial {
                    tracing::warn!(
                        "Abandoning partial deck {} until the step is retried",
                        partial.presentation_id
                    );
                }
                Err(e.source)
            }
            Err(e) => {
                // The partial deck stays reachable for the user
                session.deck = e.partial;
                session.settle(Err(e.source))
            }
        }
    }

    /// Share the session's deck with anyone holding the link
    pub async fn publish<'s>(&self, session: &'s mut Session) -> Result<&'s ShareLink> {
        session.require(
            "publish",
            matches!(
                session.state,
                FlowState::DeckCreated | FlowState::Published | FlowState::Exported
            ),
        )?;
        let Some(deck_id) = session.deck.as_ref().map(|d| d.presentation_id.clone()) else {
            return Err(DeckError::invalid_input("no deck to publish"));
        };

        let published = self.services.publisher().publish(&deck_id).await;
        let link = session.settle(published)?;

        if session.state == FlowState::DeckCreated {
            session.state = FlowState::Published;
        }
        Ok(session.share_link.insert(link))
    }

    /// Slide images of the session's deck
    pub async fn export(&self, session: &mut Session) -> Result<ExportBundle> {
        session.require(
            "export images",
            matches!(session.state, FlowState::Published | FlowState::Exported),
        )?;
        let Some(deck_id) = session.deck.as_ref().map(|d| d.presentation_id.clone()) else {
            return Err(DeckError::invalid_input("no deck to export"));
        };

        let exported = self.services.exporter().export_images(&deck_id).await;
        let bundle = session.settle(exported)?;
        session.state = FlowState::Exported;
        Ok(bundle)
    }

    /// The session's template, or the default one for sessions that predate
    /// the choice
    fn template_of(&self, session: &Session) -> Result<NamedTemplate> {
        match &session.template {
            Some(template) => Ok(template.clone()),
            None => self.services.deck.template(None).cloned(),
        }
    }

    /// Slide images of any deck the configured identity can read
    pub async fn export_any(&self, link_or_id: &str) -> Result<ExportBundle> {
        let deck_id = extract_presentation_id(link_or_id)?;
        self.services.exporter().export_images(&deck_id).await
    }
}
