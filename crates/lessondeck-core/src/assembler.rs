//! Deck Assembler
//!
//! Builds a presentation either from blank TITLE_AND_BODY slides (one
//! `batchUpdate` per slide, in order) or by copying a template and replacing
//! its `{{Placeholder}}` text. Nothing is rolled back on failure: the error
//! carries whatever deck exists so far.

use crate::deck::{DeckRef, SlideContent};
use crate::error::DeckError;
use crate::google::{DriveApi, SlideRequest, SlidesApi};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// A failed assembly, with the partially built deck if one was created
#[derive(Debug, Error)]
#[error("{source}")]
pub struct AssemblyError {
    pub partial: Option<DeckRef>,
    #[source]
    pub source: DeckError,
}

impl AssemblyError {
    fn before_create(source: DeckError) -> Self {
        Self {
            partial: None,
            source,
        }
    }

    fn after_create(deck: &DeckRef, source: DeckError) -> Self {
        Self {
            partial: Some(deck.clone()),
            source,
        }
    }
}

impl From<AssemblyError> for DeckError {
    fn from(e: AssemblyError) -> Self {
        e.source
    }
}

/// Creates decks through the Slides and Drive APIs
pub struct DeckAssembler {
    slides: Arc<dyn SlidesApi>,
    drive: Arc<dyn DriveApi>,
}

impl DeckAssembler {
    pub fn new(slides: Arc<dyn SlidesApi>, drive: Arc<dyn DriveApi>) -> Self {
        Self { slides, drive }
    }

    /// Create a presentation titled `title` with one slide per entry.
    ///
    /// One create call, then one append call per entry. The slide Google adds
    /// to every new presentation is deleted by the first append.
    pub async fn create_deck(
        &self,
        title: &str,
        contents: &[SlideContent],
    ) -> Result<DeckRef, AssemblyError> {
        if contents.is_empty() {
            return Err(AssemblyError::before_create(DeckError::invalid_input(
                "no slide content to build a deck from",
            )));
        }

        let created = self
            .slides
            .create_presentation(title)
            .await
            .map_err(AssemblyError::before_create)?;

        let mut deck = DeckRef::new(created.presentation_id, title);
        tracing::info!("Created presentation {}", deck.presentation_id);

        for (index, content) in contents.iter().enumerate() {
            let mut requests: Vec<SlideRequest> = if index == 0 {
                created
                    .slide_ids
                    .iter()
                    .map(|id| SlideRequest::DeleteObject {
                        object_id: id.clone(),
                    })
                    .collect()
            } else {
                Vec::new()
            };

            let object_id = new_object_id();
            requests.extend(slide_requests(&object_id, index, content));

            if let Err(e) = self
                .slides
                .batch_update(&deck.presentation_id, &requests)
                .await
            {
                tracing::warn!(
                    "Slide {} of {} failed, keeping partial deck {}",
                    index + 1,
                    contents.len(),
                    deck.presentation_id
                );
                return Err(AssemblyError::after_create(&deck, e));
            }

            deck.slide_ids.push(object_id);
            tracing::info!("Appended slide {}/{}", index + 1, contents.len());
        }

        Ok(deck)
    }

    /// Copy `template_id`, move it into `destination_folder` and fill the
    /// template's placeholders with `replacements`.
    ///
    /// A failed move only logs a warning; the deck stays in the caller's
    /// Drive root.
    pub async fn from_template(
        &self,
        template_id: &str,
        title: &str,
        destination_folder: Option<&str>,
        replacements: &[(String, String)],
    ) -> Result<DeckRef, AssemblyError> {
        if replacements.is_empty() {
            return Err(AssemblyError::before_create(DeckError::invalid_input(
                "no placeholder values to fill the template with",
            )));
        }

        let file_id = self
            .drive
            .copy_file(template_id, title)
            .await
            .map_err(AssemblyError::before_create)?;
        let mut deck = DeckRef::new(file_id, title);
        tracing::info!("Copied template into {}", deck.presentation_id);

        if let Some(folder) = destination_folder.filter(|f| !f.trim().is_empty()) {
            if let Err(e) = self.drive.add_parent(&deck.presentation_id, folder).await {
                tracing::warn!(
                    "Could not move deck into folder {}, it stays in the Drive root: {}",
                    folder,
                    e
                );
            }
        }

        let requests: Vec<SlideRequest> = replacements
            .iter()
            .map(|(find, replace)| SlideRequest::ReplaceAllText {
                find: find.clone(),
                replace: replace.clone(),
            })
            .collect();

        self.slides
            .batch_update(&deck.presentation_id, &requests)
            .await
            .map_err(|e| AssemblyError::after_create(&deck, e))?;
        tracing::info!("Replaced {} placeholders", requests.len());

        deck.slide_ids = self
            .slides
            .slide_ids(&deck.presentation_id)
            .await
            .map_err(|e| AssemblyError::after_create(&deck, e))?;

        Ok(deck)
    }
}

/// Object ids must be 5-50 characters of `[A-Za-z0-9_]`
fn new_object_id() -> String {
    format!("ld_{}", Uuid::new_v4().simple())
}

/// Create-and-fill requests for one blank slide at `index`
fn slide_requests(object_id: &str, index: usize, content: &SlideContent) -> Vec<SlideRequest> {
    let title_id = format!("{object_id}_t");
    let body_id = format!("{object_id}_b");

    let mut requests = vec![SlideRequest::CreateSlide {
        object_id: object_id.to_string(),
        insertion_index: index,
        title_id: title_id.clone(),
        body_id: body_id.clone(),
    }];

    // insertText rejects empty strings
    if !content.title.is_empty() {
        requests.push(SlideRequest::InsertText {
            object_id: title_id,
            text: content.title.clone(),
        });
    }
    if !content.body.is_empty() {
        requests.push(SlideRequest::InsertText {
            object_id: body_id,
            text: content.body.clone(),
        });
    }

    requests
}
