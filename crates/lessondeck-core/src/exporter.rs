//! Exporter: one PNG per slide, packed into an in-memory ZIP
//!
//! Entries are named `slide_01.png`, `slide_02.png`, ... in slide order. Each
//! slide is tried at every configured thumbnail size in turn; the export fails
//! as a whole when a slide fails at the last size.

use crate::error::{DeckError, Result};
use crate::google::{SlidesApi, ThumbnailSize};
use regex::Regex;
use std::io::{Cursor, Write};
use std::sync::{Arc, OnceLock};
use zip::write::{SimpleFileOptions, ZipWriter};

/// ZIP archive of slide images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBundle {
    pub bytes: Vec<u8>,
    pub entries: usize,
}

pub struct Exporter {
    slides: Arc<dyn SlidesApi>,
    sizes: Vec<ThumbnailSize>,
}

impl Exporter {
    /// `sizes` is the per-slide fallback order; empty means LARGE, MEDIUM, SMALL
    pub fn new(slides: Arc<dyn SlidesApi>, sizes: Vec<ThumbnailSize>) -> Self {
        let sizes = if sizes.is_empty() {
            vec![ThumbnailSize::Large, ThumbnailSize::Medium, ThumbnailSize::Small]
        } else {
            sizes
        };
        Self { slides, sizes }
    }

    pub async fn export_images(&self, deck_id: &str) -> Result<ExportBundle> {
        let slide_ids = self.slides.slide_ids(deck_id).await?;
        if slide_ids.is_empty() {
            return Err(DeckError::invalid_input(format!(
                "presentation {deck_id} has no slides to export"
            )));
        }
        tracing::info!("Exporting {} slide image(s) from {}", slide_ids.len(), deck_id);

        let mut images = Vec::with_capacity(slide_ids.len());
        for slide_id in &slide_ids {
            images.push(self.slide_image(deck_id, slide_id).await?);
        }

        let bytes = pack_images(&images)?;
        Ok(ExportBundle {
            bytes,
            entries: images.len(),
        })
    }

    async fn slide_image(&self, deck_id: &str, slide_id: &str) -> Result<Vec<u8>> {
        let mut last_error = None;
        for size in &self.sizes {
            match self.slides.thumbnail(deck_id, slide_id, *size).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    tracing::debug!("{} thumbnail of {} failed: {}", size, slide_id, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DeckError::api(None, "no thumbnail sizes configured")))
    }
}

/// Entry name for the slide at 1-based `position`
pub fn entry_name(position: usize) -> String {
    format!("slide_{position:02}.png")
}

/// Pack PNG images, in order, into a deflated ZIP
pub fn pack_images(images: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (i, image) in images.iter().enumerate() {
        writer.start_file(entry_name(i + 1), options)?;
        writer.write_all(image).map_err(|e| DeckError::Archive {
            message: e.to_string(),
        })?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Download name: the part of the deck title before `|`, plus ` Images.zip`,
/// limited to characters safe inside a `Content-Disposition` header.
pub fn archive_file_name(deck_title: &str) -> String {
    let base = deck_title.split('|').next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || " -_.,()'".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        "Lesson Deck Images.zip".to_string()
    } else {
        format!("{cleaned} Images.zip")
    }
}

fn url_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("valid presentation url regex"))
}

/// Presentation id from a share link (`.../d/<id>/...`) or a bare id
pub fn extract_presentation_id(link_or_id: &str) -> Result<String> {
    let input = link_or_id.trim();
    if input.is_empty() {
        return Err(DeckError::invalid_input("enter a Google Slides link or presentation id"));
    }

    let is_bare_id = !input.contains('/')
        && input.len() >= 25
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if is_bare_id {
        return Ok(input.to_string());
    }

    url_id()
        .captures(input)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| {
            DeckError::invalid_input(format!("no presentation id found in {input:?}"))
        })
}
