//! Google Slides and Drive seams
//!
//! The assembler, publisher and exporter only talk to [`SlidesApi`] and
//! [`DriveApi`]. [`GoogleClient`] implements both over HTTPS; tests use
//! in-process fakes.

mod http;

pub use http::GoogleClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Thumbnail size accepted by `pages.getThumbnail`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThumbnailSize {
    Large,
    Medium,
    Small,
}

impl ThumbnailSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailSize::Large => "LARGE",
            ThumbnailSize::Medium => "MEDIUM",
            ThumbnailSize::Small => "SMALL",
        }
    }
}

impl fmt::Display for ThumbnailSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A newly created presentation and the slides Google put in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPresentation {
    pub presentation_id: String,
    pub slide_ids: Vec<String>,
}

/// Subset of Slides `batchUpdate` requests used by lessondeck
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideRequest {
    /// New TITLE_AND_BODY slide with caller-chosen ids for its placeholders
    CreateSlide {
        object_id: String,
        insertion_index: usize,
        title_id: String,
        body_id: String,
    },
    InsertText { object_id: String, text: String },
    DeleteObject { object_id: String },
    /// Case-sensitive replacement across the whole presentation
    ReplaceAllText { find: String, replace: String },
}

impl SlideRequest {
    /// Request object as sent in `batchUpdate`
    pub fn to_json(&self) -> Value {
        match self {
            SlideRequest::CreateSlide {
                object_id,
                insertion_index,
                title_id,
                body_id,
            } => json!({
                "createSlide": {
                    "objectId": object_id,
                    "insertionIndex": insertion_index,
                    "slideLayoutReference": { "predefinedLayout": "TITLE_AND_BODY" },
                    "placeholderIdMappings": [
                        { "layoutPlaceholder": { "type": "TITLE", "index": 0 }, "objectId": title_id },
                        { "layoutPlaceholder": { "type": "BODY", "index": 0 }, "objectId": body_id }
                    ]
                }
            }),
            SlideRequest::InsertText { object_id, text } => json!({
                "insertText": { "objectId": object_id, "insertionIndex": 0, "text": text }
            }),
            SlideRequest::DeleteObject { object_id } => json!({
                "deleteObject": { "objectId": object_id }
            }),
            SlideRequest::ReplaceAllText { find, replace } => json!({
                "replaceAllText": {
                    "containsText": { "text": find, "matchCase": true },
                    "replaceText": replace
                }
            }),
        }
    }
}

/// `batchUpdate` body for `requests`
pub fn batch_update_body(requests: &[SlideRequest]) -> Value {
    json!({ "requests": requests.iter().map(SlideRequest::to_json).collect::<Vec<_>>() })
}

/// Drive permission entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
}

impl Permission {
    /// "Anyone with the link can view"
    pub fn anyone_reader() -> Self {
        Self {
            id: None,
            kind: "anyone".to_string(),
            role: "reader".to_string(),
        }
    }

    pub fn grants_public_view(&self) -> bool {
        self.kind == "anyone" && matches!(self.role.as_str(), "reader" | "commenter" | "writer")
    }
}

/// Google Slides v1 operations
#[async_trait]
pub trait SlidesApi: Send + Sync {
    /// `presentations.create`
    async fn create_presentation(&self, title: &str) -> Result<CreatedPresentation>;

    /// `presentations.batchUpdate`
    async fn batch_update(&self, presentation_id: &str, requests: &[SlideRequest]) -> Result<()>;

    /// Slide object ids in presentation order (`presentations.get`)
    async fn slide_ids(&self, presentation_id: &str) -> Result<Vec<String>>;

    /// Rendered PNG bytes of one slide at `size`
    async fn thumbnail(
        &self,
        presentation_id: &str,
        page_id: &str,
        size: ThumbnailSize,
    ) -> Result<Vec<u8>>;
}

/// Google Drive v3 operations
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// `files.copy`, returning the new file id
    async fn copy_file(&self, file_id: &str, name: &str) -> Result<String>;

    /// `files.update` with `addParents`
    async fn add_parent(&self, file_id: &str, folder_id: &str) -> Result<()>;

    async fn list_permissions(&self, file_id: &str) -> Result<Vec<Permission>>;

    async fn create_permission(&self, file_id: &str, permission: &Permission) -> Result<()>;

    /// `files.get` for `webViewLink`
    async fn web_view_link(&self, file_id: &str) -> Result<String>;
}
