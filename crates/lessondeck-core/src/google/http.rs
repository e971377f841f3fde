//! HTTPS implementation of the Slides and Drive traits

use super::{CreatedPresentation, DriveApi, Permission, SlideRequest, SlidesApi, ThumbnailSize};
use crate::auth::CredentialProvider;
use crate::error::{DeckError, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const SLIDES_API: &str = "https://slides.googleapis.com/v1";
const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";

/// Google API client authorizing every call through the credential provider
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    credentials: Arc<CredentialProvider>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresentationResponse {
    presentation_id: Option<String>,
    #[serde(default)]
    slides: Vec<PageRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageRef {
    object_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailResponse {
    content_url: String,
}

#[derive(Deserialize)]
struct FileId {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebViewLink {
    web_view_link: Option<String>,
}

#[derive(Deserialize)]
struct PermissionList {
    #[serde(default)]
    permissions: Vec<Permission>,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GoogleClient {
    pub fn new(http: reqwest::Client, credentials: Arc<CredentialProvider>) -> Self {
        Self { http, credentials }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let credential = self.credentials.resolve().await?;
        let response = request
            .bearer_auth(credential.token.secret())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeckError::api(
            Some(status.as_u16()),
            api_error_message(status, &body),
        ))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| DeckError::api(None, format!("unexpected response body: {e}")))
    }
}

fn transport_error(e: reqwest::Error) -> DeckError {
    DeckError::api(e.status().map(|s| s.as_u16()), e.to_string())
}

/// Human-readable message from a Google error body, or the status text
pub(crate) fn api_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<GoogleErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => match parsed.error.status {
            Some(kind) => format!("{} ({})", parsed.error.message, kind),
            None => parsed.error.message,
        },
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}

#[async_trait]
impl SlidesApi for GoogleClient {
    async fn create_presentation(&self, title: &str) -> Result<CreatedPresentation> {
        tracing::info!("Creating presentation {:?}", title);
        let created: PresentationResponse = self
            .send_json(
                self.http
                    .post(format!("{SLIDES_API}/presentations"))
                    .json(&json!({ "title": title })),
            )
            .await?;

        let presentation_id = created
            .presentation_id
            .ok_or_else(|| DeckError::api(None, "presentation id missing from create response"))?;

        Ok(CreatedPresentation {
            presentation_id,
            slide_ids: created.slides.into_iter().map(|s| s.object_id).collect(),
        })
    }

    async fn batch_update(&self, presentation_id: &str, requests: &[SlideRequest]) -> Result<()> {
        tracing::debug!(
            "batchUpdate on {} with {} request(s)",
            presentation_id,
            requests.len()
        );
        self.send(
            self.http
                .post(format!("{SLIDES_API}/presentations/{presentation_id}:batchUpdate"))
                .json(&super::batch_update_body(requests)),
        )
        .await?;
        Ok(())
    }

    async fn slide_ids(&self, presentation_id: &str) -> Result<Vec<String>> {
        let presentation: PresentationResponse = self
            .send_json(
                self.http
                    .get(format!("{SLIDES_API}/presentations/{presentation_id}"))
                    .query(&[("fields", "slides.objectId")]),
            )
            .await?;
        Ok(presentation.slides.into_iter().map(|s| s.object_id).collect())
    }

    async fn thumbnail(
        &self,
        presentation_id: &str,
        page_id: &str,
        size: ThumbnailSize,
    ) -> Result<Vec<u8>> {
        let thumbnail: ThumbnailResponse = self
            .send_json(
                self.http
                    .get(format!(
                        "{SLIDES_API}/presentations/{presentation_id}/pages/{page_id}/thumbnail"
                    ))
                    .query(&[
                        ("thumbnailProperties.thumbnailSize", size.as_str()),
                        ("thumbnailProperties.mimeType", "PNG"),
                    ]),
            )
            .await?;

        let bytes = self
            .send(self.http.get(&thumbnail.content_url))
            .await?
            .bytes()
            .await
            .map_err(transport_error)?;

        tracing::debug!("Fetched {} thumbnail of {} ({} bytes)", size, page_id, bytes.len());
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DriveApi for GoogleClient {
    async fn copy_file(&self, file_id: &str, name: &str) -> Result<String> {
        tracing::info!("Copying template {} as {:?}", file_id, name);
        let copied: FileId = self
            .send_json(
                self.http
                    .post(format!("{DRIVE_API}/files/{file_id}/copy"))
                    .query(&[("supportsAllDrives", "true"), ("fields", "id")])
                    .json(&json!({ "name": name })),
            )
            .await?;
        Ok(copied.id)
    }

    async fn add_parent(&self, file_id: &str, folder_id: &str) -> Result<()> {
        self.send(
            self.http
                .patch(format!("{DRIVE_API}/files/{file_id}"))
                .query(&[
                    ("addParents", folder_id),
                    ("supportsAllDrives", "true"),
                    ("fields", "id"),
                ])
                .json(&json!({})),
        )
        .await?;
        Ok(())
    }

    async fn list_permissions(&self, file_id: &str) -> Result<Vec<Permission>> {
        let list: PermissionList = self
            .send_json(
                self.http
                    .get(format!("{DRIVE_API}/files/{file_id}/permissions"))
                    .query(&[
                        ("supportsAllDrives", "true"),
                        ("fields", "permissions(id,type,role)"),
                    ]),
            )
            .await?;
        Ok(list.permissions)
    }

    async fn create_permission(&self, file_id: &str, permission: &Permission) -> Result<()> {
        self.send(
            self.http
                .post(format!("{DRIVE_API}/files/{file_id}/permissions"))
                .query(&[("supportsAllDrives", "true"), ("fields", "id")])
                .json(permission),
        )
        .await?;
        Ok(())
    }

    async fn web_view_link(&self, file_id: &str) -> Result<String> {
        let file: WebViewLink = self
            .send_json(
                self.http
                    .get(format!("{DRIVE_API}/files/{file_id}"))
                    .query(&[("fields", "webViewLink"), ("supportsAllDrives", "true")]),
            )
            .await?;
        file.web_view_link
            .ok_or_else(|| DeckError::api(None, format!("file {file_id} has no webViewLink")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_google_body() {
        let body = r#"{"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}"#;
        assert_eq!(
            api_error_message(StatusCode::NOT_FOUND, body),
            "Requested entity was not found. (NOT_FOUND)"
        );
    }

    #[test]
    fn test_error_message_without_json_body() {
        assert_eq!(
            api_error_message(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            "Bad Gateway"
        );
        assert_eq!(
            api_error_message(StatusCode::FORBIDDEN, r#"{"error": {"code": 403}}"#),
            "Forbidden"
        );
    }
}
