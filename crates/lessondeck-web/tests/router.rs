//! Integration tests for the web routes

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use lessondeck_core::auth::{MemoryCredentialStore, OAuthClientSecrets, StoredToken};
use lessondeck_core::config::{DeckSettings, NamedTemplate};
use lessondeck_core::google::{
    CreatedPresentation, DriveApi, Permission, SlideRequest, SlidesApi, ThumbnailSize,
};
use lessondeck_core::{
    CatalogKind, CredentialProvider, DeckError, Result, Services, TemplateCatalog, Workflow,
};
use lessondeck_web::{create_router, AppState};
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

struct FakeSlides {
    slide_count: usize,
}

#[async_trait]
impl SlidesApi for FakeSlides {
    async fn create_presentation(&self, _title: &str) -> Result<CreatedPresentation> {
        Ok(CreatedPresentation {
            presentation_id: "pres-web".to_string(),
            slide_ids: vec!["p".to_string()],
        })
    }

    async fn batch_update(&self, _presentation_id: &str, _requests: &[SlideRequest]) -> Result<()> {
        Ok(())
    }

    async fn slide_ids(&self, _presentation_id: &str) -> Result<Vec<String>> {
        Ok((1..=self.slide_count).map(|i| format!("page{i}")).collect())
    }

    async fn thumbnail(
        &self,
        _presentation_id: &str,
        page_id: &str,
        _size: ThumbnailSize,
    ) -> Result<Vec<u8>> {
        Ok(page_id.as_bytes().to_vec())
    }
}

#[derive(Default)]
struct FakeDrive {
    permissions: Mutex<Vec<Permission>>,
    /// Sharing asks for Google consent again
    consent_on_share: bool,
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn copy_file(&self, _file_id: &str, _name: &str) -> Result<String> {
        Ok("copy".to_string())
    }

    async fn add_parent(&self, _file_id: &str, _folder_id: &str) -> Result<()> {
        Ok(())
    }

    async fn list_permissions(&self, _file_id: &str) -> Result<Vec<Permission>> {
        Ok(self.permissions.lock().clone())
    }

    async fn create_permission(&self, _file_id: &str, permission: &Permission) -> Result<()> {
        if self.consent_on_share {
            return Err(DeckError::AuthorizationRequired {
                consent_url: "https://accounts.google.com/o/oauth2/v2/auth?state=share".to_string(),
            });
        }
        self.permissions.lock().push(permission.clone());
        Ok(())
    }

    async fn web_view_link(&self, file_id: &str) -> Result<String> {
        Ok(format!("https://docs.google.com/presentation/d/{file_id}/edit?usp=drivesdk"))
    }
}

fn provider(token: Option<StoredToken>) -> Arc<CredentialProvider> {
    let secrets = OAuthClientSecrets::from_json(
        r#"{"web": {"client_id": "cid.apps.googleusercontent.com", "client_secret": "s"}}"#,
    )
    .unwrap();
    let store = match token {
        Some(token) => MemoryCredentialStore::with_token(token),
        None => MemoryCredentialStore::new(),
    };
    Arc::new(
        CredentialProvider::oauth_user(&secrets, "http://localhost:3333/auth/callback", Arc::new(store))
            .unwrap(),
    )
}

fn valid_token() -> StoredToken {
    StoredToken {
        access_token: "ya29.web".to_string(),
        refresh_token: None,
        expires_at: Some(Utc::now() + Duration::hours(1)),
        scopes: vec![],
    }
}

fn router_with(credentials: Arc<CredentialProvider>) -> Router {
    router_over(credentials, FakeDrive::default(), DeckSettings::default())
}

fn router_over(credentials: Arc<CredentialProvider>, drive: FakeDrive, deck: DeckSettings) -> Router {
    let services = Services::new(
        credentials,
        Arc::new(FakeSlides { slide_count: 18 }),
        Arc::new(drive),
        deck,
    );
    create_router(AppState::new(Workflow::new(Arc::new(services))))
}

fn answer() -> String {
    answer_for(&TemplateCatalog::lesson_deck())
}

fn answer_for(catalog: &TemplateCatalog) -> String {
    catalog
        .placeholders()
        .map(|p| format!("{} {}", p.token(), p.example))
        .collect::<Vec<_>>()
        .join("\n")
}

fn cookie_of<B>(response: &Response<B>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("Set-Cookie header");
    set_cookie.split(';').next().unwrap().to_string()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: Option<&str>, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

async fn session_json(router: &Router, cookie: &str) -> serde_json::Value {
    let response = router
        .clone()
        .oneshot(get("/api/session", Some(cookie)))
        .await
        .unwrap();
    serde_json::from_str(&body_string(response).await).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let router = router_with(provider(Some(valid_token())));

    let response = router.oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["auth_mode"], "oauth_user");
}

#[tokio::test]
async fn test_index_sets_cookie_and_shows_topic_form() {
    let router = router_with(provider(Some(valid_token())));

    let response = router.oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie_of(&response).starts_with("lessondeck_session="));

    let html = body_string(response).await;
    assert!(html.contains(r#"action="/topic""#));
}

#[tokio::test]
async fn test_full_flow_through_routes() {
    let router = router_with(provider(Some(valid_token())));

    let response = router.clone().oneshot(get("/", None)).await.unwrap();
    let cookie = cookie_of(&response);

    let response = router
        .clone()
        .oneshot(post_form("/topic", Some(&cookie), &[("topic", "Knowing Yourself")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(session_json(&router, &cookie).await["state"]["state"], "prompts_generated");

    let html = body_string(router.clone().oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(html.contains("Prompt 4"));
    assert!(html.contains(r#"action="/content""#));

    router
        .clone()
        .oneshot(post_form("/content", Some(&cookie), &[("content", &answer())]))
        .await
        .unwrap();
    assert_eq!(session_json(&router, &cookie).await["state"]["state"], "content_approved");

    router
        .clone()
        .oneshot(post_form("/deck", Some(&cookie), &[]))
        .await
        .unwrap();
    let session = session_json(&router, &cookie).await;
    assert_eq!(session["state"]["state"], "published");
    assert_eq!(session["deck"]["presentation_id"], "pres-web");
    assert!(session["share_link"]["url"]
        .as_str()
        .unwrap()
        .contains("/d/pres-web/"));

    let response = router
        .clone()
        .oneshot(get("/deck/images.zip", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/zip"
    );
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"Knowing Yourself"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    assert_eq!(archive.len(), 18);

    assert_eq!(session_json(&router, &cookie).await["state"]["state"], "exported");
}

#[tokio::test]
async fn test_missing_placeholders_keep_session_and_show_error() {
    let router = router_with(provider(Some(valid_token())));
    let cookie = cookie_of(&router.clone().oneshot(get("/", None)).await.unwrap());

    router
        .clone()
        .oneshot(post_form("/topic", Some(&cookie), &[("topic", "Topic")]))
        .await
        .unwrap();
    router
        .clone()
        .oneshot(post_form("/content", Some(&cookie), &[("content", "{{Title}} Only")]))
        .await
        .unwrap();

    assert_eq!(session_json(&router, &cookie).await["state"]["state"], "prompts_generated");
    let html = body_string(router.clone().oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(html.contains("flash error"));
    assert!(html.contains("{{Subtitle}}"));
}

#[tokio::test]
async fn test_topic_without_token_redirects_to_consent() {
    let router = router_with(provider(None));
    let cookie = cookie_of(&router.clone().oneshot(get("/", None)).await.unwrap());

    let response = router
        .clone()
        .oneshot(post_form("/topic", Some(&cookie), &[("topic", "  Knowing Yourself ")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert!(location.starts_with("https://accounts.google.com/"));

    let session = session_json(&router, &cookie).await;
    assert_eq!(session["state"]["state"], "idle");
    assert_eq!(session["topic"], "Knowing Yourself");
}

#[tokio::test]
async fn test_denied_consent_shows_error() {
    let router = router_with(provider(None));
    let cookie = cookie_of(&router.clone().oneshot(get("/", None)).await.unwrap());

    let response = router
        .clone()
        .oneshot(get("/auth/callback?error=access_denied", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = body_string(router.clone().oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(html.contains("access_denied"));
    assert_eq!(session_json(&router, &cookie).await["state"]["state"], "idle");
}

#[tokio::test]
async fn test_export_rejects_invalid_link() {
    let router = router_with(provider(Some(valid_token())));

    let response = router
        .oneshot(post_form("/export", None, &[("link", "not a slides link")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("flash error"));
}

#[tokio::test]
async fn test_export_any_deck() {
    let router = router_with(provider(Some(valid_token())));

    let response = router
        .oneshot(post_form(
            "/export",
            None,
            &[("link", "https://docs.google.com/presentation/d/1xQTez0asRJzxstqW8zCUtIGpFRlPUH/edit")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/zip"
    );
}

#[tokio::test]
async fn test_reset_starts_over() {
    let router = router_with(provider(Some(valid_token())));
    let cookie = cookie_of(&router.clone().oneshot(get("/", None)).await.unwrap());

    router
        .clone()
        .oneshot(post_form("/topic", Some(&cookie), &[("topic", "Topic")]))
        .await
        .unwrap();
    router
        .clone()
        .oneshot(post_form("/reset", Some(&cookie), &[]))
        .await
        .unwrap();

    let session = session_json(&router, &cookie).await;
    assert_eq!(session["state"]["state"], "idle");
    assert!(session["topic"].is_null());
}

/// Walk a fresh session up to approved content
async fn approved_session(router: &Router, template: Option<&str>, content: &str) -> String {
    let cookie = cookie_of(&router.clone().oneshot(get("/", None)).await.unwrap());
    let mut fields = vec![("topic", "Knowing Yourself")];
    if let Some(template) = template {
        fields.push(("template", template));
    }
    router
        .clone()
        .oneshot(post_form("/topic", Some(&cookie), &fields))
        .await
        .unwrap();
    router
        .clone()
        .oneshot(post_form("/content", Some(&cookie), &[("content", content)]))
        .await
        .unwrap();
    assert_eq!(session_json(router, &cookie).await["state"]["state"], "content_approved");
    cookie
}

#[tokio::test]
async fn test_share_needing_consent_redirects_to_google() {
    let drive = FakeDrive {
        consent_on_share: true,
        ..FakeDrive::default()
    };
    let router = router_over(provider(Some(valid_token())), drive, DeckSettings::default());
    let cookie = approved_session(&router, None, &answer()).await;

    let response = router
        .clone()
        .oneshot(post_form("/deck", Some(&cookie), &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert_eq!(location, "https://accounts.google.com/o/oauth2/v2/auth?state=share");
    assert_eq!(session_json(&router, &cookie).await["state"]["state"], "deck_created");

    // Re-sharing from the deck page goes to consent as well
    let response = router
        .clone()
        .oneshot(post_form("/publish", Some(&cookie), &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("https://accounts.google.com/"));

    let session = session_json(&router, &cookie).await;
    assert_eq!(session["state"]["state"], "deck_created");
    assert!(session["share_link"].is_null());
}

fn two_templates() -> DeckSettings {
    DeckSettings {
        templates: vec![
            NamedTemplate {
                name: "Template Version 1".to_string(),
                presentation_id: Some("template-1".to_string()),
                catalog: CatalogKind::LessonDeck,
            },
            NamedTemplate {
                name: "Template Number 2".to_string(),
                presentation_id: Some("template-2".to_string()),
                catalog: CatalogKind::Infographic,
            },
        ],
        ..DeckSettings::default()
    }
}

#[tokio::test]
async fn test_index_offers_configured_templates() {
    let router = router_over(provider(Some(valid_token())), FakeDrive::default(), two_templates());

    let html = body_string(router.oneshot(get("/", None)).await.unwrap()).await;
    assert!(html.contains(r#"name="template""#));
    assert!(html.contains(r#"<option value="Template Version 1" selected>"#));
    assert!(html.contains(r#"<option value="Template Number 2">"#));
}

#[tokio::test]
async fn test_chosen_template_sets_catalog_for_content() {
    let router = router_over(provider(Some(valid_token())), FakeDrive::default(), two_templates());
    let infographic = answer_for(&TemplateCatalog::infographic());
    let cookie = approved_session(&router, Some("Template Number 2"), &infographic).await;

    let session = session_json(&router, &cookie).await;
    assert_eq!(session["template"], "Template Number 2");

    let html = body_string(router.clone().oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(html.contains("<strong>Template:</strong> Template Number 2"));

    router
        .clone()
        .oneshot(post_form("/deck", Some(&cookie), &[]))
        .await
        .unwrap();
    let session = session_json(&router, &cookie).await;
    assert_eq!(session["state"]["state"], "published");
    assert_eq!(session["deck"]["presentation_id"], "copy");
}
