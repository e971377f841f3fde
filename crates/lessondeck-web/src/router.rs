//! Web router using Axum

use axum::extract::{Form, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lessondeck_core::{archive_file_name, DeckError, ExportBundle, Workflow};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::pages::{self, IndexView};
use crate::sessions::{self, Flash, SessionStore, SharedSession, WebSession};

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub workflow: Workflow,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            sessions: Arc::new(SessionStore::new()),
        }
    }

    /// State whose browser sessions expire after `idle` without requests
    pub fn with_session_idle(workflow: Workflow, idle: Duration) -> Self {
        Self {
            workflow,
            sessions: Arc::new(SessionStore::with_idle_timeout(idle)),
        }
    }

    fn session(&self, headers: &HeaderMap) -> (String, SharedSession) {
        self.sessions
            .get_or_create(sessions::session_id(headers).as_deref())
    }
}

/// Create the web router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/topic", post(topic_handler))
        .route("/content", post(content_handler))
        .route("/deck", post(deck_handler))
        .route("/publish", post(publish_handler))
        .route("/deck/images.zip", get(images_handler))
        .route("/export", get(export_form_handler).post(export_handler))
        .route("/reset", post(reset_handler))
        .route("/auth/start", get(auth_start_handler))
        .route("/auth/callback", get(auth_callback_handler))
        .route("/api/health", get(health_handler))
        .route("/api/session", get(session_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Attach the session cookie to any response
fn with_cookie(id: &str, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(SET_COOKIE, sessions::session_cookie(id));
    response
}

fn back_home(id: &str) -> Response {
    with_cookie(id, Redirect::to("/"))
}

/// Send the browser to Google consent when a step needs it, else flash the error
fn consent_or_flash(id: &str, web: &mut WebSession, err: DeckError) -> Response {
    match err {
        DeckError::AuthorizationRequired { consent_url } => {
            with_cookie(id, Redirect::to(&consent_url))
        }
        other => {
            web.flash = Some(Flash::error(&other));
            back_home(id)
        }
    }
}

fn zip_response(bundle: ExportBundle, file_name: &str) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"Images.zip\""));
    (
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (CONTENT_DISPOSITION, disposition),
            (CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        bundle.bytes,
    )
        .into_response()
}

async fn index_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = state.session(&headers);
    let mut web = session.lock().await;
    let flash = web.flash.take();

    let services = state.workflow.services();
    let folder_url = services.deck.folder_url();
    let selected = match &web.flow.template {
        Some(template) => Some(template.name.as_str()),
        None => services.deck.template(None).ok().map(|t| t.name.as_str()),
    };
    let html = pages::index_page(&IndexView {
        session: &web.flow,
        flash: flash.as_ref(),
        mode: services.credentials.mode(),
        folder_url: folder_url.as_deref(),
        templates: &services.deck.templates,
        selected_template: selected,
    });
    with_cookie(&id, Html(html))
}

#[derive(Deserialize)]
struct TopicForm {
    topic: String,
    #[serde(default)]
    template: Option<String>,
}

async fn topic_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<TopicForm>,
) -> Response {
    let (id, session) = state.session(&headers);
    let mut web = session.lock().await;
    let flow = &state.workflow;

    if matches!(web.flow.state(), lessondeck_core::FlowState::Idle) {
        match flow.authenticate(&mut web.flow).await {
            Ok(()) => {}
            Err(DeckError::AuthorizationRequired { consent_url }) => {
                // Kept so the form is filled in again after consent
                web.flow.topic = Some(form.topic.trim().to_string());
                web.flow.template = flow
                    .services()
                    .deck
                    .template(form.template.as_deref())
                    .ok()
                    .cloned();
                return with_cookie(&id, Redirect::to(&consent_url));
            }
            Err(e) => {
                web.flash = Some(Flash::error(&e));
                return back_home(&id);
            }
        }
    }

    if let Err(e) = flow.generate_prompts(&mut web.flow, &form.topic, form.template.as_deref()) {
        web.flash = Some(Flash::error(&e));
    }
    back_home(&id)
}

#[derive(Deserialize)]
struct ContentForm {
    content: String,
}

async fn content_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ContentForm>,
) -> Response {
    let (id, session) = state.session(&headers);
    let mut web = session.lock().await;

    let flash = match state.workflow.approve_content(&mut web.flow, &form.content) {
        Ok([]) => Flash::info("All placeholders found, ready to build the deck"),
        Ok(warnings) => Flash::warning(format!(
            "{} field(s) exceed their character limit; the deck can still be built",
            warnings.len()
        )),
        Err(e) => Flash::error(&e),
    };
    web.flash = Some(flash);
    back_home(&id)
}

/// Build the deck and share it in one step
async fn deck_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = state.session(&headers);
    let mut web = session.lock().await;
    let flow = &state.workflow;

    let created = flow.create_deck(&mut web.flow).await.map(|_| ());
    if let Err(e) = created {
        return consent_or_flash(&id, &mut web, e);
    }

    let published = flow.publish(&mut web.flow).await.map(|_| ());
    match published {
        Ok(_) => {
            web.flash = Some(Flash::info("Your slide deck is ready"));
            back_home(&id)
        }
        Err(e) => consent_or_flash(&id, &mut web, e),
    }
}

async fn publish_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = state.session(&headers);
    let mut web = session.lock().await;

    let published = state.workflow.publish(&mut web.flow).await.map(|_| ());
    match published {
        Ok(_) => {
            web.flash = Some(Flash::info("Anyone with the link can now view the deck"));
            back_home(&id)
        }
        Err(e) => consent_or_flash(&id, &mut web, e),
    }
}

async fn images_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = state.session(&headers);
    let mut web = session.lock().await;

    match state.workflow.export(&mut web.flow).await {
        Ok(bundle) => {
            let title = web
                .flow
                .deck
                .as_ref()
                .map(|d| d.title.clone())
                .unwrap_or_default();
            tracing::info!("Sending {} slide image(s)", bundle.entries);
            with_cookie(&id, zip_response(bundle, &archive_file_name(&title)))
        }
        Err(e) => consent_or_flash(&id, &mut web, e),
    }
}

async fn export_form_handler() -> Html<String> {
    Html(pages::export_page(None, ""))
}

#[derive(Deserialize)]
struct ExportForm {
    link: String,
}

async fn export_handler(State(state): State<AppState>, Form(form): Form<ExportForm>) -> Response {
    match state.workflow.export_any(&form.link).await {
        Ok(bundle) => {
            let id = lessondeck_core::extract_presentation_id(&form.link).unwrap_or_default();
            zip_response(bundle, &archive_file_name(&format!("Slides {id}")))
        }
        Err(e) => {
            let status = match &e {
                DeckError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                DeckError::AuthorizationRequired { .. } => StatusCode::UNAUTHORIZED,
                DeckError::Api { status: Some(404), .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, Html(pages::export_page(Some(&Flash::error(&e)), &form.link))).into_response()
        }
    }
}

async fn reset_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, _) = state.session(&headers);
    state.sessions.reset(&id);
    back_home(&id)
}

async fn auth_start_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = state.session(&headers);
    match state.workflow.services().credentials.begin_authorization(None) {
        Ok(request) => with_cookie(&id, Redirect::to(&request.url)),
        Err(e) => {
            session.lock().await.flash = Some(Flash::error(&e));
            back_home(&id)
        }
    }
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn auth_callback_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let (id, session) = state.session(&headers);
    let mut web = session.lock().await;

    let result = match (query.error, query.state, query.code) {
        (Some(error), _, _) => Err(DeckError::auth_flow(format!("consent denied: {error}"))),
        (None, Some(oauth_state), Some(code)) => state
            .workflow
            .services()
            .credentials
            .complete_authorization(&oauth_state, &code)
            .await
            .map(|_| ()),
        _ => Err(DeckError::auth_flow("callback is missing code or state")),
    };

    web.flash = Some(match result {
        Ok(()) => match state.workflow.authenticate(&mut web.flow).await {
            Ok(()) => Flash::info("Google account connected"),
            Err(e) => Flash::error(&e),
        },
        Err(e) => Flash::error(&e),
    });
    back_home(&id)
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mode = match state.workflow.services().credentials.mode() {
        lessondeck_core::AuthMode::ServiceAccount => "service_account",
        lessondeck_core::AuthMode::OAuthUser => "oauth_user",
    };
    Json(serde_json::json!({
        "status": "healthy",
        "auth_mode": mode,
        "sessions": state.sessions.len(),
    }))
}

async fn session_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = state.session(&headers);
    let web = session.lock().await;
    let flow = &web.flow;

    let body = serde_json::json!({
        "state": flow.state(),
        "topic": flow.topic,
        "template": flow.template.as_ref().map(|t| &t.name),
        "deck": flow.deck,
        "share_link": flow.share_link,
        "warnings": flow.warnings,
    });
    with_cookie(&id, Json(body))
}
