//! CLI commands
//!
//! Each command builds what it needs from the loaded [`AppConfig`] and reports
//! failures through anyhow with the core error's suggestion attached.

use anyhow::{anyhow, bail, Context, Result};
use lessondeck_core::auth::AuthMode;
use lessondeck_core::config::DeckSettings;
use lessondeck_core::prompts::slide_content_prompt;
use lessondeck_core::{
    archive_file_name, build_prompts, extract_presentation_id, AppConfig, DeckError, Services,
    Workflow,
};
use lessondeck_web::loopback;
use lessondeck_web::AppState;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Attach the error's suggestion, if any, as extra context
fn explain(err: DeckError) -> anyhow::Error {
    if matches!(err, DeckError::AuthorizationRequired { .. }) {
        return anyhow!("Google sign-in required: run `lessondeck login` first");
    }
    match err.suggestion() {
        Some(hint) => anyhow!(err).context(hint),
        None => anyhow!(err),
    }
}

fn services(config: &AppConfig, http: reqwest::Client) -> Result<Arc<Services>> {
    Services::from_config(config, http)
        .map(Arc::new)
        .map_err(explain)
        .context("Failed to set up Google credentials")
}

// ============================================================================
// serve
// ============================================================================

pub async fn run_serve(config: &AppConfig, http: reqwest::Client) -> Result<()> {
    let services = services(config, http)?;
    let mode = services.credentials.mode();
    let workflow = Workflow::new(services);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    match mode {
        AuthMode::ServiceAccount => println!("Using service-account credentials"),
        AuthMode::OAuthUser => println!(
            "Using Google sign-in (redirect URI: {})",
            config.auth.redirect_uri
        ),
    }

    let state = AppState::with_session_idle(workflow, config.server.session_idle());
    lessondeck_web::run(state, addr).await
}

// ============================================================================
// login
// ============================================================================

/// Interactive consent through a one-shot loopback listener
pub async fn run_login(config: &AppConfig, http: reqwest::Client) -> Result<()> {
    let services = services(config, http)?;
    let credentials = &services.credentials;
    if credentials.mode() == AuthMode::ServiceAccount {
        bail!("Login is only needed for Google sign-in; service-account mode is configured");
    }

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to open the loopback listener")?;
    let redirect_uri = loopback::redirect_uri(&listener)?;

    let request = credentials
        .begin_authorization(Some(&redirect_uri))
        .map_err(explain)?;

    println!("Open this URL to sign in:\n\n  {}\n", request.url);
    if let Err(e) = open::that(&request.url) {
        tracing::warn!("Could not open a browser: {}", e);
    }

    let callback = loopback::wait_for_callback(listener).await?;
    credentials
        .complete_authorization(&callback.state, &callback.code)
        .await
        .map_err(explain)?;

    println!(
        "Signed in. Token cached at {}",
        config.auth.token_cache_path().display()
    );
    Ok(())
}

// ============================================================================
// prompts
// ============================================================================

/// Print the prompts for `topic`; the fourth follows the default template's
/// placeholders (`--template` picks another)
pub fn run_prompts(deck: &DeckSettings, topic: &str) -> Result<()> {
    let prompts = build_prompts(topic).map_err(explain)?;
    let template = deck.template(None).map_err(explain)?;
    let slide_prompt =
        slide_content_prompt(topic, &template.catalog.catalog()).map_err(explain)?;

    tracing::debug!("Slide prompt for template {:?}", template.name);
    for (i, prompt) in prompts.iter().enumerate() {
        println!("## Prompt {}: {}\n", i + 1, prompt.stage.heading());
        println!("{}\n", prompt.text);
    }
    println!("## Prompt 4: Generating Slide Content\n");
    println!("{slide_prompt}");
    Ok(())
}

// ============================================================================
// export
// ============================================================================

pub async fn run_export(
    config: &AppConfig,
    http: reqwest::Client,
    deck: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    // Reject bad links before touching credentials
    let deck_id = extract_presentation_id(deck).map_err(explain)?;
    let workflow = Workflow::new(services(config, http)?);

    let bundle = workflow.export_any(&deck_id).await.map_err(explain)?;
    let path = output.unwrap_or_else(|| default_export_path(&deck_id));
    write_archive(&path, &bundle.bytes).await?;

    println!("Saved {} slide image(s) to {}", bundle.entries, path.display());
    Ok(())
}

fn default_export_path(deck_id: &str) -> PathBuf {
    PathBuf::from(archive_file_name(&format!("Slides {deck_id}")))
}

async fn write_archive(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
