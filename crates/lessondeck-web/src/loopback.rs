//! One-shot loopback listener for `lessondeck login`
//!
//! Google redirects the browser to `http://127.0.0.1:<port>/?code=..&state=..`;
//! the first request on `/` is captured and the listener shuts down.

use anyhow::{bail, Context, Result};
use axum::extract::Query;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use crate::pages;

#[derive(Debug, Clone, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Code and CSRF state delivered by the consent redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCallback {
    pub code: String,
    pub state: String,
}

/// Redirect URI served by `listener`
pub fn redirect_uri(listener: &TcpListener) -> Result<String> {
    let addr = listener
        .local_addr()
        .context("Failed to read loopback listener address")?;
    Ok(format!("http://{addr}/"))
}

/// Serve `listener` until the consent redirect arrives
pub async fn wait_for_callback(listener: TcpListener) -> Result<AuthorizationCallback> {
    let (tx, mut rx) = mpsc::channel::<CallbackParams>(1);

    let app = Router::new().route(
        "/",
        get(move |Query(params): Query<CallbackParams>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(params).await;
                Html(pages::signed_in_page())
            }
        }),
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    let params = rx
        .recv()
        .await
        .context("Loopback listener closed before the consent redirect arrived")?;

    let _ = stop_tx.send(());
    if let Ok(Err(e)) = server.await {
        tracing::debug!("Loopback listener stopped with error: {}", e);
    }

    if let Some(error) = params.error {
        bail!("Google consent was not granted: {error}");
    }
    match (params.code, params.state) {
        (Some(code), Some(state)) => Ok(AuthorizationCallback { code, state }),
        _ => bail!("Consent redirect is missing code or state"),
    }
}
