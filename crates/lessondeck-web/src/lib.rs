//! lessondeck-web - Web UI for lessondeck using Axum

pub mod loopback;
pub mod pages;
pub mod router;
pub mod sessions;

pub use router::{create_router, AppState};

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// Run the web server
pub async fn run(state: AppState, addr: SocketAddr) -> Result<()> {
    let router = create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web server listening on http://{}", addr);
    println!("Web server listening on http://{}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
