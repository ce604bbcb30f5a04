//! Web chat front-end for hearth.
//!
//! Serves a single-page chat UI and a WebSocket endpoint. Each WebSocket
//! connection owns its own [`AgentSession`](crate::session::AgentSession):
//! the session is created when the socket opens and dropped when it closes,
//! so no state is shared across chat sessions.

mod ws;

use anyhow::{Context, Result};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::Settings;

/// Embedded chat page; no assets, no build step.
const INDEX_HTML: &str = include_str!("index.html");

/// Shared, immutable state handed to every connection.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
}

/// Builds the axum router: the chat page and its WebSocket endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Binds the listener and serves the chat UI until Ctrl+C.
pub async fn serve(settings: Settings, host: &str, port: u16) -> Result<()> {
    let state = AppState {
        settings: Arc::new(settings),
    };
    let app = router(state);

    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    let addr = listener.local_addr()?;
    tracing::info!("chat listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
