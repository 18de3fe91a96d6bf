//! Webhook server
//!
//! Routes:
//! - `GET /webhook` - WhatsApp verification handshake
//! - `POST /webhook` - WhatsApp events
//! - `POST /telegram` - Telegram updates
//! - `GET /health` - liveness check
//! - `GET /status` - provider, model and guide availability
//! - `POST /reset/:identity` - clear one session
//! - `GET /travellers` - identities with generated itineraries
//! - `GET /travellers/:identity` - profile and itinerary history
//!
//! Webhooks acknowledge immediately; each payload is processed in order on a
//! spawned task.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use eyre::{Context, Result};
use serde::Serialize;
use tracing::info;

mod handlers;

use crate::engine::Engine;
use crate::transport::Transport;

/// Static facts reported by `/status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub provider: String,
    pub model: String,
    pub guide_loaded: bool,
}

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub whatsapp: Option<Arc<dyn Transport>>,
    pub telegram: Option<Arc<dyn Transport>>,
    /// Expected `hub.verify_token`; verification always fails without one
    pub verify_token: Option<String>,
    pub status: StatusInfo,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", get(handlers::verify_webhook).post(handlers::whatsapp_webhook))
        .route("/telegram", post(handlers::telegram_update))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/reset/:identity", post(handlers::reset))
        .route("/travellers", get(handlers::travellers))
        .route("/travellers/:identity", get(handlers::traveller))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .context(format!("Failed to bind {}", bind))?;
    info!(
        %bind,
        whatsapp = state.whatsapp.is_some(),
        telegram = state.telegram.is_some(),
        "Webhook server listening"
    );

    axum::serve(listener, router(state)).await.context("Server error")?;
    Ok(())
}
