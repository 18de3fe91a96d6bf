//! Route handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sessionstore::{ItineraryRecord, Profile, Traveller};
use tracing::{debug, info, warn};

use super::{AppState, StatusInfo};
use crate::bot::InboundEvent;
use crate::transport::{Transport, parse_update, parse_webhook};

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// WhatsApp subscription handshake: echo the challenge when the token matches
pub async fn verify_webhook(State(state): State<AppState>, Query(params): Query<VerifyParams>) -> impl IntoResponse {
    debug!(mode = ?params.mode, "verify_webhook: called");
    let token_ok = match (&state.verify_token, &params.verify_token) {
        (Some(expected), Some(given)) => expected == given,
        _ => false,
    };

    if params.mode.as_deref() == Some("subscribe") && token_ok {
        info!("Webhook verified");
        (StatusCode::OK, params.challenge.unwrap_or_default())
    } else {
        warn!("Webhook verification rejected");
        (StatusCode::FORBIDDEN, "Forbidden".to_string())
    }
}

fn dispatch(state: &AppState, transport: Option<&Arc<dyn Transport>>, events: Vec<InboundEvent>, platform: &str) {
    let Some(transport) = transport else {
        if !events.is_empty() {
            warn!(%platform, count = events.len(), "Events received for an unconfigured transport, dropping");
        }
        return;
    };

    if events.is_empty() {
        return;
    }

    // One task per payload: events from the same sender keep their order
    let engine = Arc::clone(&state.engine);
    let transport = Arc::clone(transport);
    tokio::spawn(async move {
        for event in events {
            engine.handle_event(event, transport.as_ref()).await;
        }
    });
}

pub async fn whatsapp_webhook(State(state): State<AppState>, Json(payload): Json<Value>) -> StatusCode {
    let events = parse_webhook(&payload);
    debug!(count = events.len(), "whatsapp_webhook: called");
    dispatch(&state, state.whatsapp.as_ref(), events, "whatsapp");
    StatusCode::OK
}

pub async fn telegram_update(State(state): State<AppState>, Json(payload): Json<Value>) -> StatusCode {
    let events: Vec<InboundEvent> = parse_update(&payload).into_iter().collect();
    debug!(count = events.len(), "telegram_update: called");
    dispatch(&state, state.telegram.as_ref(), events, "telegram");
    StatusCode::OK
}

pub async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: &'static str,
    #[serde(flatten)]
    info: StatusInfo,
    whatsapp: bool,
    telegram: bool,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online",
        info: state.status.clone(),
        whatsapp: state.whatsapp.is_some(),
        telegram: state.telegram.is_some(),
    })
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    identity: String,
    cleared: bool,
}

pub async fn reset(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<ResetResponse>, (StatusCode, String)> {
    debug!(%identity, "reset: called");
    let cleared = state.engine.sessions().clear(&identity).await.map_err(internal)?;
    info!(%identity, %cleared, "Session reset");
    Ok(Json(ResetResponse { identity, cleared }))
}

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub async fn travellers(State(state): State<AppState>) -> Result<Json<Vec<Traveller>>, (StatusCode, String)> {
    debug!("travellers: called");
    let travellers = state.engine.sessions().travellers().await.map_err(internal)?;
    Ok(Json(travellers))
}

#[derive(Debug, Serialize)]
pub struct TravellerResponse {
    identity: String,
    profile: Profile,
    itineraries: Vec<ItineraryRecord>,
}

/// Profile and itinerary history, newest first; 404 for an unknown identity
pub async fn traveller(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<TravellerResponse>, (StatusCode, String)> {
    debug!(%identity, "traveller: called");
    let sessions = state.engine.sessions();
    let profile = sessions.get_profile(&identity).await.map_err(internal)?;
    let itineraries = sessions.itineraries(&identity).await.map_err(internal)?;
    if profile.is_empty() && itineraries.is_empty() {
        return Err((StatusCode::NOT_FOUND, format!("Unknown traveller {}", identity)));
    }
    Ok(Json(TravellerResponse {
        identity,
        profile,
        itineraries,
    }))
}
