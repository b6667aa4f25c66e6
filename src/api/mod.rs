//! HTTP API handlers
//!
//! The control surface consumed by the dashboard: JSON command endpoints
//! plus an SSE stream of bus events for realtime updates.

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::audio::{PlaybackService, PlaybackSnapshot};
use crate::bus::{Device, SharedBus};
use crate::devices::{ConnectionController, DeviceRegistry, ScanCoordinator};
use crate::rules::{RuleDraft, RulesService, RuleTemplate};
use crate::store::AutomationRuleRow;
use crate::voice::{VoiceOutcome, VoiceService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DeviceRegistry>,
    pub controller: Arc<ConnectionController>,
    pub scanner: Arc<ScanCoordinator>,
    pub playback: Arc<PlaybackService>,
    pub voice: Arc<VoiceService>,
    pub rules: Arc<RulesService>,
    pub bus: SharedBus,
    pub transport_name: &'static str,
    pub started_at: Instant,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn bad_request(error: impl ToString) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn not_found(error: impl ToString) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// =============================================================================
// Status
// =============================================================================

/// General status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub transport: &'static str,
    pub device_count: usize,
    pub connected_devices: usize,
    pub bus_subscribers: usize,
}

/// GET /status - Service health check
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: "smart-hub-control",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        transport: state.transport_name,
        device_count: state.registry.len().await,
        connected_devices: state.registry.connected_count().await,
        bus_subscribers: state.bus.subscriber_count(),
    })
}

// =============================================================================
// Device handlers
// =============================================================================

/// GET /devices - List all known devices
pub async fn devices_handler(State(state): State<AppState>) -> Json<Vec<Device>> {
    Json(state.registry.list().await)
}

/// Scan response body
#[derive(Serialize)]
pub struct ScanResponse {
    pub discovered: Vec<Device>,
}

/// POST /devices/scan - Run one discovery pass
pub async fn scan_handler(State(state): State<AppState>) -> Json<ScanResponse> {
    let discovered = state.scanner.scan().await;
    Json(ScanResponse { discovered })
}

/// Device action request body
#[derive(Deserialize)]
pub struct DeviceRequest {
    pub device_id: String,
}

/// POST /devices/connect - Connect a known device
pub async fn connect_handler(
    State(state): State<AppState>,
    Json(req): Json<DeviceRequest>,
) -> impl IntoResponse {
    if state.registry.get(&req.device_id).await.is_none() {
        return not_found(format!("Device not found: {}", req.device_id));
    }
    match state.controller.connect(&req.device_id).await {
        Ok(device) => (StatusCode::OK, Json(device)).into_response(),
        Err(e) => bad_request(e),
    }
}

/// POST /devices/disconnect - Drop a device link
pub async fn disconnect_handler(
    State(state): State<AppState>,
    Json(req): Json<DeviceRequest>,
) -> impl IntoResponse {
    if state.registry.get(&req.device_id).await.is_none() {
        return not_found(format!("Device not found: {}", req.device_id));
    }
    match state.controller.disconnect(&req.device_id).await {
        Ok(device) => (StatusCode::OK, Json(device)).into_response(),
        Err(e) => bad_request(e),
    }
}

// =============================================================================
// Playback handlers
// =============================================================================

/// GET /playback - Current player state
pub async fn playback_handler(State(state): State<AppState>) -> Json<PlaybackSnapshot> {
    Json(state.playback.snapshot().await)
}

/// Playback control request body
#[derive(Deserialize)]
pub struct PlaybackControlRequest {
    pub action: String,
    /// Playlist position for `play_track`
    #[serde(default)]
    pub index: Option<usize>,
}

/// POST /playback/control - Transport controls
pub async fn playback_control_handler(
    State(state): State<AppState>,
    Json(req): Json<PlaybackControlRequest>,
) -> impl IntoResponse {
    match req.action.as_str() {
        "play" => state.playback.play().await,
        "pause" => state.playback.pause().await,
        "next" => state.playback.next().await,
        "previous" => state.playback.previous().await,
        "shuffle" => {
            state.playback.toggle_shuffle().await;
        }
        "repeat" => {
            state.playback.toggle_repeat().await;
        }
        "play_track" => {
            let Some(index) = req.index else {
                return bad_request("play_track requires an index");
            };
            if !state.playback.play_track(index).await {
                return bad_request(format!("playlist index out of range: {}", index));
            }
        }
        other => return bad_request(format!("Unknown action: {}", other)),
    }
    (StatusCode::OK, Json(state.playback.snapshot().await)).into_response()
}

/// Volume request body
#[derive(Deserialize)]
pub struct VolumeRequest {
    pub value: i32,
    #[serde(default)]
    pub relative: bool,
}

/// Volume response body
#[derive(Serialize)]
pub struct VolumeResponse {
    pub volume: u8,
}

/// POST /playback/volume - Set or adjust volume (clamped to 0-100)
pub async fn volume_handler(
    State(state): State<AppState>,
    Json(req): Json<VolumeRequest>,
) -> Json<VolumeResponse> {
    let volume = if req.relative {
        state.playback.adjust_volume(req.value).await
    } else {
        state.playback.set_volume(req.value).await
    };
    Json(VolumeResponse { volume })
}

// =============================================================================
// Voice handlers
// =============================================================================

/// Voice command request body
#[derive(Deserialize)]
pub struct VoiceRequest {
    pub transcript: String,
}

/// POST /voice/command - Interpret one transcript
pub async fn voice_handler(
    State(state): State<AppState>,
    Json(req): Json<VoiceRequest>,
) -> impl IntoResponse {
    match state.voice.handle_transcript(&req.transcript).await {
        Ok(outcome) => (StatusCode::OK, Json::<VoiceOutcome>(outcome)).into_response(),
        Err(e) => bad_request(e),
    }
}

/// GET /voice/recent - Recently issued commands
pub async fn voice_recent_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.voice.recent_commands().await)
}

// =============================================================================
// Rule handlers
// =============================================================================

/// GET /rules - All automation rules
pub async fn rules_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.rules.list().await {
        Ok(rules) => (StatusCode::OK, Json::<Vec<AutomationRuleRow>>(rules)).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /rules - Create a rule
pub async fn create_rule_handler(
    State(state): State<AppState>,
    Json(draft): Json<RuleDraft>,
) -> impl IntoResponse {
    match state.rules.create(draft).await {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(e) => bad_request(e),
    }
}

/// Rule toggle request body
#[derive(Deserialize)]
pub struct RuleToggleRequest {
    pub rule_id: String,
    pub enabled: bool,
}

/// POST /rules/toggle - Enable/disable a rule
pub async fn toggle_rule_handler(
    State(state): State<AppState>,
    Json(req): Json<RuleToggleRequest>,
) -> impl IntoResponse {
    match state.rules.set_enabled(&req.rule_id, req.enabled).await {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(e) => not_found(e),
    }
}

/// GET /rules/templates - Quick-start templates
pub async fn rule_templates_handler(
    State(state): State<AppState>,
) -> Json<&'static [RuleTemplate]> {
    Json(state.rules.templates())
}

// =============================================================================
// SSE Events
// =============================================================================

/// GET /events - Server-Sent Events stream
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.bus.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        match result {
            Ok(event) => {
                // Serialize event to JSON
                match serde_json::to_string(&event) {
                    Ok(json) => Some(Ok(Event::default().data(json))),
                    Err(_) => None,
                }
            }
            Err(_) => None, // Skip lagged messages
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
