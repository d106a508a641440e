//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/body parameters via axum extractors, calls
//! into the engine through AppState, and returns JSON responses.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use glossa_analysis::AnalysisService;
use glossa_core::types::{Chunk, ExplanationSet};
use glossa_engine::SessionState;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Query and body parameter types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// "arrival" (default) or "chronological".
    pub order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub keyword: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub session_state: String,
    pub chunk_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub state: String,
    pub transcript: String,
    pub cursor: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub chunks: Vec<Chunk>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub insights: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub success: bool,
    pub keyword: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExplanationResponse {
    pub explanation: ExplanationSet,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health - health check.
pub async fn health<A: AnalysisService + 'static>(
    State(state): State<AppState<A>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let uptime = state.start_time.elapsed().as_secs();

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: "0.1.0".to_string(),
        uptime_secs: uptime,
        session_state: state.engine.state().to_string(),
        chunk_count: state.engine.history().len(),
    }))
}

/// POST /session/start - start a transcription session.
pub async fn session_start<A: AnalysisService + 'static>(
    State(state): State<AppState<A>>,
) -> Result<Json<StartResponse>, ApiError> {
    let session_id = state.engine.start().map_err(ApiError::from)?;
    Ok(Json(StartResponse { session_id }))
}

/// POST /session/stop - stop the current session.
///
/// Idempotent: stopping an idle engine succeeds with a different message.
pub async fn session_stop<A: AnalysisService + 'static>(
    State(state): State<AppState<A>>,
) -> Result<Json<StopResponse>, ApiError> {
    let was_listening = state.engine.state() == SessionState::Listening;
    state.engine.stop();

    let message = if was_listening {
        "Session stopped".to_string()
    } else {
        "No session in progress".to_string()
    };
    Ok(Json(StopResponse {
        success: true,
        message,
    }))
}

/// GET /session - current session state, transcript, and cursor.
pub async fn session<A: AnalysisService + 'static>(
    State(state): State<AppState<A>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let snapshot = state.engine.snapshot();
    Ok(Json(SessionResponse {
        session_id: snapshot.session_id,
        state: snapshot.state.to_string(),
        transcript: snapshot.transcript,
        cursor: snapshot.cursor,
    }))
}

/// GET /history - dispatched chunks, in arrival or chronological order.
pub async fn history<A: AnalysisService + 'static>(
    State(state): State<AppState<A>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let chunks = match params.order.as_deref() {
        None | Some("arrival") => state.engine.history().list_all(),
        Some("chronological") => state.engine.history().list_chronological(),
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "Unknown order '{}'; expected 'arrival' or 'chronological'",
                other
            )))
        }
    };

    let count = chunks.len();
    Ok(Json(HistoryResponse { chunks, count }))
}

/// GET /insights - the accumulated insight log.
pub async fn insights<A: AnalysisService + 'static>(
    State(state): State<AppState<A>>,
) -> Result<Json<InsightsResponse>, ApiError> {
    Ok(Json(InsightsResponse {
        insights: state.engine.insights(),
    }))
}

/// POST /lookup - fire a keyword detail lookup.
///
/// Returns as soon as the request is in flight; the result lands at
/// GET /explanation and on the event stream.
pub async fn lookup<A: AnalysisService + 'static>(
    State(state): State<AppState<A>>,
    Json(body): Json<LookupRequest>,
) -> Result<Json<LookupResponse>, ApiError> {
    state
        .engine
        .fetch_detail(body.keyword.clone())
        .map_err(ApiError::from)?;

    Ok(Json(LookupResponse {
        success: true,
        keyword: body.keyword,
    }))
}

/// GET /explanation - the most recently fetched keyword explanation.
pub async fn explanation<A: AnalysisService + 'static>(
    State(state): State<AppState<A>>,
) -> Result<Json<ExplanationResponse>, ApiError> {
    match state.engine.explanation() {
        Some(explanation) => Ok(Json(ExplanationResponse { explanation })),
        None => Err(ApiError::NotFound(
            "No explanation fetched yet".to_string(),
        )),
    }
}

/// GET /stream - SSE stream of domain events.
pub async fn stream<A: AnalysisService + 'static>(
    State(state): State<AppState<A>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>> + Send> {
    let rx = state.engine.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().event(event.event_name()).data(data)))
        }
        // Lagged subscriber: skip the gap, keep streaming.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
