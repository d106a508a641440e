//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, request tracing, and all endpoint
//! handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use glossa_analysis::AnalysisService;
use glossa_core::error::GlossaError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router<A: AnalysisService + 'static>(state: AppState<A>) -> Router {
    // Local UI origins only; the server itself binds to localhost.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| {
            origin.as_bytes().starts_with(b"http://127.0.0.1")
                || origin.as_bytes().starts_with(b"http://localhost")
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health::<A>))
        .route("/session/start", post(handlers::session_start::<A>))
        .route("/session/stop", post(handlers::session_stop::<A>))
        .route("/session", get(handlers::session::<A>))
        .route("/history", get(handlers::history::<A>))
        .route("/insights", get(handlers::insights::<A>))
        .route("/lookup", post(handlers::lookup::<A>))
        .route("/explanation", get(handlers::explanation::<A>))
        .route("/stream", get(handlers::stream::<A>))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured port.
///
/// Binds to 127.0.0.1 (localhost only).
pub async fn start_server<A: AnalysisService + 'static>(
    state: AppState<A>,
) -> Result<(), GlossaError> {
    let addr = format!("127.0.0.1:{}", state.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GlossaError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| GlossaError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
