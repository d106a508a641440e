//! Application state shared across all route handlers.
//!
//! AppState wraps the engine handle plus server metadata. It is passed to
//! handlers via axum's State extractor and stays generic over the analysis
//! service so tests can run against the mock.

use std::sync::Arc;
use std::time::Instant;

use glossa_analysis::AnalysisService;
use glossa_engine::ListenEngine;

/// Shared application state.
pub struct AppState<A: AnalysisService + 'static> {
    /// The transcript dispatch engine.
    pub engine: Arc<ListenEngine<A>>,
    /// API server port, for CORS and logging.
    pub port: u16,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

// Derived Clone would require A: Clone; the Arc makes cloning cheap anyway.
impl<A: AnalysisService + 'static> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            port: self.port,
            start_time: self.start_time,
        }
    }
}

impl<A: AnalysisService + 'static> AppState<A> {
    pub fn new(engine: Arc<ListenEngine<A>>, port: u16) -> Self {
        Self {
            engine,
            port,
            start_time: Instant::now(),
        }
    }
}
