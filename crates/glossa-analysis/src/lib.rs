//! Glossa analysis crate - the remote analysis service boundary.
//!
//! Provides a trait-based abstraction over the three analysis endpoints
//! (keyword extraction, insight generation, keyword detail), an HTTP client
//! implementation, and a mock for testing without a running service.

pub mod client;
pub mod error;
pub mod mock;

pub use client::HttpAnalysisClient;
pub use error::AnalysisError;
pub use mock::MockAnalysisService;

use std::future::Future;

use glossa_core::types::Explanation;

/// Remote analysis operations consumed by the dispatch engine.
///
/// All three calls are independent request/response exchanges; the engine
/// may have several in flight at once and never requires ordering between
/// them.
pub trait AnalysisService: Send + Sync {
    /// Extract keywords from a transcript delta.
    ///
    /// Returns the keywords in the order the service reported them.
    fn extract_keywords(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Vec<String>, AnalysisError>> + Send;

    /// Generate insights for a transcript delta.
    ///
    /// Returns free-form text the caller accumulates.
    fn generate_insights(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<String, AnalysisError>> + Send;

    /// Fetch a deep-dive explanation for a single keyword.
    fn keyword_detail(
        &self,
        keyword: &str,
    ) -> impl Future<Output = Result<Vec<Explanation>, AnalysisError>> + Send;
}
