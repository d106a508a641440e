//! Glossa API crate - axum HTTP server, route handlers, SSE streaming.
//!
//! Exposes the engine over localhost HTTP: session lifecycle, live
//! transcript, chunk history, insight log, keyword lookup, and a domain
//! event stream.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
