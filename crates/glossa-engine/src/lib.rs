//! Glossa engine crate - incremental transcript dispatch.
//!
//! Ties the session state machine, the dispatch scheduler, the chunk
//! history, and the keyword detail lookup together behind [`ListenEngine`].
//! The engine owns all mutable state; the API layer holds it in an `Arc`
//! and only ever calls into it.

pub mod engine;
pub mod history;
pub mod lookup;
pub mod session;

pub use engine::{ListenEngine, SessionSnapshot};
pub use history::HistoryStore;
pub use lookup::ExplanationSlot;
pub use session::{DeltaCut, Session, SessionState};
