pub mod config;
pub mod delta;
pub mod error;
pub mod events;
pub mod types;

pub use config::GlossaConfig;
pub use error::{GlossaError, Result};
pub use events::DomainEvent;
pub use types::*;
