use thiserror::Error;

/// Top-level error type for the Glossa system.
///
/// Each variant covers one failure domain. Subsystem crates define their
/// own error types where they own an external boundary and implement
/// `From<SubsystemError> for GlossaError` so that the `?` operator works
/// seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GlossaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Speech source error: {0}")]
    Source(String),

    #[error("Speech source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for GlossaError {
    fn from(err: toml::de::Error) -> Self {
        GlossaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for GlossaError {
    fn from(err: toml::ser::Error) -> Self {
        GlossaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for GlossaError {
    fn from(err: serde_json::Error) -> Self {
        GlossaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Glossa operations.
pub type Result<T> = std::result::Result<T, GlossaError>;
