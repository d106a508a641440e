use thiserror::Error;

use glossa_core::error::GlossaError;

/// Errors from the remote analysis service boundary.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("config error: {0}")]
    Config(String),
}

impl From<AnalysisError> for GlossaError {
    fn from(err: AnalysisError) -> Self {
        GlossaError::Dispatch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_status() {
        let e = AnalysisError::Status(502);
        assert_eq!(e.to_string(), "service returned status 502");
    }

    #[test]
    fn test_error_display_malformed() {
        let e = AnalysisError::Malformed("missing keywords field".to_string());
        assert_eq!(e.to_string(), "malformed response: missing keywords field");
    }

    #[test]
    fn test_error_display_config() {
        let e = AnalysisError::Config("empty base url".to_string());
        assert_eq!(e.to_string(), "config error: empty base url");
    }

    #[test]
    fn test_conversion_to_glossa_error() {
        let e: GlossaError = AnalysisError::Status(500).into();
        assert!(matches!(e, GlossaError::Dispatch(_)));
        assert!(e.to_string().contains("500"));
    }
}
