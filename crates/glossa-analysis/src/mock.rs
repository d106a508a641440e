//! Mock analysis service for tests and offline demos.

use glossa_core::types::Explanation;

use crate::error::AnalysisError;
use crate::AnalysisService;

/// Deterministic analysis service that derives results from its input.
///
/// Keywords are the distinct words of the delta longer than three
/// characters, insights echo the delta, and keyword detail returns a single
/// canned topic/point pair. Lets the engine and the demo mode run without a
/// deployed analysis service.
#[derive(Clone, Debug, Default)]
pub struct MockAnalysisService;

impl MockAnalysisService {
    pub fn new() -> Self {
        Self
    }
}

impl AnalysisService for MockAnalysisService {
    async fn extract_keywords(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::Malformed(
                "cannot extract keywords from empty text".to_string(),
            ));
        }

        let mut keywords: Vec<String> = Vec::new();
        for word in text.split_whitespace() {
            let cleaned: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if cleaned.len() > 3 && !keywords.contains(&cleaned) {
                keywords.push(cleaned);
            }
        }
        Ok(keywords)
    }

    async fn generate_insights(&self, text: &str) -> Result<String, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::Malformed(
                "cannot generate insights from empty text".to_string(),
            ));
        }
        Ok(format!("Observed: {}", text.trim()))
    }

    async fn keyword_detail(&self, keyword: &str) -> Result<Vec<Explanation>, AnalysisError> {
        if keyword.trim().is_empty() {
            return Err(AnalysisError::Malformed("empty keyword".to_string()));
        }
        Ok(vec![Explanation {
            topic: keyword.to_string(),
            point: format!("Placeholder explanation for '{}'", keyword),
        }])
    }
}
