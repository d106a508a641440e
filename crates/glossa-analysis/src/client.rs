//! HTTP client for the remote analysis service.
//!
//! Three JSON endpoints under one configurable base URL:
//! - `POST /get_keywords`        `{ "text": ... }`    -> `{ "keywords": [...] }`
//! - `POST /get_insights`       `{ "text": ... }`    -> `{ "insights": ... }`
//! - `POST /get_info_on_keyword` `{ "keyword": ... }` -> `{ "information": [...] }`

use std::time::Duration;

use serde::{Deserialize, Serialize};

use glossa_core::config::AnalysisConfig;
use glossa_core::types::Explanation;

use crate::error::AnalysisError;
use crate::AnalysisService;

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct KeywordRequest<'a> {
    keyword: &'a str,
}

#[derive(Debug, Deserialize)]
struct KeywordsResponse {
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InsightsResponse {
    insights: String,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    information: Vec<Explanation>,
}

/// Analysis service client speaking JSON over HTTP.
#[derive(Clone, Debug)]
pub struct HttpAnalysisClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAnalysisClient {
    /// Build a client from configuration.
    ///
    /// The base URL must be non-empty; a trailing slash is tolerated.
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        if config.base_url.trim().is_empty() {
            return Err(AnalysisError::Config(
                "analysis base_url must not be empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, AnalysisError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let response = self.http.post(self.endpoint(path)).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Status(status.as_u16()));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AnalysisError::Malformed(e.to_string()))
    }
}

impl AnalysisService for HttpAnalysisClient {
    async fn extract_keywords(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        let body: KeywordsResponse = self
            .post_json("get_keywords", &TextRequest { text })
            .await?;
        tracing::debug!(
            text_len = text.len(),
            keyword_count = body.keywords.len(),
            "Keywords extracted"
        );
        Ok(body.keywords)
    }

    async fn generate_insights(&self, text: &str) -> Result<String, AnalysisError> {
        let body: InsightsResponse = self
            .post_json("get_insights", &TextRequest { text })
            .await?;
        tracing::debug!(
            text_len = text.len(),
            insight_len = body.insights.len(),
            "Insights generated"
        );
        Ok(body.insights)
    }

    async fn keyword_detail(&self, keyword: &str) -> Result<Vec<Explanation>, AnalysisError> {
        let body: DetailResponse = self
            .post_json("get_info_on_keyword", &KeywordRequest { keyword })
            .await?;
        tracing::debug!(
            keyword = %keyword,
            entry_count = body.information.len(),
            "Keyword detail fetched"
        );
        Ok(body.information)
    }
}
