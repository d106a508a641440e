use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which remote analysis drives the periodic dispatch flow.
///
/// Exactly one mode is active per session; keywords and insights are
/// mutually exclusive within the same session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Each delta is sent for keyword extraction and recorded as a chunk.
    #[default]
    Keywords,
    /// Each delta is sent for insight generation, accumulated textually.
    Insights,
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisMode::Keywords => write!(f, "keywords"),
            AnalysisMode::Insights => write!(f, "insights"),
        }
    }
}

/// One unit of dispatched transcript plus what the analysis service said
/// about it.
///
/// Created exactly once per successful dispatch of a non-empty delta and
/// immutable afterwards. `offset` is the value of the session cursor at the
/// moment the delta was cut; because chunks are appended in response-arrival
/// order, chronological consumers sort by it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier for this chunk.
    pub id: Uuid,
    /// The dispatched delta text.
    pub text: String,
    /// Keywords extracted from `text`, in service order. Scoped to this
    /// chunk; the same keyword may appear in other chunks independently.
    pub keywords: Vec<String>,
    /// Session cursor position where this delta started.
    pub offset: usize,
    /// Wall-clock time the chunk was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Chunk {
    /// Create a chunk for a dispatched delta.
    pub fn new(text: String, keywords: Vec<String>, offset: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            keywords,
            offset,
            timestamp: Utc::now(),
        }
    }
}

/// A single topic/point pair from a keyword detail lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub topic: String,
    pub point: String,
}

/// The detail result for the most recently resolved keyword lookup.
///
/// Wholesale-replaced on each successful lookup; never merged with prior
/// sets, and there is no historical record of superseded sets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExplanationSet {
    /// The keyword this set explains.
    pub keyword: String,
    /// Topic/point pairs in service order.
    pub entries: Vec<Explanation>,
    /// When the lookup resolved.
    pub fetched_at: DateTime<Utc>,
}

impl ExplanationSet {
    pub fn new(keyword: String, entries: Vec<Explanation>) -> Self {
        Self {
            keyword,
            entries,
            fetched_at: Utc::now(),
        }
    }
}
