use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All domain events that can occur in the Glossa system.
///
/// Events are emitted after state changes and consumed by:
/// - The SSE broadcast channel (for live UI updates)
/// - The tracing log (for debugging)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DomainEvent {
    /// A new transcription session started.
    SessionStarted {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// The session was stopped, by the user or by the source.
    SessionStopped {
        session_id: Uuid,
        transcript_len: usize,
        chunk_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The speech source reported a replacement transcript.
    TranscriptUpdated {
        session_id: Uuid,
        transcript_len: usize,
        timestamp: DateTime<Utc>,
    },

    /// The speech source reported a mid-session failure.
    SourceFailed {
        session_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The speech source closed on its own (e.g. prolonged silence).
    SourceEnded {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A dispatched delta resolved and was recorded as a chunk.
    ChunkAppended {
        session_id: Uuid,
        chunk_id: Uuid,
        offset: usize,
        keyword_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A dispatch failed; its delta will be retried on a later tick.
    DispatchFailed {
        session_id: Uuid,
        offset: usize,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// An insight response was appended to the insight log.
    InsightRecorded {
        session_id: Uuid,
        insight_len: usize,
        timestamp: DateTime<Utc>,
    },

    /// A keyword detail lookup resolved and replaced the explanation set.
    DetailFetched {
        keyword: String,
        entry_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A keyword detail lookup failed; the prior explanation set stands.
    DetailFailed {
        keyword: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::SessionStarted { timestamp, .. }
            | DomainEvent::SessionStopped { timestamp, .. }
            | DomainEvent::TranscriptUpdated { timestamp, .. }
            | DomainEvent::SourceFailed { timestamp, .. }
            | DomainEvent::SourceEnded { timestamp, .. }
            | DomainEvent::ChunkAppended { timestamp, .. }
            | DomainEvent::DispatchFailed { timestamp, .. }
            | DomainEvent::InsightRecorded { timestamp, .. }
            | DomainEvent::DetailFetched { timestamp, .. }
            | DomainEvent::DetailFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a human-readable event name for logging and SSE.
    pub fn event_name(&self) -> &'static str {
        match self {
            DomainEvent::SessionStarted { .. } => "session_started",
            DomainEvent::SessionStopped { .. } => "session_stopped",
            DomainEvent::TranscriptUpdated { .. } => "transcript_updated",
            DomainEvent::SourceFailed { .. } => "source_failed",
            DomainEvent::SourceEnded { .. } => "source_ended",
            DomainEvent::ChunkAppended { .. } => "chunk_appended",
            DomainEvent::DispatchFailed { .. } => "dispatch_failed",
            DomainEvent::InsightRecorded { .. } => "insight_recorded",
            DomainEvent::DetailFetched { .. } => "detail_fetched",
            DomainEvent::DetailFailed { .. } => "detail_failed",
        }
    }
}
