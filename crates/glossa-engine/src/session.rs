//! Transcription session state and cursor bookkeeping.
//!
//! A session owns the live transcript buffer and the dispatch cursor. The
//! lifecycle is a two-state machine:
//! - Idle -> Listening (start)
//! - Listening -> Idle (stop, source error, unsolicited source end)
//!
//! All mutations happen under the engine's session lock and are synchronous,
//! so cursor movement is atomic with respect to delta computation.

use std::fmt;

use uuid::Uuid;

use glossa_core::delta::{reconcile_cursor, unsent_delta};
use glossa_core::error::{GlossaError, Result};

/// Operational state of a transcription session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No session in progress. Ready to start.
    Idle,
    /// Actively consuming transcript updates from the speech source.
    Listening,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Listening => write!(f, "Listening"),
        }
    }
}

/// A delta cut from the transcript, ready for dispatch.
///
/// Captures everything the dispatch task needs so the session lock can be
/// released before any network activity: the session the delta belongs to,
/// the cursor position where it starts, and the text itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaCut {
    pub session_id: Uuid,
    pub offset: usize,
    pub text: String,
}

/// The transcription session: state, transcript buffer, dispatch cursor.
///
/// Two byte offsets track dispatch progress. `cursor` is provisional: it
/// advances when a delta is cut and can move back on rollback or revision.
/// `committed` is settled: everything below it has been recorded exactly
/// once, and ranges commit in transcript order, so the history can never
/// contain the same text twice. `committed <= cursor` always holds.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    state: SessionState,
    transcript: String,
    cursor: usize,
    committed: usize,
}

impl Session {
    /// Create a session in the Idle state with an empty transcript.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            transcript: String::new(),
            cursor: 0,
            committed: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Leading bytes of the transcript already cut for dispatch.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Leading bytes of the transcript whose dispatch result is recorded.
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Transition Idle -> Listening, minting a fresh session id and
    /// resetting the transcript and cursor.
    ///
    /// Fails if the session is already Listening.
    pub fn start(&mut self) -> Result<Uuid> {
        if self.state == SessionState::Listening {
            return Err(GlossaError::Session(
                "session already listening".to_string(),
            ));
        }
        self.id = Uuid::new_v4();
        self.state = SessionState::Listening;
        self.transcript.clear();
        self.cursor = 0;
        self.committed = 0;
        tracing::debug!(session_id = %self.id, "Session state: Idle -> Listening");
        Ok(self.id)
    }

    /// Transition Listening -> Idle. Idempotent when already Idle.
    ///
    /// The transcript and cursor are preserved for inspection; they reset
    /// on the next `start`.
    pub fn stop(&mut self) {
        if self.state == SessionState::Listening {
            tracing::debug!(session_id = %self.id, "Session state: Listening -> Idle");
            self.state = SessionState::Idle;
        }
    }

    /// Apply a wholesale transcript replacement from the speech source.
    ///
    /// Reconciles the cursor against the new text: under append-only growth
    /// the cursor is untouched; when already-dispatched text was revised,
    /// the cursor clamps back to the common-prefix boundary so the revised
    /// tail is re-sent. Updates are ignored while Idle.
    pub fn apply_update(&mut self, next: String) {
        if self.state != SessionState::Listening {
            tracing::debug!("Transcript update ignored while Idle");
            return;
        }
        let reconciled = reconcile_cursor(&self.transcript, &next, self.cursor);
        if reconciled != self.cursor {
            tracing::debug!(
                from = self.cursor,
                to = reconciled,
                "Cursor clamped after transcript revision"
            );
        }
        self.cursor = reconciled;
        // Text past the common prefix was revised; it is no longer settled
        // and will be re-dispatched.
        self.committed = self.committed.min(reconciled);
        self.transcript = next;
    }

    /// Cut the unsent delta and advance the cursor past it.
    ///
    /// Returns `None` when the delta is empty (the cursor does not move) or
    /// the session is not Listening. The advance happens here, before any
    /// remote call, so a later tick cannot cut the same text again.
    pub fn cut_delta(&mut self) -> Option<DeltaCut> {
        if self.state != SessionState::Listening {
            return None;
        }
        let delta = unsent_delta(&self.transcript, self.cursor);
        if delta.is_empty() {
            return None;
        }
        let cut = DeltaCut {
            session_id: self.id,
            offset: self.cursor,
            text: delta.to_string(),
        };
        self.cursor = self.transcript.len();
        Some(cut)
    }

    /// Roll the cursor back to a failed dispatch's start position.
    ///
    /// The advance in `cut_delta` is provisional; a dispatch failure
    /// returns the range to the unsent region so the next tick re-sends it
    /// merged with whatever arrived since. The rollback never undercuts
    /// the committed watermark, so recorded text cannot re-enter the
    /// unsent region. No-op if the session has been restarted (id
    /// mismatch) or the cursor is already at or behind the offset.
    pub fn rollback(&mut self, session_id: Uuid, offset: usize) {
        if self.id != session_id {
            tracing::debug!("Rollback ignored for stale session");
            return;
        }
        let target = offset.max(self.committed);
        if target < self.cursor {
            tracing::debug!(from = self.cursor, to = target, "Cursor rolled back");
            self.cursor = target;
        }
    }

    /// Attempt to commit a resolved dispatch for `[offset, offset + len)`.
    ///
    /// Returns true when the caller may record the result. Commits advance
    /// in transcript order: the session must still be Listening under the
    /// same id, the range must still lie inside the dispatched region (a
    /// rollback or revision that clamped the cursor below the range's end
    /// means it will be re-sent), and everything before the range must
    /// already be committed. A success that arrives while an earlier delta
    /// is still unresolved is returned to the unsent region and re-sent on
    /// a later tick instead of committing around the gap — if the earlier
    /// delta then fails, its rollback would otherwise re-dispatch text
    /// this range already recorded.
    pub fn try_commit_range(&mut self, session_id: Uuid, offset: usize, len: usize) -> bool {
        if self.state != SessionState::Listening
            || self.id != session_id
            || self.cursor < offset + len
        {
            return false;
        }
        if offset > self.committed {
            tracing::debug!(
                offset,
                committed = self.committed,
                "Out-of-order response returned to unsent region"
            );
            self.cursor = offset;
            return false;
        }
        if offset < self.committed {
            // Already covered by a committed range.
            return false;
        }
        self.committed = offset + len;
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
