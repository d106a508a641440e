//! The listen engine: session lifecycle, dispatch scheduling, and result
//! folding.
//!
//! One `ListenEngine` instance composes the session state machine, the
//! dispatch scheduler, the history store, the insight log, and the
//! explanation slot, behind a handle the API layer can share. The session
//! mutex is only ever held for synchronous bookkeeping; every remote call
//! runs in its own spawned task.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, Notify};
use uuid::Uuid;

use glossa_analysis::AnalysisService;
use glossa_core::config::DispatchConfig;
use glossa_core::error::{GlossaError, Result};
use glossa_core::events::DomainEvent;
use glossa_core::types::{AnalysisMode, Chunk, ExplanationSet};
use glossa_source::{SourceEvent, SpeechSource};

use crate::history::HistoryStore;
use crate::lookup::ExplanationSlot;
use crate::session::{DeltaCut, Session, SessionState};

/// Capacity of the domain event broadcast channel. Slow subscribers lag and
/// skip rather than block the engine.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the per-session source event channel.
const SOURCE_CHANNEL_CAPACITY: usize = 64;

/// Point-in-time view of the session, for the API layer.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    pub transcript: String,
    pub cursor: usize,
}

/// The transcript dispatch engine.
///
/// Generic over the analysis service so tests can substitute scripted
/// implementations for the HTTP client.
pub struct ListenEngine<A: AnalysisService + 'static> {
    session: Mutex<Session>,
    history: HistoryStore,
    insights: Mutex<String>,
    explanation: ExplanationSlot,
    analysis: Arc<A>,
    source: Option<Arc<dyn SpeechSource>>,
    events: broadcast::Sender<DomainEvent>,
    // Fresh Notify per session; notifying an old one cannot leak a permit
    // into the next session's scheduler.
    scheduler_shutdown: Mutex<Option<Arc<Notify>>>,
    dispatch: DispatchConfig,
}

impl<A: AnalysisService + 'static> ListenEngine<A> {
    /// Build an engine around an analysis service and an optional speech
    /// source. Without a source, `start` refuses; read-side accessors and
    /// keyword lookups still work.
    pub fn new(
        analysis: Arc<A>,
        source: Option<Arc<dyn SpeechSource>>,
        dispatch: DispatchConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session: Mutex::new(Session::new()),
            history: HistoryStore::new(),
            insights: Mutex::new(String::new()),
            explanation: ExplanationSlot::new(),
            analysis,
            source,
            events,
            scheduler_shutdown: Mutex::new(None),
            dispatch,
        }
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Start a new transcription session.
    ///
    /// Clears the history and insight log, starts the speech source, and
    /// launches the dispatch scheduler. Fails if no source is configured or
    /// a session is already listening.
    pub fn start(self: &Arc<Self>) -> Result<Uuid> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| {
                GlossaError::SourceUnavailable("no speech source configured".to_string())
            })?
            .clone();

        let session_id = self.lock_session().start()?;
        self.history.clear();
        self.clear_insights();

        let (tx, rx) = mpsc::channel(SOURCE_CHANNEL_CAPACITY);
        if let Err(e) = source.start(tx) {
            // Roll the state machine back so a later start can succeed.
            self.lock_session().stop();
            return Err(e);
        }

        let shutdown = Arc::new(Notify::new());
        {
            let mut slot = lock_ignore_poison(&self.scheduler_shutdown);
            *slot = Some(Arc::clone(&shutdown));
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.consume_source_events(session_id, rx).await;
        });

        let engine = Arc::clone(self);
        let interval = Duration::from_secs(self.dispatch.interval_secs.max(1));
        tokio::spawn(async move {
            engine.run_scheduler(session_id, interval, shutdown).await;
        });

        tracing::info!(session_id = %session_id, mode = %self.dispatch.mode, "Session started");
        self.emit(DomainEvent::SessionStarted {
            session_id,
            timestamp: Utc::now(),
        });
        Ok(session_id)
    }

    /// Stop the current session. Idempotent when already Idle.
    ///
    /// The transcript, history, and insight log remain readable until the
    /// next `start`.
    pub fn stop(&self) {
        let (session_id, transcript_len) = {
            let mut session = self.lock_session();
            if session.state() != SessionState::Listening {
                return;
            }
            session.stop();
            (session.id(), session.transcript().len())
        };

        if let Some(source) = &self.source {
            source.stop();
        }
        self.halt_scheduler();

        tracing::info!(session_id = %session_id, "Session stopped");
        self.emit(DomainEvent::SessionStopped {
            session_id,
            transcript_len,
            chunk_count: self.history.len(),
            timestamp: Utc::now(),
        });
    }

    // -------------------------------------------------------------------
    // Source event consumption
    // -------------------------------------------------------------------

    async fn consume_source_events(
        self: Arc<Self>,
        session_id: Uuid,
        mut rx: mpsc::Receiver<SourceEvent>,
    ) {
        while let Some(event) = rx.recv().await {
            match event {
                SourceEvent::Transcript(text) => {
                    let transcript_len = text.len();
                    {
                        let mut session = self.lock_session();
                        // Buffered events from a source the user already
                        // stopped must not bleed into a newer session.
                        if session.id() != session_id {
                            tracing::debug!("Transcript from stale source ignored");
                            continue;
                        }
                        session.apply_update(text);
                    }
                    self.emit(DomainEvent::TranscriptUpdated {
                        session_id,
                        transcript_len,
                        timestamp: Utc::now(),
                    });
                }
                SourceEvent::Error(reason) => {
                    tracing::warn!(session_id = %session_id, error = %reason, "Speech source failed");
                    if self.force_idle(session_id) {
                        self.emit(DomainEvent::SourceFailed {
                            session_id,
                            reason,
                            timestamp: Utc::now(),
                        });
                    }
                    return;
                }
                SourceEvent::Ended => {
                    tracing::info!(session_id = %session_id, "Speech source ended");
                    if self.force_idle(session_id) {
                        self.emit(DomainEvent::SourceEnded {
                            session_id,
                            timestamp: Utc::now(),
                        });
                    }
                    return;
                }
            }
        }
    }

    /// Transition to Idle after an unsolicited source error/end. Returns
    /// false when the session had already moved on.
    fn force_idle(&self, session_id: Uuid) -> bool {
        {
            let mut session = self.lock_session();
            if session.id() != session_id || session.state() != SessionState::Listening {
                return false;
            }
            session.stop();
        }
        self.halt_scheduler();
        true
    }

    // -------------------------------------------------------------------
    // Dispatch scheduling
    // -------------------------------------------------------------------

    async fn run_scheduler(
        self: Arc<Self>,
        session_id: Uuid,
        interval: Duration,
        shutdown: Arc<Notify>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        tracing::debug!(session_id = %session_id, interval_secs = interval.as_secs(), "Dispatch scheduler running");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let cut = {
                        let mut session = self.lock_session();
                        if session.id() != session_id
                            || session.state() != SessionState::Listening
                        {
                            break;
                        }
                        session.cut_delta()
                    };

                    if let Some(cut) = cut {
                        tracing::debug!(
                            session_id = %session_id,
                            offset = cut.offset,
                            delta_len = cut.text.len(),
                            "Delta cut for dispatch"
                        );
                        let engine = Arc::clone(&self);
                        tokio::spawn(async move {
                            engine.dispatch(cut).await;
                        });
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
        tracing::debug!(session_id = %session_id, "Dispatch scheduler stopped");
    }

    async fn dispatch(&self, cut: DeltaCut) {
        match self.dispatch.mode {
            AnalysisMode::Keywords => match self.analysis.extract_keywords(&cut.text).await {
                Ok(keywords) => self.commit_chunk(cut, keywords),
                Err(e) => self.fail_dispatch(cut, e.to_string()),
            },
            AnalysisMode::Insights => match self.analysis.generate_insights(&cut.text).await {
                Ok(insights) => self.commit_insight(cut, insights),
                Err(e) => self.fail_dispatch(cut, e.to_string()),
            },
        }
    }

    /// Fold a resolved keyword response into the history, unless the range
    /// it covers has been invalidated or deferred since the delta was cut.
    fn commit_chunk(&self, cut: DeltaCut, keywords: Vec<String>) {
        let accepted = self
            .lock_session()
            .try_commit_range(cut.session_id, cut.offset, cut.text.len());
        if !accepted {
            tracing::debug!(offset = cut.offset, "Keyword response not committed");
            return;
        }

        let chunk = Chunk::new(cut.text, keywords, cut.offset);
        let event = DomainEvent::ChunkAppended {
            session_id: cut.session_id,
            chunk_id: chunk.id,
            offset: chunk.offset,
            keyword_count: chunk.keywords.len(),
            timestamp: Utc::now(),
        };
        self.history.append(chunk);
        self.emit(event);
    }

    fn commit_insight(&self, cut: DeltaCut, insights: String) {
        let accepted = self
            .lock_session()
            .try_commit_range(cut.session_id, cut.offset, cut.text.len());
        if !accepted {
            tracing::debug!(offset = cut.offset, "Insight response not committed");
            return;
        }

        let insight_len = insights.len();
        {
            let mut log = lock_ignore_poison(&self.insights);
            if !log.is_empty() {
                log.push('\n');
            }
            log.push_str(&insights);
        }
        self.emit(DomainEvent::InsightRecorded {
            session_id: cut.session_id,
            insight_len,
            timestamp: Utc::now(),
        });
    }

    /// Return a failed delta to the unsent region so the next tick re-sends
    /// it merged with whatever arrived since.
    fn fail_dispatch(&self, cut: DeltaCut, reason: String) {
        tracing::warn!(
            session_id = %cut.session_id,
            offset = cut.offset,
            error = %reason,
            "Dispatch failed; delta will be retried"
        );
        self.lock_session().rollback(cut.session_id, cut.offset);
        self.emit(DomainEvent::DispatchFailed {
            session_id: cut.session_id,
            offset: cut.offset,
            reason,
            timestamp: Utc::now(),
        });
    }

    // -------------------------------------------------------------------
    // Keyword detail lookup
    // -------------------------------------------------------------------

    /// Fire a keyword detail lookup.
    ///
    /// Returns as soon as the request is in flight. Concurrent lookups are
    /// allowed and never cancelled; whichever response arrives last replaces
    /// the explanation set. A failed lookup leaves the prior set untouched.
    pub fn fetch_detail(self: &Arc<Self>, keyword: String) -> Result<()> {
        if keyword.trim().is_empty() {
            return Err(GlossaError::Lookup("keyword must not be empty".to_string()));
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            match engine.analysis.keyword_detail(&keyword).await {
                Ok(entries) => {
                    let entry_count = entries.len();
                    engine
                        .explanation
                        .replace(ExplanationSet::new(keyword.clone(), entries));
                    engine.emit(DomainEvent::DetailFetched {
                        keyword,
                        entry_count,
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => {
                    tracing::warn!(keyword = %keyword, error = %e, "Keyword detail lookup failed");
                    engine.emit(DomainEvent::DetailFailed {
                        keyword,
                        reason: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        });
        Ok(())
    }

    // -------------------------------------------------------------------
    // Read-side accessors
    // -------------------------------------------------------------------

    /// Current session state, transcript, and cursor.
    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.lock_session();
        SessionSnapshot {
            session_id: session.id(),
            state: session.state(),
            transcript: session.transcript().to_string(),
            cursor: session.cursor(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock_session().state()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// The accumulated insight log for the current session.
    pub fn insights(&self) -> String {
        lock_ignore_poison(&self.insights).clone()
    }

    /// The most recently fetched keyword explanation.
    pub fn explanation(&self) -> Option<ExplanationSet> {
        self.explanation.get()
    }

    /// Subscribe to the domain event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        lock_ignore_poison(&self.session)
    }

    fn clear_insights(&self) {
        lock_ignore_poison(&self.insights).clear();
    }

    fn halt_scheduler(&self) {
        let shutdown = lock_ignore_poison(&self.scheduler_shutdown).take();
        if let Some(shutdown) = shutdown {
            shutdown.notify_one();
        }
    }

    fn emit(&self, event: DomainEvent) {
        tracing::debug!(event = event.event_name(), "Domain event");
        // No subscribers is fine; the stream endpoint may not be open.
        let _ = self.events.send(event);
    }
}

fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::result::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use glossa_analysis::AnalysisError;
    use glossa_core::types::Explanation;

    /// Test source whose event sender is handed to the test, so transcript
    /// updates can be injected at exact points in virtual time.
    #[derive(Default)]
    struct ManualSource {
        sender: Mutex<Option<mpsc::Sender<SourceEvent>>>,
    }

    impl ManualSource {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        async fn send(&self, event: SourceEvent) {
            let tx = self
                .sender
                .lock()
                .unwrap()
                .clone()
                .expect("source not started");
            tx.send(event).await.unwrap();
        }

        async fn transcript(&self, text: &str) {
            self.send(SourceEvent::Transcript(text.to_string())).await;
        }
    }

    impl SpeechSource for ManualSource {
        fn start(&self, events: mpsc::Sender<SourceEvent>) -> Result<(), GlossaError> {
            *self.sender.lock().unwrap() = Some(events);
            Ok(())
        }

        fn stop(&self) {}
    }

    /// Scripted analysis service: records every dispatched text, can fail
    /// the first N calls (optionally after a delay, so a failure can
    /// resolve later than a subsequent success), and can delay successful
    /// responses in virtual time.
    #[derive(Default)]
    struct StubAnalysis {
        dispatched: Mutex<Vec<String>>,
        failures_remaining: AtomicUsize,
        failure_delay: Option<Duration>,
        response_delay: Option<Duration>,
    }

    impl StubAnalysis {
        fn new() -> Self {
            Self::default()
        }

        fn failing_first(n: usize) -> Self {
            Self {
                failures_remaining: AtomicUsize::new(n),
                ..Self::default()
            }
        }

        fn slow_failing_first(n: usize, delay: Duration) -> Self {
            Self {
                failures_remaining: AtomicUsize::new(n),
                failure_delay: Some(delay),
                ..Self::default()
            }
        }

        fn delayed(delay: Duration) -> Self {
            Self {
                response_delay: Some(delay),
                ..Self::default()
            }
        }

        fn dispatched(&self) -> Vec<String> {
            self.dispatched.lock().unwrap().clone()
        }

        async fn simulate(&self, text: &str) -> Result<(), AnalysisError> {
            self.dispatched.lock().unwrap().push(text.to_string());
            // Claim a scripted failure when the call starts, so a call that
            // begins later resolves as a success even while this one is
            // still pending.
            let failing = self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                if let Some(delay) = self.failure_delay {
                    tokio::time::sleep(delay).await;
                }
                return Err(AnalysisError::Status(500));
            }
            if let Some(delay) = self.response_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        }
    }

    impl AnalysisService for StubAnalysis {
        async fn extract_keywords(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
            self.simulate(text).await?;
            Ok(vec![format!("kw-{}", text.split_whitespace().count())])
        }

        async fn generate_insights(&self, text: &str) -> Result<String, AnalysisError> {
            self.simulate(text).await?;
            Ok(format!("insight: {}", text.trim()))
        }

        async fn keyword_detail(&self, keyword: &str) -> Result<Vec<Explanation>, AnalysisError> {
            // Per-keyword delay lets tests race two lookups: "slow" resolves
            // after "fast" regardless of request order.
            let delay = match keyword {
                "slow" => Duration::from_millis(100),
                "fast" => Duration::from_millis(10),
                _ => Duration::from_millis(1),
            };
            tokio::time::sleep(delay).await;
            if keyword == "broken" {
                return Err(AnalysisError::Status(500));
            }
            Ok(vec![Explanation {
                topic: keyword.to_string(),
                point: format!("about {}", keyword),
            }])
        }
    }

    fn engine_with(
        analysis: StubAnalysis,
        source: Arc<ManualSource>,
        mode: AnalysisMode,
    ) -> Arc<ListenEngine<StubAnalysis>> {
        let dispatch = DispatchConfig {
            interval_secs: 7,
            mode,
        };
        Arc::new(ListenEngine::new(
            Arc::new(analysis),
            Some(source as Arc<dyn SpeechSource>),
            dispatch,
        ))
    }

    fn keyword_engine(
        analysis: StubAnalysis,
        source: Arc<ManualSource>,
    ) -> Arc<ListenEngine<StubAnalysis>> {
        engine_with(analysis, source, AnalysisMode::Keywords)
    }

    /// Let spawned tasks run to quiescence under the paused clock.
    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    /// Advance past the next scheduler tick and let dispatches resolve.
    async fn tick(interval_secs: u64) {
        settle().await;
        tokio::time::advance(Duration::from_secs(interval_secs)).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_source_fails() {
        let engine: Arc<ListenEngine<StubAnalysis>> = Arc::new(ListenEngine::new(
            Arc::new(StubAnalysis::new()),
            None,
            DispatchConfig::default(),
        ));
        let result = engine.start();
        assert!(matches!(result, Err(GlossaError::SourceUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_fails() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        engine.start().unwrap();
        assert!(engine.start().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        engine.stop();
        engine.start().unwrap();
        engine.stop();
        engine.stop();
        assert_eq!(engine.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_growing_transcript_yields_consecutive_chunks() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        engine.start().unwrap();

        source.transcript("hello").await;
        tick(7).await;

        source.transcript("hello world").await;
        tick(7).await;

        let chunks = engine.history().list_chronological();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "hello");
        assert_eq!(chunks[1].text, " world");

        let concatenated: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(concatenated, "hello world");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_transcript_dispatches_once() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        engine.start().unwrap();

        source.transcript("hello").await;
        tick(7).await;
        tick(7).await;
        tick(7).await;

        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.snapshot().cursor, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_delta_is_not_dispatched() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        engine.start().unwrap();

        tick(7).await;
        tick(7).await;

        assert!(engine.history().is_empty());
        assert_eq!(engine.snapshot().cursor, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_dispatch_retries_merged_delta() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::failing_first(1), Arc::clone(&source));
        engine.start().unwrap();

        source.transcript("hello").await;
        tick(7).await;
        // First dispatch failed; cursor rolled back.
        assert!(engine.history().is_empty());

        source.transcript("hello world").await;
        tick(7).await;

        let chunks = engine.history().list_all();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!(chunks[0].offset, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_failure_after_newer_success_does_not_duplicate_history() {
        // The first delta hangs for 20s and then fails; meanwhile a second
        // delta resolves successfully out of order. The late failure's
        // rollback must not cause text the engine already handled to land
        // in the history twice.
        let source = ManualSource::new();
        let analysis = Arc::new(StubAnalysis::slow_failing_first(1, Duration::from_secs(20)));
        let engine = Arc::new(ListenEngine::new(
            Arc::clone(&analysis),
            Some(Arc::clone(&source) as Arc<dyn SpeechSource>),
            DispatchConfig {
                interval_secs: 7,
                mode: AnalysisMode::Keywords,
            },
        ));
        engine.start().unwrap();

        source.transcript("hello").await;
        tick(7).await; // t=7: "hello" dispatched, pending until t=27

        source.transcript("hello world").await;
        tick(7).await; // t=14: " world" resolves while "hello" is pending
        tick(7).await; // t=21: deferred " world" is re-sent, deferred again
        tick(7).await; // t=28: "hello" failed at t=27; merged retry commits

        let chunks = engine.history().list_chronological();
        let concatenated: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(concatenated, "hello world");
        assert_eq!(
            analysis.dispatched(),
            vec!["hello", " world", " world", "hello world"]
        );

        // Recorded ranges are disjoint and ordered; no chunk sits inside
        // the failed range's shadow.
        let mut end = 0;
        for chunk in &chunks {
            assert!(chunk.offset >= end);
            end = chunk.offset + chunk.text.len();
        }
        assert_eq!(engine.snapshot().cursor, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_failure_after_newer_success_does_not_duplicate_insights() {
        let source = ManualSource::new();
        let engine = engine_with(
            StubAnalysis::slow_failing_first(1, Duration::from_secs(20)),
            Arc::clone(&source),
            AnalysisMode::Insights,
        );
        engine.start().unwrap();

        source.transcript("hello").await;
        tick(7).await;
        source.transcript("hello world").await;
        tick(7).await;
        tick(7).await;
        tick(7).await;

        // The merged retry is recorded exactly once; the out-of-order
        // success and the failure leave no extra log lines.
        assert_eq!(engine.insights(), "insight: hello world");
    }

    #[tokio::test(start_paused = true)]
    async fn test_interim_revision_redispatches_from_common_prefix() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        engine.start().unwrap();

        source.transcript("hello word").await;
        tick(7).await;

        // The provider revises already-dispatched interim text.
        source.transcript("hello world").await;
        tick(7).await;

        let chunks = engine.history().list_chronological();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "hello word");
        assert_eq!(chunks[1].text, "ld");
        assert_eq!(chunks[1].offset, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_after_stop_is_discarded() {
        let source = ManualSource::new();
        let engine = keyword_engine(
            StubAnalysis::delayed(Duration::from_millis(50)),
            Arc::clone(&source),
        );
        engine.start().unwrap();

        source.transcript("hello").await;
        settle().await;
        tokio::time::advance(Duration::from_secs(7)).await;
        settle().await;

        // Response still in flight.
        engine.stop();
        tokio::time::advance(Duration::from_millis(50)).await;
        settle().await;

        assert!(engine.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_from_previous_session_is_discarded() {
        let source = ManualSource::new();
        let engine = keyword_engine(
            StubAnalysis::delayed(Duration::from_millis(50)),
            Arc::clone(&source),
        );
        engine.start().unwrap();
        source.transcript("old session text").await;
        settle().await;
        tokio::time::advance(Duration::from_secs(7)).await;
        settle().await;

        engine.stop();
        engine.start().unwrap();

        // The old session's response resolves into the new session.
        tokio::time::advance(Duration::from_millis(50)).await;
        settle().await;

        assert!(engine.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_cursor_and_history() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        engine.start().unwrap();

        source.transcript("first session").await;
        tick(7).await;
        assert_eq!(engine.history().len(), 1);

        engine.stop();
        engine.start().unwrap();

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.cursor, 0);
        assert_eq!(snapshot.transcript, "");
        assert!(engine.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_dispatch_after_stop() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        engine.start().unwrap();

        source.transcript("left behind").await;
        settle().await;
        engine.stop();
        tick(7).await;
        tick(7).await;

        assert!(engine.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_error_forces_idle() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        engine.start().unwrap();

        source.transcript("partial speech").await;
        source.send(SourceEvent::Error("microphone lost".to_string())).await;
        settle().await;

        assert_eq!(engine.state(), SessionState::Idle);
        // Transcript preserved for inspection.
        assert_eq!(engine.snapshot().transcript, "partial speech");

        // Engine recovers: a fresh session can start.
        engine.start().unwrap();
        assert_eq!(engine.state(), SessionState::Listening);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_end_forces_idle_and_stops_dispatch() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        engine.start().unwrap();

        source.transcript("trailing words").await;
        source.send(SourceEvent::Ended).await;
        settle().await;

        assert_eq!(engine.state(), SessionState::Idle);
        tick(7).await;
        assert!(engine.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insights_mode_accumulates_log() {
        let source = ManualSource::new();
        let engine = engine_with(
            StubAnalysis::new(),
            Arc::clone(&source),
            AnalysisMode::Insights,
        );
        engine.start().unwrap();

        source.transcript("first part").await;
        tick(7).await;
        source.transcript("first part second part").await;
        tick(7).await;

        assert_eq!(
            engine.insights(),
            "insight: first part\ninsight: second part"
        );
        // Insights mode records no chunks.
        assert!(engine.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_clears_insight_log() {
        let source = ManualSource::new();
        let engine = engine_with(
            StubAnalysis::new(),
            Arc::clone(&source),
            AnalysisMode::Insights,
        );
        engine.start().unwrap();
        source.transcript("something said").await;
        tick(7).await;
        assert!(!engine.insights().is_empty());

        engine.stop();
        engine.start().unwrap();
        assert_eq!(engine.insights(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_replaces_explanation() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));

        engine.fetch_detail("graph".to_string()).unwrap();
        settle().await;
        tokio::time::advance(Duration::from_millis(5)).await;
        settle().await;

        let set = engine.explanation().unwrap();
        assert_eq!(set.keyword, "graph");
        assert_eq!(set.entries.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_lookups_last_arrival_wins() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));

        // "slow" requested first but resolves last.
        engine.fetch_detail("slow".to_string()).unwrap();
        engine.fetch_detail("fast".to_string()).unwrap();
        settle().await;
        tokio::time::advance(Duration::from_millis(200)).await;
        settle().await;

        assert_eq!(engine.explanation().unwrap().keyword, "slow");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_lookup_keeps_prior_explanation() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));

        engine.fetch_detail("graph".to_string()).unwrap();
        tokio::time::advance(Duration::from_millis(5)).await;
        settle().await;

        engine.fetch_detail("broken".to_string()).unwrap();
        tokio::time::advance(Duration::from_millis(5)).await;
        settle().await;

        assert_eq!(engine.explanation().unwrap().keyword, "graph");
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_rejects_empty_keyword() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        assert!(engine.fetch_detail("  ".to_string()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_are_broadcast() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        let mut rx = engine.subscribe();

        engine.start().unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_name(), "session_started");

        source.transcript("hello").await;
        settle().await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_name(), "transcript_updated");

        tick(7).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_name(), "chunk_appended");

        engine.stop();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_name(), "session_stopped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_updates_between_ticks_merge_into_one_chunk() {
        let source = ManualSource::new();
        let engine = keyword_engine(StubAnalysis::new(), Arc::clone(&source));
        engine.start().unwrap();

        source.transcript("a").await;
        source.transcript("a b").await;
        source.transcript("a b c").await;
        tick(7).await;

        let chunks = engine.history().list_all();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "a b c");
    }
}
