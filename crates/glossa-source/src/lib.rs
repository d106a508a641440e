//! Glossa source crate - the speech recognition provider boundary.
//!
//! Provides a capability trait for continuous, callback-driven speech
//! sources, along with two implementations: a `ScriptedSource` that replays
//! a fixed event script for deterministic tests and demos, and a
//! `StdinSource` that turns typed lines into cumulative transcript updates.
//!
//! A source reports the *full* transcript so far on every update — it never
//! appends. Revisions of interim text are therefore visible to consumers as
//! replacements whose prefix differs from the previous report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use glossa_core::error::{GlossaError, Result};

/// A notification from the speech source.
///
/// Mirrors the three callbacks a continuous recognition provider exposes:
/// result, error, and end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceEvent {
    /// The full transcript reported so far. Replaces, never appends.
    Transcript(String),
    /// Recognition failed mid-session.
    Error(String),
    /// The provider closed on its own (e.g. after prolonged silence).
    Ended,
}

/// A continuous speech recognition provider.
///
/// `start` begins recognition and delivers events on the given channel
/// until `stop` is called or the provider ends on its own. Implementations
/// must tolerate `stop` being called more than once, and after `start` has
/// already terminated.
pub trait SpeechSource: Send + Sync {
    /// Begin recognition, delivering events to `events`.
    ///
    /// Returns an error if the provider cannot start (device missing,
    /// already running, etc.). Event delivery happens on background tasks;
    /// this call does not block for the life of the session.
    fn start(&self, events: mpsc::Sender<SourceEvent>) -> Result<()>;

    /// Stop recognition. Idempotent; no further events are produced after
    /// the in-flight ones drain.
    fn stop(&self);
}

// =============================================================================
// Scripted source
// =============================================================================

/// A single step in a scripted recognition session.
#[derive(Clone, Debug)]
pub struct ScriptStep {
    /// Delay before emitting the event.
    pub after: Duration,
    /// The event to emit.
    pub event: SourceEvent,
}

impl ScriptStep {
    pub fn new(after: Duration, event: SourceEvent) -> Self {
        Self { after, event }
    }
}

/// Speech source that replays a fixed script of events.
///
/// Used for testing the engine without a real recognition backend, and as
/// a demo provider. Each `start` replays the whole script from the top.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    script: Vec<ScriptStep>,
    stopped: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self {
            script,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Convenience constructor: cumulative transcript updates at a fixed
    /// cadence, followed by an `Ended` event.
    pub fn from_transcripts(updates: Vec<String>, cadence: Duration) -> Self {
        let mut script: Vec<ScriptStep> = updates
            .into_iter()
            .map(|t| ScriptStep::new(cadence, SourceEvent::Transcript(t)))
            .collect();
        script.push(ScriptStep::new(cadence, SourceEvent::Ended));
        Self::new(script)
    }
}

impl SpeechSource for ScriptedSource {
    fn start(&self, events: mpsc::Sender<SourceEvent>) -> Result<()> {
        self.stopped.store(false, Ordering::SeqCst);
        let script = self.script.clone();
        let stopped = Arc::clone(&self.stopped);

        tokio::spawn(async move {
            for step in script {
                tokio::time::sleep(step.after).await;
                if stopped.load(Ordering::SeqCst) {
                    tracing::debug!("Scripted source stopped before script end");
                    return;
                }
                if events.send(step.event).await.is_err() {
                    // Receiver dropped; session is gone.
                    return;
                }
            }
        });

        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

// =============================================================================
// Stdin source
// =============================================================================

/// Speech source backed by standard input.
///
/// Each line typed is treated as newly finalized speech and folded into a
/// cumulative transcript, which is reported wholesale like a real
/// recognition provider would. EOF is reported as an unsolicited `Ended`.
///
/// A reader parked on stdin cannot be interrupted, so each `start` retires
/// the previous reader's stop flag and arms a fresh one. A retired reader
/// exits the first time it wakes up; it never races a newer reader for
/// lines.
#[derive(Default)]
pub struct StdinSource {
    stopped: Mutex<Arc<AtomicBool>>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retire the previous reader (if any) and return the fresh stop flag
    /// for the next one.
    fn retire_and_arm(&self) -> Arc<AtomicBool> {
        let fresh = Arc::new(AtomicBool::new(false));
        let mut current = match self.stopped.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        current.store(true, Ordering::SeqCst);
        *current = Arc::clone(&fresh);
        fresh
    }

    fn current_flag(&self) -> Arc<AtomicBool> {
        match self.stopped.lock() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}

impl SpeechSource for StdinSource {
    fn start(&self, events: mpsc::Sender<SourceEvent>) -> Result<()> {
        if events.is_closed() {
            return Err(GlossaError::Source(
                "event channel already closed".to_string(),
            ));
        }
        let stopped = self.retire_and_arm();
        tokio::spawn(pump_lines(
            BufReader::new(tokio::io::stdin()),
            events,
            stopped,
        ));
        Ok(())
    }

    fn stop(&self) {
        self.current_flag().store(true, Ordering::SeqCst);
    }
}

/// Fold lines from `reader` into a cumulative transcript until EOF, a read
/// error, a dropped receiver, or the stop flag.
async fn pump_lines<R>(reader: R, events: mpsc::Sender<SourceEvent>, stopped: Arc<AtomicBool>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut transcript = String::new();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if stopped.load(Ordering::SeqCst) {
                    return;
                }
                if !transcript.is_empty() {
                    transcript.push(' ');
                }
                transcript.push_str(line.trim_end());
                if events
                    .send(SourceEvent::Transcript(transcript.clone()))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Ok(None) => {
                let _ = events.send(SourceEvent::Ended).await;
                return;
            }
            Err(e) => {
                let _ = events.send(SourceEvent::Error(e.to_string())).await;
                return;
            }
        }
    }
}
