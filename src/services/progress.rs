//! Progress narrative emitted by the stages as they run.
//!
//! Services never print directly; they push [`ProgressEvent`]s into a
//! [`ProgressSink`]. The CLI renders them to stdout, tests record them.

use std::sync::Mutex;

/// One line (or block) of operator-facing narrative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A stage or phase heading.
    Stage(String),
    /// A neutral progress step.
    Step(String),
    /// A success marker.
    Success(String),
    /// A failure marker.
    Failure(String),
    /// Non-fatal anomaly.
    Warning(String),
    /// Verbatim diagnostics from an oracle.
    Detail(String),
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    /// Handle one event.
    fn emit(&self, event: ProgressEvent);

    /// Convenience for [`ProgressEvent::Stage`].
    fn stage(&self, title: &str) {
        self.emit(ProgressEvent::Stage(title.to_string()));
    }

    /// Convenience for [`ProgressEvent::Step`].
    fn step(&self, message: &str) {
        self.emit(ProgressEvent::Step(message.to_string()));
    }

    /// Convenience for [`ProgressEvent::Success`].
    fn success(&self, message: &str) {
        self.emit(ProgressEvent::Success(message.to_string()));
    }

    /// Convenience for [`ProgressEvent::Failure`].
    fn failure(&self, message: &str) {
        self.emit(ProgressEvent::Failure(message.to_string()));
    }

    /// Convenience for [`ProgressEvent::Warning`].
    fn warning(&self, message: &str) {
        self.emit(ProgressEvent::Warning(message.to_string()));
    }

    /// Convenience for [`ProgressEvent::Detail`]; empty text is dropped.
    fn detail(&self, text: &str) {
        if !text.trim().is_empty() {
            self.emit(ProgressEvent::Detail(text.to_string()));
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of failure markers seen.
    pub fn failures(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Failure(_)))
            .count()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
