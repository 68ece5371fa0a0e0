//! Run-state sink.

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::registry::{EntityKey, Registry};

/// State of an entity within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum RunState {
    Enqueued,
    Passed,
    Errored(String),
    Skipped,
}

impl RunState {
    /// Whether this is a final verdict rather than a progress mark.
    pub fn is_verdict(&self) -> bool {
        !matches!(self, RunState::Enqueued)
    }
}

/// Receives run-state transitions and process output.
///
/// Implementations are shared between the coordinator and the tasks that
/// watch each process, so every method takes `&self`.
pub trait RunReporter: Send + Sync {
    fn enqueued(&self, key: &EntityKey);
    fn passed(&self, key: &EntityKey);
    fn errored(&self, key: &EntityKey, message: &str);
    fn skipped(&self, key: &EntityKey);

    /// Raw process output for `key`, line endings normalized to `\r\n`.
    fn output(&self, key: &EntityKey, text: &str);

    /// The run is closed; no further calls follow.
    fn end(&self) {}
}

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEvent {
    pub key: EntityKey,
    #[serde(flatten)]
    pub state: RunState,
}

/// Verdict totals of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub passed: usize,
    pub errored: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.passed + self.errored + self.skipped
    }
}

#[derive(Debug, Default)]
struct LogInner {
    events: Vec<RunEvent>,
    output: String,
    ended: bool,
}

/// In-memory reporter recording everything it is told.
#[derive(Debug, Default)]
pub struct RunLog {
    inner: Mutex<LogInner>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, key: &EntityKey, state: RunState) {
        self.lock().events.push(RunEvent {
            key: key.clone(),
            state,
        });
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.lock().events.clone()
    }

    /// Every state reported for `key`, in order.
    pub fn states(&self, key: &EntityKey) -> Vec<RunState> {
        self.lock()
            .events
            .iter()
            .filter(|e| &e.key == key)
            .map(|e| e.state.clone())
            .collect()
    }

    /// Last verdict reported for `key`.
    pub fn verdict(&self, key: &EntityKey) -> Option<RunState> {
        self.lock()
            .events
            .iter()
            .rev()
            .find(|e| &e.key == key && e.state.is_verdict())
            .map(|e| e.state.clone())
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for event in &self.lock().events {
            match event.state {
                RunState::Passed => summary.passed += 1,
                RunState::Errored(_) => summary.errored += 1,
                RunState::Skipped => summary.skipped += 1,
                RunState::Enqueued => {}
            }
        }
        summary
    }

    pub fn output(&self) -> String {
        self.lock().output.clone()
    }

    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    /// Copy the recorded states into `registry`, returning how many entities
    /// were still registered.
    pub fn apply_to(&self, registry: &mut Registry) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| registry.set_state(&e.key, e.state.clone()))
            .count()
    }
}

impl RunReporter for RunLog {
    fn enqueued(&self, key: &EntityKey) {
        self.record(key, RunState::Enqueued);
    }

    fn passed(&self, key: &EntityKey) {
        self.record(key, RunState::Passed);
    }

    fn errored(&self, key: &EntityKey, message: &str) {
        self.record(key, RunState::Errored(message.to_string()));
    }

    fn skipped(&self, key: &EntityKey) {
        self.record(key, RunState::Skipped);
    }

    fn output(&self, _key: &EntityKey, text: &str) {
        self.lock().output.push_str(text);
    }

    fn end(&self) {
        self.lock().ended = true;
    }
}
