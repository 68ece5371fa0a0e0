//! Batch execution with cooperative cancellation.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::Config;
use crate::executor::{ExecutorError, ProcessRunExecutor, RunHandle, RunReporter};
use crate::registry::{EntityKey, Registry};

/// Requests cancellation of the runs holding its tokens.
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

/// Observes a [`CancelSource`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// A connected source and token.
pub fn cancel_pair() -> (CancelSource, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelSource { tx }, CancelToken { rx })
}

impl CancelSource {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken { rx: self.tx.subscribe() }
    }
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn none() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; never if the source is
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// What happened to a batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub run_id: Uuid,
    pub started: usize,
    /// Entities never started because cancellation came first.
    pub not_started: usize,
    pub cancelled: bool,
}

/// Runs batches of entities through the executor.
pub struct RunCoordinator {
    executor: ProcessRunExecutor,
    poll_interval: Duration,
}

impl RunCoordinator {
    pub fn new(config: Config, reporter: Arc<dyn RunReporter>) -> Result<Self, ExecutorError> {
        let poll_interval = config.runner.poll_interval();
        Ok(Self {
            executor: ProcessRunExecutor::new(config, reporter)?,
            poll_interval,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn executor(&self) -> &ProcessRunExecutor {
        &self.executor
    }

    /// Start every entity in order, then wait until all are terminal or
    /// cancellation is requested. The reporter's run is closed on return.
    ///
    /// Entities reached after cancellation are reported skipped without
    /// being started.
    #[tracing::instrument(skip_all, fields(run_id = tracing::field::Empty, entities = keys.len()))]
    pub async fn run_batch(&self, registry: &Registry, keys: &[EntityKey], cancel: &CancelToken) -> BatchOutcome {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let reporter = self.executor.reporter();

        let mut handles: Vec<RunHandle> = Vec::with_capacity(keys.len());
        let mut not_started = 0;
        for key in keys {
            if cancel.is_cancelled() {
                reporter.skipped(key);
                not_started += 1;
                continue;
            }
            reporter.enqueued(key);
            handles.push(self.executor.start(registry, key));
        }
        tracing::info!(started = handles.len(), "batch started");

        loop {
            if cancel.is_cancelled() {
                let killed = handles.iter().filter(|h| h.kill()).count();
                tracing::info!(killed, "batch cancelled");
                break;
            }
            if handles.iter().all(RunHandle::is_terminal) {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancel.cancelled() => {}
            }
        }

        // a run that won its race against kill is reporting its own verdict
        while !handles.iter().all(RunHandle::is_terminal) {
            tokio::task::yield_now().await;
        }

        reporter.end();
        BatchOutcome {
            run_id,
            started: handles.len(),
            not_started,
            cancelled: cancel.is_cancelled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_token() {
        let (source, token) = cancel_pair();
        let other = source.token();
        assert!(!token.is_cancelled());

        source.cancel();
        assert!(token.is_cancelled());
        assert!(other.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_dropped_source_never_cancels() {
        let (source, token) = cancel_pair();
        drop(source);
        let waited = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(waited.is_err());
        assert!(!token.is_cancelled());
        assert!(!CancelToken::none().is_cancelled());
    }
}
