//! Terminal run reporter.

use indicatif::{ProgressBar, ProgressStyle};
use specwalk_core::{EntityKey, RunLog, RunReporter, Workspace};
use std::io::Write;
use std::sync::Arc;

use crate::commands::describe;

/// Streams process output above a progress bar and records into a [`RunLog`].
pub struct ConsoleReporter {
    log: Arc<RunLog>,
    workspace: Workspace,
    progress: ProgressBar,
}

impl ConsoleReporter {
    pub fn new(log: Arc<RunLog>, workspace: Workspace, total: usize) -> Self {
        let progress = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style);
        Self {
            log,
            workspace,
            progress,
        }
    }

    fn settle(&self, key: &EntityKey, verdict: &str) {
        self.progress
            .println(format!("{:>7}  {}", verdict, describe(key, &self.workspace)));
        self.progress.inc(1);
    }
}

impl RunReporter for ConsoleReporter {
    fn enqueued(&self, key: &EntityKey) {
        self.log.enqueued(key);
        self.progress.set_message(describe(key, &self.workspace));
    }

    fn passed(&self, key: &EntityKey) {
        self.log.passed(key);
        self.settle(key, "passed");
    }

    fn errored(&self, key: &EntityKey, message: &str) {
        self.log.errored(key, message);
        self.settle(key, "errored");
    }

    fn skipped(&self, key: &EntityKey) {
        self.log.skipped(key);
        self.settle(key, "skipped");
    }

    fn output(&self, key: &EntityKey, text: &str) {
        RunReporter::output(&*self.log, key, text);
        self.progress.suspend(|| {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
                tracing::debug!("failed to write test output: {}", e);
            }
        });
    }

    fn end(&self) {
        self.progress.finish_and_clear();
        self.log.end();
    }
}
