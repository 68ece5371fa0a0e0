//! Out-of-process test execution.
//!
//! Every started entity gets one child process. Its primary stream is only
//! forwarded to the reporter; its diagnostic stream is also scanned for the
//! success marker. The run is judged on that latch alone once the process
//! exits, the exit code is not consulted. Readers get a short grace period
//! to drain what the process wrote, output of descendants still holding
//! the pipes is not waited for.
//!
//! A handle moves through `running -> finishing -> finished` on exit or
//! `running -> killed` on [`RunHandle::kill`]. Both transitions start with a
//! compare-and-swap on the same state word, so exactly one of them reports a
//! verdict.

mod command;
mod output;
mod report;

pub use command::{CommandPlan, RunTarget};
pub use output::{normalize_newlines, OutputScanner, SuccessLatch};
pub use report::{RunEvent, RunLog, RunReporter, RunState, RunSummary};

use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Notify;

use crate::config::Config;
use crate::registry::{EntityKey, Registry};

/// Execution errors.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Entity is not registered: {0}")]
    UnknownEntity(String),

    #[error("No owning file for {0}")]
    NoOwningFile(String),

    #[error("Failed to compile the ANSI escape pattern: {0}")]
    AnsiPattern(#[from] regex::Error),
}

const RUNNING: u8 = 0;
const FINISHING: u8 = 1;
const FINISHED: u8 = 2;
const KILLED: u8 = 3;

struct HandleState {
    state: AtomicU8,
    kill_requested: Notify,
}

impl HandleState {
    fn new(state: u8) -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(state),
            kill_requested: Notify::new(),
        })
    }

    fn transition(&self, from: u8, to: u8) -> bool {
        self.state
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Observation and control of one started run.
#[derive(Clone)]
pub struct RunHandle {
    key: EntityKey,
    shared: Arc<HandleState>,
    reporter: Arc<dyn RunReporter>,
}

impl RunHandle {
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// True once the verdict (or the skip) has been reported.
    pub fn is_terminal(&self) -> bool {
        matches!(self.shared.state.load(Ordering::Acquire), FINISHED | KILLED)
    }

    pub fn was_killed(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) == KILLED
    }

    /// Terminate the process and report the entity skipped.
    ///
    /// Returns `false` without doing anything when the run already reached
    /// a verdict of its own.
    pub fn kill(&self) -> bool {
        if !self.shared.transition(RUNNING, KILLED) {
            return false;
        }
        self.reporter.skipped(&self.key);
        self.shared.kill_requested.notify_one();
        tracing::debug!(key = %self.key, "killed test process");
        true
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("key", &self.key)
            .field("state", &self.shared.state.load(Ordering::Relaxed))
            .finish()
    }
}

/// Starts one child process per entity and reports its verdict.
pub struct ProcessRunExecutor {
    config: Config,
    scanner: Arc<OutputScanner>,
    reporter: Arc<dyn RunReporter>,
}

impl ProcessRunExecutor {
    pub fn new(config: Config, reporter: Arc<dyn RunReporter>) -> Result<Self, ExecutorError> {
        let scanner = OutputScanner::new(config.runner.success_marker.clone())?;
        Ok(Self {
            config,
            scanner: Arc::new(scanner),
            reporter,
        })
    }

    pub fn reporter(&self) -> &Arc<dyn RunReporter> {
        &self.reporter
    }

    /// Derive the invocation for a registered entity without running it.
    pub fn plan(&self, registry: &Registry, key: &EntityKey) -> Result<CommandPlan, ExecutorError> {
        let target = RunTarget::resolve(registry, key)?;
        Ok(CommandPlan::for_target(&target, &self.config))
    }

    /// Spawn the process for `key`.
    ///
    /// Must be called within a tokio runtime. Entities that cannot be resolved
    /// or spawned are reported errored straight away and the returned handle
    /// is already terminal.
    #[tracing::instrument(skip_all, fields(key = %key))]
    pub fn start(&self, registry: &Registry, key: &EntityKey) -> RunHandle {
        let plan = match self.plan(registry, key) {
            Ok(plan) => plan,
            Err(e) => return self.failed(key, &e.to_string()),
        };

        let mut command = plan.command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(command = %plan.command_line(), "failed to spawn test process: {}", e);
                return self.failed(key, &format!("{}: {}", plan.program, e));
            }
        };
        tracing::info!(command = %plan.command_line(), cwd = %plan.cwd.display(), "started test process");

        let handle = RunHandle {
            key: key.clone(),
            shared: HandleState::new(RUNNING),
            reporter: Arc::clone(&self.reporter),
        };
        let watch = Watch {
            handle: handle.clone(),
            scanner: Arc::clone(&self.scanner),
            failure_message: self.config.runner.failure_message.clone(),
        };
        tokio::spawn(watch.run(child));
        handle
    }

    fn failed(&self, key: &EntityKey, message: &str) -> RunHandle {
        self.reporter.errored(key, message);
        RunHandle {
            key: key.clone(),
            shared: HandleState::new(FINISHED),
            reporter: Arc::clone(&self.reporter),
        }
    }
}

/// How long output readers may keep draining after the process exited.
///
/// Descendants that inherited the pipes can hold them open indefinitely.
const OUTPUT_DRAIN: Duration = Duration::from_millis(500);

/// Background task following one child process.
struct Watch {
    handle: RunHandle,
    scanner: Arc<OutputScanner>,
    failure_message: String,
}

impl Watch {
    async fn run(self, mut child: tokio::process::Child) {
        let key = &self.handle.key;
        let reporter = &self.handle.reporter;
        let latch = Arc::new(SuccessLatch::default());

        let mut stdout = tokio::spawn(forward(
            child.stdout.take(),
            key.clone(),
            Arc::clone(reporter),
            None,
        ));
        let mut stderr = tokio::spawn(forward(
            child.stderr.take(),
            key.clone(),
            Arc::clone(reporter),
            Some((Arc::clone(&self.scanner), Arc::clone(&latch))),
        ));

        let exited = tokio::select! {
            status = child.wait() => Some(status),
            _ = self.handle.shared.kill_requested.notified() => None,
        };

        let Some(status) = exited else {
            if let Err(e) = child.kill().await {
                tracing::debug!(key = %key, "test process already gone: {}", e);
            }
            stdout.abort();
            stderr.abort();
            return;
        };

        let drain = async {
            let _ = tokio::join!(&mut stdout, &mut stderr);
        };
        let drained = tokio::time::timeout(OUTPUT_DRAIN, drain).await.is_ok();
        if !drained {
            tracing::debug!(key = %key, "output still open after exit, dropping readers");
            stdout.abort();
            stderr.abort();
        }

        self.finish(status, latch.is_ok());
    }

    fn finish(&self, status: std::io::Result<ExitStatus>, ok: bool) {
        let shared = &self.handle.shared;
        if !shared.transition(RUNNING, FINISHING) {
            // killed while exiting, the skip is already reported
            return;
        }

        let key = &self.handle.key;
        match &status {
            Ok(status) => tracing::debug!(key = %key, %status, ok, "test process exited"),
            Err(e) => tracing::warn!(key = %key, "failed to wait for test process: {}", e),
        }
        if ok {
            self.handle.reporter.passed(key);
        } else {
            self.handle.reporter.errored(key, &self.failure_message);
        }
        shared.state.store(FINISHED, Ordering::Release);
    }
}

/// Forward a stream line by line, feeding the latch when one is given.
async fn forward<R>(
    stream: Option<R>,
    key: EntityKey,
    reporter: Arc<dyn RunReporter>,
    scanner: Option<(Arc<OutputScanner>, Arc<SuccessLatch>)>,
) where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return;
    };

    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if let Some((scanner, latch)) = &scanner {
                    latch.observe(scanner, &line);
                }
                reporter.output(&key, &normalize_newlines(&line));
            }
            Err(e) => {
                tracing::debug!(key = %key, "stopped reading test output: {}", e);
                break;
            }
        }
    }
}
