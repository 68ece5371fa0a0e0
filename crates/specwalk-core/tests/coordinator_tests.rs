#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fixture;
use specwalk_core::executor::{RunLog, RunReporter, RunState};
use specwalk_core::{cancel_pair, CancelToken, Config, RunCoordinator};

fn coordinator(config: &Config) -> (RunCoordinator, Arc<RunLog>) {
    let log = Arc::new(RunLog::new());
    let reporter: Arc<dyn RunReporter> = log.clone();
    (RunCoordinator::new(config.clone(), reporter).unwrap(), log)
}

#[tokio::test]
async fn test_batch_runs_to_completion() {
    let fx = fixture("echo PASS >&2\n");
    let (coordinator, log) = coordinator(&fx.config);
    let keys = vec![fx.service(), fx.file(), fx.function()];

    let outcome = coordinator
        .run_batch(fx.explorer.registry(), &keys, &CancelToken::none())
        .await;

    assert_eq!(outcome.started, 3);
    assert!(!outcome.cancelled);
    for key in &keys {
        assert_eq!(log.states(key), vec![RunState::Enqueued, RunState::Passed]);
    }
    assert!(log.is_ended());
}

#[tokio::test]
async fn test_cancellation_kills_every_running_process() {
    let fx = fixture("sleep 30\n");
    let (coordinator, log) = coordinator(&fx.config);
    let keys = vec![fx.service(), fx.file(), fx.function()];
    let (source, token) = cancel_pair();

    let (outcome, _) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(
            coordinator.run_batch(fx.explorer.registry(), &keys, &token),
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                source.cancel();
            }
        )
    })
    .await
    .expect("cancelled batch did not return");

    assert!(outcome.cancelled);
    assert_eq!(outcome.started, 3);
    for key in &keys {
        assert_eq!(log.states(key), vec![RunState::Enqueued, RunState::Skipped]);
    }
    let summary = log.summary();
    assert_eq!((summary.passed, summary.errored, summary.skipped), (0, 0, 3));
    assert!(log.is_ended());
}

#[tokio::test]
async fn test_cancelled_before_start_starts_nothing() {
    let fx = fixture("echo PASS >&2\n");
    let (coordinator, log) = coordinator(&fx.config);
    let keys = vec![fx.file(), fx.function()];
    let (source, token) = cancel_pair();
    source.cancel();

    let outcome = coordinator.run_batch(fx.explorer.registry(), &keys, &token).await;

    assert_eq!(outcome.started, 0);
    assert_eq!(outcome.not_started, 2);
    for key in &keys {
        assert_eq!(log.states(key), vec![RunState::Skipped]);
    }
}

#[tokio::test]
async fn test_failures_do_not_abort_the_batch() {
    let fx = fixture("case \"$*\" in *works*) echo PASS >&2 ;; *) echo FAIL >&2 ;; esac\n");
    let (coordinator, log) = coordinator(&fx.config);
    let keys = vec![fx.file(), fx.function()];

    coordinator
        .run_batch(fx.explorer.registry(), &keys, &CancelToken::none())
        .await;

    assert_eq!(log.verdict(&fx.file()), Some(RunState::Errored("failed".to_string())));
    assert_eq!(log.verdict(&fx.function()), Some(RunState::Passed));
}

#[tokio::test]
async fn test_run_states_flow_back_into_registry() {
    let mut fx = fixture("echo PASS >&2\n");
    let (coordinator, log) = coordinator(&fx.config);
    let keys = vec![fx.function()];

    coordinator
        .run_batch(fx.explorer.registry(), &keys, &CancelToken::none())
        .await;

    let function = fx.function();
    assert_eq!(log.apply_to(fx.explorer.registry_mut()), 2);
    let record = fx.explorer.registry().get(&function).unwrap();
    assert_eq!(record.state, Some(RunState::Passed));
}
