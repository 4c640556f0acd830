//! Execution facade integration tests.
//!
//! A small `sh` script stands in for the wrapped program: its first
//! argument is the command verb, and it answers the way the real client
//! would for the scenarios below.

#![cfg(unix)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use accurev_exec::execution::{ProcessInvoker, SchedulerConfig, BENIGN_DIAGNOSTIC};
use accurev_exec::{ExecError, Executor, Policy, Scheduler};
use futures_util::StreamExt;

fn fake_client_script() -> String {
    format!(
        r#"
case "$1" in
  hist) printf '<AcResponse/>' ;;
  diff|merge) printf '<AcResponse><Element/></AcResponse>'; exit 1 ;;
  show) echo "{BENIGN_DIAGNOSTIC}." >&2; exit 1 ;;
  info) echo "{BENIGN_DIAGNOSTIC}." >&2; printf 'Principal: alice' ;;
  stat) exit 2 ;;
  args) shift; for a in "$@"; do printf '[%s]' "$a"; done ;;
  slow) sleep 0.1; printf done ;;
  *) echo "unknown command: $1" >&2; exit 3 ;;
esac
"#
    )
}

fn executor_with(capacity: usize) -> Executor {
    let invoker = ProcessInvoker::new("sh").base_args([
        "-c".to_string(),
        fake_client_script(),
        "accurev".to_string(),
    ]);
    let scheduler = Arc::new(Scheduler::new(SchedulerConfig::new(capacity)));
    Executor::new(invoker, scheduler)
}

// ============================================================================
// Async path
// ============================================================================

#[tokio::test]
async fn test_history_returns_output() {
    let executor = executor_with(8);

    let result = executor.run_async("hist -fx -p Proj -t 1", None).await.unwrap();

    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.output(), "<AcResponse/>");
    assert!(result.is_initialized());
}

#[tokio::test]
async fn test_diff_exit_one_accepted() {
    let executor = executor_with(8);

    let result = executor.run_async("diff -b 10 -v 20", None).await.unwrap();

    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.output(), "<AcResponse><Element/></AcResponse>");
}

#[tokio::test]
async fn test_show_exit_one_rejected() {
    let executor = executor_with(8);

    let err = executor.run_async("show users", None).await.unwrap_err();

    assert!(err.is_rejection());
    assert_eq!(err.exit_code(), Some(1));
    assert!(err.to_string().contains("show users"));
}

#[tokio::test]
async fn test_exit_two_rejected_unless_policy_allows() {
    let executor = executor_with(8);

    let err = executor.run_async("stat -fx", None).await.unwrap_err();
    assert_eq!(err.exit_code(), Some(2));

    let lenient = Policy::accept_codes([0, 2]);
    let result = executor.run_async("stat -fx", Some(&lenient)).await.unwrap();
    assert_eq!(result.exit_code(), 2);
}

#[tokio::test]
async fn test_benign_stderr_kept_but_accepted() {
    let executor = executor_with(8);

    let result = executor.run_async("info", None).await.unwrap();

    assert_eq!(result.output(), "Principal: alice");
    assert!(result.stderr().contains(BENIGN_DIAGNOSTIC));
}

#[tokio::test]
async fn test_quoted_names_arrive_as_one_argument() {
    let executor = executor_with(8);

    let result = executor
        .run_async(r#"args -s "My Stream" -p Proj"#, None)
        .await
        .unwrap();

    assert_eq!(result.output(), "[-s][My Stream][-p][Proj]");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_burst_respects_capacity() {
    let executor = executor_with(8);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let executor = executor.clone();
        handles.push(tokio::spawn(async move {
            executor.run_async("slow", None).await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.output(), "done");
    }

    let stats = executor.scheduler().stats();
    assert!(stats.peak_active <= 8, "peak was {}", stats.peak_active);
    assert!(stats.peak_active >= 1);
    assert_eq!(stats.active, 0);
    assert_eq!(stats.waiting, 0);
}

#[tokio::test]
async fn test_run_many_reports_every_command() {
    let executor = executor_with(2);
    let commands = vec![
        "hist -fx -p Proj -t 1".to_string(),
        "diff -b 10 -v 20".to_string(),
        "show users".to_string(),
        "slow".to_string(),
    ];

    let completed = AtomicUsize::new(0);
    let mut rejected = Vec::new();
    let mut results = executor.run_many(commands, None);
    while let Some((command, result)) = results.next().await {
        completed.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = result {
            assert!(e.is_rejection());
            rejected.push(command);
        }
    }

    assert_eq!(completed.load(Ordering::SeqCst), 4);
    assert_eq!(rejected, vec!["show users".to_string()]);
    assert!(executor.scheduler().stats().peak_active <= 2);
}

#[tokio::test]
async fn test_abandoned_command_frees_slot() {
    let executor = executor_with(1);

    let abandoned = tokio::time::timeout(
        std::time::Duration::from_millis(10),
        executor.run_async("slow", None),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(executor.scheduler().stats().active, 0);

    let result = executor.run_async("hist", None).await.unwrap();
    assert_eq!(result.output(), "<AcResponse/>");
}

#[tokio::test]
async fn test_missing_program_is_spawn_failure() {
    let invoker = ProcessInvoker::new("accurev-exec-no-such-program");
    let executor = Executor::new(invoker, Arc::new(Scheduler::default()));

    let err = executor.run_async("hist -fx -p Proj -t 1", None).await.unwrap_err();

    assert!(err.is_spawn_failure());
    assert!(!err.is_rejection());
    match err {
        ExecError::Spawn { command, source, .. } => {
            assert_eq!(command, "hist -fx -p Proj -t 1");
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================================
// Blocking path
// ============================================================================

#[test]
fn test_sync_history_returns_output() {
    let executor = executor_with(8);

    let result = executor.run("hist -fx -p Proj -t 1", None).unwrap();

    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.output(), "<AcResponse/>");
}

#[test]
fn test_sync_bypasses_scheduler() {
    let executor = executor_with(1);
    executor.scheduler().close();

    let result = executor.run("merge -o file.c", None).unwrap();

    assert_eq!(result.exit_code(), 1);
    assert_eq!(executor.scheduler().stats().peak_active, 0);
}

#[test]
fn test_sync_rejection_and_unknown_command() {
    let executor = executor_with(8);

    let err = executor.run("show users", None).unwrap_err();
    assert_eq!(err.exit_code(), Some(1));

    let err = executor.run("frobnicate", None).unwrap_err();
    assert_eq!(err.exit_code(), Some(3));
}

#[test]
fn test_sync_missing_program_is_spawn_failure() {
    let executor = Executor::new(
        ProcessInvoker::new("accurev-exec-no-such-program"),
        Arc::new(Scheduler::default()),
    );

    let err = executor.run("info", None).unwrap_err();

    assert!(err.is_spawn_failure());
}

#[test]
fn test_async_path_under_block_on() {
    let executor = executor_with(8);

    let result = tokio_test::block_on(async { executor.run_async("hist", None).await }).unwrap();

    assert_eq!(result.output(), "<AcResponse/>");
}
