use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use poller_wrapper::config::RunConfig;
use poller_wrapper::dispatch::{Job, JobOutcome, Operation, NO_EXIT_CODE};
use poller_wrapper::worker::{CommandRunner, Invocation, RunOutcome, SystemRunner, WorkerExecutor};

/// Runner that records invocations and replays a scripted outcome.
struct ScriptedRunner {
    outcome: RunOutcome,
    seen: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    fn new(outcome: RunOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn invocations(&self) -> Vec<Invocation> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation, _limit: Duration) -> RunOutcome {
        self.seen.lock().unwrap().push(invocation.clone());
        self.outcome.clone()
    }
}

fn executor_with(runner: Arc<ScriptedRunner>) -> WorkerExecutor {
    WorkerExecutor::new(Arc::new(RunConfig::default())).with_runner(runner)
}

fn job(host_id: i64, operation: Operation) -> Job {
    Job::new(host_id, operation, Duration::from_secs(1))
}

#[tokio::test]
async fn discover_runs_the_discovery_binary() {
    let runner = ScriptedRunner::new(RunOutcome::Exited(0));
    let executor = executor_with(runner.clone());

    let result = executor.execute(&job(42, Operation::Discover)).await;

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.outcome, JobOutcome::Succeeded);

    let seen = runner.invocations();
    assert_eq!(seen.len(), 1);
    let args = &seen[0].args;
    assert!(args.iter().any(|a| a == "/opt/observium/discovery.php"));
    assert!(!args.iter().any(|a| a == "/opt/observium/poller.php"));
    assert_eq!(&args[args.len() - 2..], &["-h".to_string(), "42".to_string()]);
}

#[tokio::test]
async fn poll_runs_the_poller_binary() {
    let runner = ScriptedRunner::new(RunOutcome::Exited(0));
    let executor = executor_with(runner.clone());

    executor.execute(&job(7, Operation::Poll)).await;

    let seen = runner.invocations();
    assert!(seen[0].args.iter().any(|a| a == "/opt/observium/poller.php"));
}

#[tokio::test]
async fn command_runs_under_the_service_identity() {
    let runner = ScriptedRunner::new(RunOutcome::Exited(0));
    let executor = executor_with(runner.clone());

    executor.execute(&job(7, Operation::Poll)).await;

    let seen = runner.invocations();
    assert_eq!(seen[0].binary, Path::new("sudo"));
    assert_eq!(&seen[0].args[..4], &["-u", "observium", "-n", "--"]);
}

#[tokio::test]
async fn nonzero_exit_code_is_returned_not_raised() {
    let runner = ScriptedRunner::new(RunOutcome::Exited(3));
    let executor = executor_with(runner);

    let result = executor.execute(&job(7, Operation::Discover)).await;

    assert_eq!(result.exit_code, 3);
    assert_eq!(result.outcome, JobOutcome::Failed);
}

#[tokio::test]
async fn timeout_is_distinct_from_failure() {
    let runner = ScriptedRunner::new(RunOutcome::TimedOut);
    let executor = executor_with(runner);

    let result = executor.execute(&job(7, Operation::Poll)).await;

    assert_eq!(result.outcome, JobOutcome::TimedOut);
    assert_eq!(result.exit_code, NO_EXIT_CODE);
}

#[tokio::test]
async fn signal_kill_never_reports_success() {
    let runner = ScriptedRunner::new(RunOutcome::Signaled);
    let executor = executor_with(runner);

    let result = executor.execute(&job(7, Operation::Poll)).await;

    assert_eq!(result.outcome, JobOutcome::Failed);
    assert_eq!(result.exit_code, NO_EXIT_CODE);
}

#[tokio::test]
async fn launch_failure_never_reports_success() {
    let runner = ScriptedRunner::new(RunOutcome::LaunchFailed("no such file".to_string()));
    let executor = executor_with(runner);

    let result = executor.execute(&job(7, Operation::Poll)).await;

    assert_eq!(result.outcome, JobOutcome::Failed);
    assert_eq!(result.exit_code, NO_EXIT_CODE);
}

// The SystemRunner tests below spawn real processes; they bypass the sudo
// wrapping by constructing invocations directly.

#[tokio::test]
async fn system_runner_reports_the_exit_code() {
    let invocation = Invocation::new("/bin/sh", vec!["-c".to_string(), "exit 3".to_string()]);
    let outcome = SystemRunner.run(&invocation, Duration::from_secs(5)).await;
    assert_eq!(outcome, RunOutcome::Exited(3));
}

#[tokio::test]
async fn system_runner_kills_on_timeout() {
    let invocation = Invocation::new("/bin/sleep", vec!["5".to_string()]);

    let started = Instant::now();
    let outcome = SystemRunner
        .run(&invocation, Duration::from_millis(100))
        .await;

    assert_eq!(outcome, RunOutcome::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn system_runner_surfaces_launch_failure() {
    let invocation = Invocation::new("/nonexistent/binary", Vec::new());
    let outcome = SystemRunner.run(&invocation, Duration::from_secs(1)).await;
    assert!(matches!(outcome, RunOutcome::LaunchFailed(_)));
}
