use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::RunConfig;
use crate::dispatch::job::{Job, JobResult, NO_EXIT_CODE};
use crate::error::PollerError;
use crate::worker::privilege::PrivilegeContext;

/// One external command, fully resolved: binary plus argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub binary: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(binary: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
        }
    }
}

/// What became of one spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Ran to completion with this exit code.
    Exited(i32),
    /// Terminated by a signal before producing an exit code.
    Signaled,
    /// The wall-clock limit expired and the process was forcibly killed.
    TimedOut,
    /// The process could not be spawned or waited on.
    LaunchFailed(String),
}

/// Narrow seam around OS process spawning so tests can substitute it.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` with stdout and stderr discarded, waiting at most
    /// `limit` of wall-clock time.
    async fn run(&self, invocation: &Invocation, limit: Duration) -> RunOutcome;
}

/// Process spawner used outside tests.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation, limit: Duration) -> RunOutcome {
        let mut command = Command::new(&invocation.binary);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return RunOutcome::LaunchFailed(e.to_string()),
        };

        match tokio::time::timeout(limit, child.wait()).await {
            Ok(Ok(status)) => match status.code() {
                Some(code) => RunOutcome::Exited(code),
                None => RunOutcome::Signaled,
            },
            Ok(Err(e)) => RunOutcome::LaunchFailed(e.to_string()),
            Err(_elapsed) => {
                if let Err(e) = child.start_kill() {
                    tracing::warn!(error = %e, "failed to kill timed-out process");
                }
                let _ = child.wait().await;
                RunOutcome::TimedOut
            }
        }
    }
}

/// Executes one monitoring operation for one host on a worker.
#[derive(Clone)]
pub struct WorkerExecutor {
    config: Arc<RunConfig>,
    privilege: PrivilegeContext,
    runner: Arc<dyn CommandRunner>,
}

impl WorkerExecutor {
    pub fn new(config: Arc<RunConfig>) -> Self {
        let privilege = PrivilegeContext::new(config.service_user.clone());
        Self {
            config,
            privilege,
            runner: Arc::new(SystemRunner),
        }
    }

    /// Substitute the process-spawning seam. Intended for tests.
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Run the operation's binary against the job's host and report the
    /// terminal result.
    ///
    /// The exit code inside the returned [`JobResult`] is the only signal
    /// the caller consumes. Abnormal terminations are logged with the host
    /// id and folded into a failure code; an invocation that never
    /// completed is never reported as success.
    pub async fn execute(&self, job: &Job) -> JobResult {
        let binary = job.operation.binary(&self.config);
        let scope = self.privilege.enter(job.host_id);
        let invocation = scope.wrap(binary, &["-h".to_string(), job.host_id.to_string()]);

        tracing::debug!(
            host_id = job.host_id,
            operation = %job.operation,
            binary = %binary.display(),
            "running external command"
        );
        let outcome = self.runner.run(&invocation, job.time_limit).await;
        drop(scope);

        match outcome {
            RunOutcome::Exited(0) => JobResult::from_exit_code(job.id, 0),
            RunOutcome::Exited(code) => {
                let err = PollerError::JobExecution {
                    host_id: job.host_id,
                    message: format!("exit code {code}"),
                };
                tracing::warn!(host_id = job.host_id, error = %err, "command failed");
                JobResult::from_exit_code(job.id, code)
            }
            RunOutcome::Signaled => {
                let err = PollerError::JobExecution {
                    host_id: job.host_id,
                    message: "terminated by signal".to_string(),
                };
                tracing::warn!(host_id = job.host_id, error = %err, "command failed");
                JobResult::from_exit_code(job.id, NO_EXIT_CODE)
            }
            RunOutcome::TimedOut => {
                let err = PollerError::JobTimeout {
                    host_id: job.host_id,
                    limit_secs: job.time_limit.as_secs(),
                };
                tracing::warn!(host_id = job.host_id, error = %err, "command timed out");
                JobResult::timed_out(job.id)
            }
            RunOutcome::LaunchFailed(message) => {
                let err = PollerError::JobExecution {
                    host_id: job.host_id,
                    message,
                };
                tracing::warn!(host_id = job.host_id, error = %err, "command failed");
                JobResult::from_exit_code(job.id, NO_EXIT_CODE)
            }
        }
    }
}
