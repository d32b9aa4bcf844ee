use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::broker::ResultBackend;
use crate::dispatch::job::{GroupHandle, JobResult};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Outcome of one bounded wait on a job group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitResult {
    pub completed: usize,
    pub timed_out: bool,
}

/// Final per-run summary: how many jobs went out, how many outcomes came
/// back before the wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub submitted_count: usize,
    pub completed_count: usize,
}

/// Waits on a submitted group without letting slow hosts block the run.
pub struct ResultAggregator {
    backend: Arc<dyn ResultBackend>,
    poll_interval: Duration,
}

impl ResultAggregator {
    pub fn new(backend: Arc<dyn ResultBackend>) -> Self {
        Self {
            backend,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Shorten the poll interval. Intended for tests with tight deadlines.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Wait until every job in `group` has a terminal result, `deadline`
    /// passes, or `cancel` fires.
    ///
    /// `callback` runs once per observed completion, in completion order.
    /// It is observability only: a panicking callback is contained and
    /// cannot change the summary. Deadline expiry abandons the wait, not
    /// the jobs — nothing is cancelled downstream, and results that land
    /// after this returns are simply never observed by this invocation.
    pub async fn collect<F>(
        &self,
        group: &GroupHandle,
        deadline: Duration,
        cancel: &CancellationToken,
        mut callback: F,
    ) -> RunSummary
    where
        F: FnMut(Uuid, &JobResult),
    {
        let submitted = group.len();
        let expires_at = Instant::now() + deadline;
        let mut outstanding: Vec<Uuid> = group.job_ids().to_vec();
        let mut completed = 0usize;

        let wait = loop {
            let mut still_pending = Vec::with_capacity(outstanding.len());
            for job_id in outstanding {
                match self.backend.fetch(job_id).await {
                    Ok(Some(result)) => {
                        completed += 1;
                        if catch_unwind(AssertUnwindSafe(|| callback(job_id, &result))).is_err() {
                            tracing::warn!(job_id = %job_id, "completion callback panicked");
                        }
                    }
                    Ok(None) => still_pending.push(job_id),
                    Err(e) => {
                        tracing::warn!(job_id = %job_id, error = %e, "result backend read failed");
                        still_pending.push(job_id);
                    }
                }
            }
            outstanding = still_pending;

            if outstanding.is_empty() {
                break WaitResult {
                    completed,
                    timed_out: false,
                };
            }
            let now = Instant::now();
            if now >= expires_at {
                break WaitResult {
                    completed,
                    timed_out: true,
                };
            }

            let nap = self.poll_interval.min(expires_at - now);
            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = cancel.cancelled() => {
                    break WaitResult { completed, timed_out: true };
                }
            }
        };

        if wait.timed_out {
            let reason = if cancel.is_cancelled() {
                "wait cancelled"
            } else {
                "deadline reached"
            };
            tracing::warn!(
                outstanding = submitted - wait.completed,
                "{reason}, continuing; unfinished jobs run on unobserved"
            );
        }

        RunSummary {
            submitted_count: submitted,
            completed_count: wait.completed,
        }
    }
}
