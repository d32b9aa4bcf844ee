use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::error::PollerError;

/// Monitoring operation applied to every host in a run. Chosen once at
/// startup and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Poll,
    Discover,
}

impl Operation {
    /// External binary that implements this operation.
    pub fn binary<'a>(&self, config: &'a RunConfig) -> &'a Path {
        match self {
            Operation::Poll => &config.poller_binary,
            Operation::Discover => &config.discovery_binary,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Poll => write!(f, "poll"),
            Operation::Discover => write!(f, "discover"),
        }
    }
}

impl FromStr for Operation {
    type Err = PollerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poll" => Ok(Operation::Poll),
            "discover" => Ok(Operation::Discover),
            other => Err(PollerError::UnknownOperation(other.to_string())),
        }
    }
}

/// Terminal state of a job. Exactly one of these is reached per job,
/// whether or not anyone is still waiting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Succeeded => write!(f, "succeeded"),
            JobOutcome::Failed => write!(f, "failed"),
            JobOutcome::TimedOut => write!(f, "timed-out"),
        }
    }
}

/// One host+operation unit of work. Jobs are created at dispatch time and
/// are fully independent of their siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub host_id: i64,
    pub operation: Operation,
    pub submitted_at: DateTime<Utc>,
    pub time_limit: Duration,
}

impl Job {
    pub fn new(host_id: i64, operation: Operation, time_limit: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            host_id,
            operation,
            submitted_at: Utc::now(),
            time_limit,
        }
    }
}

/// Exit code reported when the external process never produced one
/// (spawn failure, signal kill, forced timeout termination).
pub const NO_EXIT_CODE: i32 = -1;

/// Terminal result for one job, written exactly once by the worker that
/// executed it and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub exit_code: i32,
    pub outcome: JobOutcome,
}

impl JobResult {
    pub fn from_exit_code(job_id: Uuid, exit_code: i32) -> Self {
        let outcome = if exit_code == 0 {
            JobOutcome::Succeeded
        } else {
            JobOutcome::Failed
        };
        Self {
            job_id,
            exit_code,
            outcome,
        }
    }

    pub fn timed_out(job_id: Uuid) -> Self {
        Self {
            job_id,
            exit_code: NO_EXIT_CODE,
            outcome: JobOutcome::TimedOut,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == JobOutcome::Succeeded
    }
}

/// Handle to one submitted batch of jobs.
#[derive(Debug, Clone)]
pub struct GroupHandle {
    job_ids: Vec<Uuid>,
    submitted_at: DateTime<Utc>,
}

impl GroupHandle {
    pub fn new(job_ids: Vec<Uuid>) -> Self {
        Self {
            job_ids,
            submitted_at: Utc::now(),
        }
    }

    /// Job ids in submission order.
    pub fn job_ids(&self) -> &[Uuid] {
        &self.job_ids
    }

    pub fn len(&self) -> usize {
        self.job_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.job_ids.is_empty()
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_from_str() {
        assert_eq!("poll".parse::<Operation>().unwrap(), Operation::Poll);
        assert_eq!(
            "discover".parse::<Operation>().unwrap(),
            Operation::Discover
        );
        assert!("snmpwalk".parse::<Operation>().is_err());
        assert!("Poll".parse::<Operation>().is_err());
        assert!("".parse::<Operation>().is_err());
    }

    #[test]
    fn operation_binary_mapping() {
        let cfg = RunConfig::default();
        assert_eq!(
            Operation::Poll.binary(&cfg),
            Path::new("/opt/observium/poller.php")
        );
        assert_eq!(
            Operation::Discover.binary(&cfg),
            Path::new("/opt/observium/discovery.php")
        );
    }

    #[test]
    fn result_outcome_follows_exit_code() {
        let id = Uuid::new_v4();
        assert_eq!(
            JobResult::from_exit_code(id, 0).outcome,
            JobOutcome::Succeeded
        );
        assert_eq!(JobResult::from_exit_code(id, 3).outcome, JobOutcome::Failed);
        assert_eq!(
            JobResult::from_exit_code(id, NO_EXIT_CODE).outcome,
            JobOutcome::Failed
        );
    }

    #[test]
    fn timed_out_result_is_not_a_plain_failure() {
        let result = JobResult::timed_out(Uuid::new_v4());
        assert_eq!(result.outcome, JobOutcome::TimedOut);
        assert_eq!(result.exit_code, NO_EXIT_CODE);
        assert!(!result.is_success());
    }

    #[test]
    fn group_handle_preserves_submission_order() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let handle = GroupHandle::new(ids.clone());
        assert_eq!(handle.job_ids(), ids.as_slice());
        assert_eq!(handle.len(), 4);
        assert!(!handle.is_empty());
    }
}
