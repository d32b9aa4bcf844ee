use std::sync::Arc;
use std::time::Duration;

use crate::broker::Broker;
use crate::dispatch::job::{GroupHandle, Job, Operation};
use crate::error::Result;
use crate::inventory::Host;

/// Builds one independent job per host and hands the batch to the broker.
///
/// The dispatcher imposes no ordering among jobs after submission;
/// execution order and parallelism belong to the worker pool. Jobs are
/// shared-nothing: nothing about one host's job can delay or cancel a
/// sibling.
pub struct JobDispatcher {
    broker: Arc<dyn Broker>,
    time_limit: Duration,
}

impl JobDispatcher {
    pub fn new(broker: Arc<dyn Broker>, time_limit: Duration) -> Self {
        Self { broker, time_limit }
    }

    /// Submit exactly one job per host as a single group.
    ///
    /// Fails with a dispatch error if the broker rejects the group or is
    /// unreachable; that is fatal to the run.
    pub async fn submit(&self, hosts: &[Host], operation: Operation) -> Result<GroupHandle> {
        let jobs: Vec<Job> = hosts
            .iter()
            .map(|host| Job::new(host.device_id, operation, self.time_limit))
            .collect();
        let handle = GroupHandle::new(jobs.iter().map(|job| job.id).collect());

        tracing::debug!(jobs = jobs.len(), operation = %operation, "submitting job group");
        self.broker.submit_group(jobs).await?;

        Ok(handle)
    }
}
