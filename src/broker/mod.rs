//! Ports to the job transport collaborators.
//!
//! The broker moves jobs to worker processes; the result backend holds
//! per-job outcomes until TTL expiry. Both are collaborator contracts —
//! [`LocalWorkerPool`] is the in-process implementation that makes the
//! binary runnable without external infrastructure.

pub mod local;

use async_trait::async_trait;
use uuid::Uuid;

use crate::dispatch::job::{Job, JobResult};
use crate::error::Result;

pub use local::LocalWorkerPool;

/// Transport that fans submitted jobs out to worker processes.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Hand one group of jobs to the worker pool.
    ///
    /// Fire-and-forget: execution order and parallelism are the pool's
    /// business, and there is no mechanism to cancel a job once handed
    /// over.
    async fn submit_group(&self, jobs: Vec<Job>) -> Result<()>;
}

/// Store holding per-job outcomes until TTL expiry.
#[async_trait]
pub trait ResultBackend: Send + Sync {
    /// Terminal result for `job_id`, if one has been written and has not
    /// expired. Reads are idempotent; a single worker writes each entry
    /// exactly once.
    async fn fetch(&self, job_id: Uuid) -> Result<Option<JobResult>>;
}
