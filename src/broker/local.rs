use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{RwLock, Semaphore};
use uuid::Uuid;

use crate::broker::{Broker, ResultBackend};
use crate::dispatch::job::{Job, JobResult};
use crate::error::Result;
use crate::worker::WorkerExecutor;

/// In-process worker pool: one detached task per job, results kept in
/// memory until TTL expiry.
///
/// Jobs share nothing. A slow, failed, or killed job cannot touch its
/// siblings, and a waiter that gives up does not stop anything — results
/// written after every reader has gone away simply age out of the store.
#[derive(Clone)]
pub struct LocalWorkerPool {
    executor: WorkerExecutor,
    store: Arc<ResultStore>,
    slots: Option<Arc<Semaphore>>,
}

impl LocalWorkerPool {
    pub fn new(executor: WorkerExecutor, result_ttl: Duration) -> Self {
        Self {
            executor,
            store: Arc::new(ResultStore::new(result_ttl)),
            slots: None,
        }
    }

    /// Cap the number of concurrently executing jobs.
    pub fn with_concurrency(mut self, max_jobs: usize) -> Self {
        self.slots = Some(Arc::new(Semaphore::new(max_jobs)));
        self
    }
}

#[async_trait]
impl Broker for LocalWorkerPool {
    async fn submit_group(&self, jobs: Vec<Job>) -> Result<()> {
        for job in jobs {
            let executor = self.executor.clone();
            let store = self.store.clone();
            let slots = self.slots.clone();
            tokio::spawn(async move {
                let _slot = match slots {
                    Some(sem) => match sem.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        // Semaphore closed: the pool is gone, nothing to run for.
                        Err(_) => return,
                    },
                    None => None,
                };
                let result = executor.execute(&job).await;
                store.insert(result).await;
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ResultBackend for LocalWorkerPool {
    async fn fetch(&self, job_id: Uuid) -> Result<Option<JobResult>> {
        Ok(self.store.get(job_id).await)
    }
}

struct ResultStore {
    ttl: Duration,
    entries: RwLock<HashMap<Uuid, Entry>>,
}

struct Entry {
    result: JobResult,
    stored_at: Instant,
}

impl ResultStore {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// First write wins; a job's result is written exactly once.
    async fn insert(&self, result: JobResult) {
        let job_id = result.job_id;
        let mut entries = self.entries.write().await;
        entries.entry(job_id).or_insert(Entry {
            result,
            stored_at: Instant::now(),
        });
    }

    /// Read one result, dropping it if the TTL has lapsed.
    async fn get(&self, job_id: Uuid) -> Option<JobResult> {
        let mut entries = self.entries.write().await;
        match entries.get(&job_id) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.result.clone()),
            Some(_) => {
                entries.remove(&job_id);
                None
            }
            None => None,
        }
    }
}
