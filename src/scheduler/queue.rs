use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{PoolError, Result};
use crate::scheduler::job::{result_channel, Job, JobResult, Task};

/// Receiving half of the job queue, drained by the dispatcher.
pub type JobReceiver = mpsc::Receiver<Job>;

/// Submission side of the bounded job queue.
///
/// Cloned freely; every clone feeds the same queue. A full queue makes
/// submitters wait, it never rejects them.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` jobs.
    pub fn bounded(capacity: usize) -> Result<(Self, JobReceiver)> {
        if capacity == 0 {
            return Err(PoolError::InvalidConfig(
                "job queue capacity must be at least 1".to_string(),
            ));
        }
        let (tx, rx) = mpsc::channel(capacity);
        Ok((Self { tx }, rx))
    }

    /// Push a prebuilt job, waiting while the queue is full.
    pub async fn enqueue(&self, job: Job) -> Result<()> {
        self.tx.send(job).await.map_err(|_| PoolError::QueueClosed)
    }

    /// Run `task` with `params` on the pool and wait for its result.
    ///
    /// The outer `Result` only reports plumbing failures. Whatever the task
    /// returned, success or error, is the inner `JobResult`.
    pub async fn submit(
        &self,
        task: Arc<dyn Task>,
        params: HashMap<String, String>,
    ) -> Result<JobResult> {
        let (result_tx, result_rx) = result_channel();
        let job = Job::new(task, params, result_tx);
        let job_id = job.id;

        self.enqueue(job).await?;
        tracing::debug!(job_id = %job_id, "Job queued");

        result_rx.await.map_err(|_| PoolError::ResultDropped)
    }

    /// Like [`submit`](Self::submit), but gives up after `timeout`.
    ///
    /// The deadline covers waiting for queue space as well as waiting for the
    /// result. A job that was already queued still runs; its result is
    /// discarded.
    pub async fn submit_timeout(
        &self,
        task: Arc<dyn Task>,
        params: HashMap<String, String>,
        timeout: Duration,
    ) -> Result<JobResult> {
        tokio::time::timeout(timeout, self.submit(task, params))
            .await
            .map_err(|_| PoolError::Timeout(timeout))?
    }

    /// Maximum number of queued jobs.
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Jobs currently waiting in the queue.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.tx.capacity() == 0
    }

    /// True once the dispatcher has stopped draining the queue.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
