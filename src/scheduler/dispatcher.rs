use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{PoolError, Result};
use crate::scheduler::job::Job;
use crate::scheduler::queue::JobReceiver;
use crate::scheduler::registry::{registry, IdleWorkers};
use crate::stats::{self, InFlightGauge};
use crate::worker::Worker;

/// Matches queued jobs to idle workers.
///
/// Owns the receiving half of the job queue and a pool of `max_workers`
/// workers. At most `max_workers` jobs execute at any moment: a job only
/// reaches a worker by claiming that worker's slot from the registry, and a
/// worker only puts its slot back once its previous job has finished.
///
/// At most `max_workers` jobs wait for a worker outside the queue. Beyond
/// that, jobs stay in the queue, and once the queue is full submitters wait.
#[derive(Debug)]
pub struct Dispatcher {
    max_workers: usize,
    workers: Vec<Worker>,
    idle: IdleWorkers,
    stop: CancellationToken,
    dispatch_loop: JoinHandle<()>,
}

impl Dispatcher {
    /// Start `max_workers` workers and the dispatch loop, counting executions
    /// on the process-wide gauge.
    pub fn start(jobs: JobReceiver, max_workers: usize) -> Result<Self> {
        Self::start_with_gauge(jobs, max_workers, stats::global())
    }

    /// Like [`start`](Self::start) with a caller-provided gauge.
    pub fn start_with_gauge(
        jobs: JobReceiver,
        max_workers: usize,
        gauge: Arc<InFlightGauge>,
    ) -> Result<Self> {
        if max_workers == 0 {
            return Err(PoolError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }

        let (registration, idle) = registry(max_workers);
        let stop = CancellationToken::new();

        let workers = (1..=max_workers)
            .map(|id| {
                Worker::start(id, registration.clone(), gauge.clone(), stop.child_token())
            })
            .collect();
        // Only workers hold the registration, so the registry closes once the
        // last worker exits.
        drop(registration);

        let handoffs = Arc::new(Semaphore::new(max_workers));
        let dispatch_loop = tokio::spawn(Self::dispatch(
            jobs,
            idle.clone(),
            handoffs,
            stop.clone(),
        ));

        tracing::info!(max_workers, "Dispatcher started");

        Ok(Self {
            max_workers,
            workers,
            idle,
            stop,
            dispatch_loop,
        })
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of workers currently waiting for a job.
    pub fn idle_workers(&self) -> usize {
        self.idle.len()
    }

    /// Workers in id order (ids start at 1).
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Stop the dispatch loop and every worker, then wait for them to exit.
    /// Jobs already executing finish first; jobs still waiting for a worker
    /// are dropped and their submitters see [`PoolError::ResultDropped`].
    pub async fn shutdown(self) {
        tracing::info!("Dispatcher shutting down");
        self.stop.cancel();

        if let Err(e) = self.dispatch_loop.await {
            tracing::error!(error = %e, "Dispatch loop failed");
        }
        for worker in self.workers {
            worker.join().await;
        }
    }

    /// Drain the job queue, spawning one handoff per job.
    ///
    /// Handoffs run concurrently and race for idle workers. Which waiting job
    /// gets the next freed worker is up to the runtime's scheduling, not
    /// submission order.
    async fn dispatch(
        mut jobs: JobReceiver,
        idle: IdleWorkers,
        handoffs: Arc<Semaphore>,
        stop: CancellationToken,
    ) {
        loop {
            // Leave jobs in the queue while the handoff stage is full.
            let permit = tokio::select! {
                permit = handoffs.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = stop.cancelled() => break,
            };

            tokio::select! {
                job = jobs.recv() => match job {
                    Some(job) => {
                        tokio::spawn(Self::hand_off(idle.clone(), job, permit));
                    }
                    None => {
                        tracing::info!("Job queue closed, dispatch loop exiting");
                        break;
                    }
                },
                _ = stop.cancelled() => break,
            }
        }
    }

    /// Wait for an idle worker and put `job` in its slot.
    async fn hand_off(idle: IdleWorkers, mut job: Job, _permit: OwnedSemaphorePermit) {
        let job_id = job.id;
        tracing::debug!(job_id = %job_id, idle = idle.len(), "Waiting for an idle worker");

        loop {
            let Some(slot) = idle.acquire().await else {
                tracing::warn!(job_id = %job_id, "No workers left, dropping job");
                return;
            };

            match slot.deliver(job) {
                Ok(()) => {
                    tracing::debug!(job_id = %job_id, worker_id = slot.worker_id(), "Job handed to worker");
                    return;
                }
                Err(returned) => {
                    tracing::debug!(
                        job_id = %job_id,
                        worker_id = slot.worker_id(),
                        "Worker has exited, trying another"
                    );
                    job = returned;
                }
            }
        }
    }
}
