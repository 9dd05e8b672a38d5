use std::any::Any;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::scheduler::job::{Job, JobResult};
use crate::scheduler::registry::{Registration, WorkerSlot};
use crate::stats::{self, InFlightGauge};

/// A long-lived executor that runs one job at a time.
///
/// While idle the worker sits in the registry; once a job lands in its slot
/// it is invisible to the dispatcher until the job's result has been sent.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Spawn the worker loop. Must be called from within a tokio runtime.
    pub fn start(
        id: usize,
        registration: Registration,
        gauge: Arc<InFlightGauge>,
        stop: CancellationToken,
    ) -> Self {
        let handle = tokio::spawn(Self::run(id, registration, gauge, stop.clone()));
        Self { id, stop, handle }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Ask the worker to exit. A job already executing runs to completion
    /// first; after that the worker never registers again.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker loop to exit.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(worker_id = self.id, error = %e, "Worker loop failed");
        }
    }

    async fn run(
        id: usize,
        registration: Registration,
        gauge: Arc<InFlightGauge>,
        stop: CancellationToken,
    ) {
        let (slot_tx, mut slot_rx) = mpsc::channel::<Job>(1);
        let slot = WorkerSlot::new(id, slot_tx);

        tracing::debug!(worker_id = id, "Worker started");

        loop {
            // Advertise availability.
            tokio::select! {
                offered = registration.offer(slot.clone()) => {
                    if offered.is_err() {
                        tracing::debug!(worker_id = id, "Registry closed");
                        break;
                    }
                }
                _ = stop.cancelled() => break,
            }

            let job = tokio::select! {
                biased;
                job = slot_rx.recv() => job,
                _ = stop.cancelled() => {
                    // A handoff may have filled the slot just before the stop.
                    slot_rx.close();
                    if let Ok(job) = slot_rx.try_recv() {
                        Self::execute(id, job, &gauge).await;
                    }
                    break;
                }
            };

            match job {
                Some(job) => Self::execute(id, job, &gauge).await,
                None => break,
            }
        }

        tracing::info!(worker_id = id, "Worker stopping");
    }

    async fn execute(id: usize, job: Job, gauge: &InFlightGauge) {
        let (job_id, task, payload, result_tx) = job.into_parts();

        tracing::info!(worker_id = id, job_id = %job_id, params = ?payload.params(), "Job started");
        gauge.increment();
        stats::log_stats(gauge);

        // The task runs in its own tokio task so a panic cannot take the
        // worker down with it.
        let result: JobResult = match tokio::spawn(async move { task.run(payload).await }).await
        {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(TaskError::Panicked(panic_message(e.into_panic()))),
            Err(_) => Err(TaskError::Aborted),
        };
        let succeeded = result.is_ok();

        if result_tx.send(result).is_err() {
            tracing::debug!(worker_id = id, job_id = %job_id, "Submitter gone, result discarded");
        }

        gauge.decrement();
        stats::log_stats(gauge);
        tracing::info!(worker_id = id, job_id = %job_id, succeeded, "Job completed");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::job::{result_channel, Payload, Task};
    use crate::scheduler::registry::registry;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    struct Double;

    #[async_trait]
    impl Task for Double {
        async fn run(&self, payload: Payload) -> JobResult {
            let n: i64 = payload.get("n").parse().unwrap_or(0);
            Ok(json!(n * 2))
        }
    }

    fn make_job(n: i64) -> (Job, crate::scheduler::job::ResultReceiver) {
        let (tx, rx) = result_channel();
        let params = HashMap::from([("n".to_string(), n.to_string())]);
        (Job::new(Arc::new(Double), params, tx), rx)
    }

    #[test]
    fn panic_message_variants() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(42u8)), "unknown panic");
    }

    #[tokio::test]
    async fn worker_registers_runs_and_reregisters() {
        let (registration, idle) = registry(1);
        let gauge = Arc::new(InFlightGauge::new());
        let worker = Worker::start(1, registration, gauge.clone(), CancellationToken::new());

        for n in 1..=3 {
            let slot = idle.acquire().await.unwrap();
            assert_eq!(slot.worker_id(), 1);
            let (job, rx) = make_job(n);
            slot.deliver(job).unwrap();
            assert_eq!(rx.await.unwrap().unwrap(), json!(n * 2));
        }

        worker.stop();
        worker.join().await;
        assert_eq!(gauge.current(), 0);
    }

    #[tokio::test]
    async fn stopped_worker_exits_and_rejects_jobs() {
        let (registration, idle) = registry(1);
        let worker = Worker::start(
            4,
            registration,
            Arc::new(InFlightGauge::new()),
            CancellationToken::new(),
        );

        let slot = idle.acquire().await.unwrap();
        worker.stop();
        worker.join().await;

        let (job, _rx) = make_job(1);
        assert!(slot.deliver(job).is_err());
        assert!(idle.acquire().await.is_none());
    }
}
