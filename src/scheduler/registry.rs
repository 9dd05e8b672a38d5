//! Registry of idle workers.
//!
//! A worker that becomes idle pushes a [`WorkerSlot`] (a handle to its private
//! mailbox) into the registry. A handoff pops one slot and drops a job into it.
//! Popping is the only way to reach a worker, so two handoffs can never claim
//! the same idle worker, and a busy worker is never in the registry.

use async_channel::{Receiver, Sender};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::scheduler::job::Job;

/// Handle to one worker's private job slot.
#[derive(Debug, Clone)]
pub struct WorkerSlot {
    worker_id: usize,
    tx: mpsc::Sender<Job>,
}

impl WorkerSlot {
    pub fn new(worker_id: usize, tx: mpsc::Sender<Job>) -> Self {
        Self { worker_id, tx }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Place a job in the worker's slot without waiting.
    ///
    /// Hands the job back if the worker has terminated, so the caller can try
    /// another slot.
    pub fn deliver(&self, job: Job) -> std::result::Result<(), Job> {
        self.tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) | TrySendError::Closed(job) => job,
        })
    }
}

/// Worker side of the registry: advertise availability.
#[derive(Debug, Clone)]
pub struct Registration {
    tx: Sender<WorkerSlot>,
}

impl Registration {
    /// Offer a slot. Returns the slot if nobody can ever claim it.
    pub async fn offer(&self, slot: WorkerSlot) -> std::result::Result<(), WorkerSlot> {
        self.tx.send(slot).await.map_err(|e| e.into_inner())
    }
}

/// Dispatcher side of the registry: claim an idle worker.
#[derive(Debug, Clone)]
pub struct IdleWorkers {
    rx: Receiver<WorkerSlot>,
}

impl IdleWorkers {
    /// Wait for the next idle worker. `None` once every worker has exited and
    /// no slots are left.
    pub async fn acquire(&self) -> Option<WorkerSlot> {
        self.rx.recv().await.ok()
    }

    /// Number of workers currently advertised as idle.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create a registry that holds at most `capacity` idle slots.
pub fn registry(capacity: usize) -> (Registration, IdleWorkers) {
    let (tx, rx) = async_channel::bounded(capacity);
    (Registration { tx }, IdleWorkers { rx })
}
