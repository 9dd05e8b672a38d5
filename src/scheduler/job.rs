use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::TaskError;

/// Outcome of running a task: a JSON value or an error, never both.
pub type JobResult = std::result::Result<serde_json::Value, TaskError>;

/// Sending half of a job's result channel. Written at most once.
pub type ResultSender = oneshot::Sender<JobResult>;
/// Receiving half of a job's result channel. Read at most once.
pub type ResultReceiver = oneshot::Receiver<JobResult>;

/// Create a fresh single-use result channel for one job.
pub fn result_channel() -> (ResultSender, ResultReceiver) {
    oneshot::channel()
}

/// Parameters handed to a task. Never mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    params: HashMap<String, String>,
}

impl Payload {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }
}

/// A unit of computation that can run on any worker.
///
/// Implementations should return in bounded time: there is no way to cancel a
/// task once a worker has started it.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    async fn run(&self, payload: Payload) -> JobResult;
}

/// A task, its payload and the private channel its result goes back on.
pub struct Job {
    pub id: Uuid,
    pub task: Arc<dyn Task>,
    pub payload: Payload,
    result_tx: ResultSender,
}

impl Job {
    pub fn new(
        task: Arc<dyn Task>,
        params: HashMap<String, String>,
        result_tx: ResultSender,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task,
            payload: Payload::new(params),
            result_tx,
        }
    }

    /// Split the job into what the worker runs and where the result goes.
    pub fn into_parts(self) -> (Uuid, Arc<dyn Task>, Payload, ResultSender) {
        (self.id, self.task, self.payload, self.result_tx)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .finish()
    }
}
