use std::time::Duration;

use thiserror::Error;

/// Failure reported by a task's `run`. Relayed to the submitter untouched.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("Task was aborted before completing")]
    Aborted,
}

/// Plumbing failures between a submitter and the pool. Task failures never
/// show up here; they travel inside the `JobResult`.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Job queue is closed, the dispatcher is not running")]
    QueueClosed,

    #[error("Job was dropped before a result was delivered")]
    ResultDropped,

    #[error("Timed out after {0:?} waiting for the job result")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PoolError>;
