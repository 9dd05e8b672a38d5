use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;

use crate::error::TaskError;
use crate::scheduler::job::{JobResult, Payload, Task};

/// Bounds of the random delay used when no `sleep` parameter is given.
const RANDOM_SLEEP_MS: std::ops::Range<i64> = 20..50;

/// Simulates a slow computation.
///
/// Sleeps for the `sleep` parameter in milliseconds (a random delay in
/// `[20, 50)` when absent). Durations that are a multiple of ten fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeavyTask;

impl HeavyTask {
    pub fn new() -> Self {
        Self
    }

    /// Requested delay. A value that is not a plain integer counts as zero.
    /// Negative values are kept: they sleep for nothing but still decide the
    /// outcome.
    fn sleep_ms(payload: &Payload) -> i64 {
        match payload.get("sleep") {
            "" => rand::thread_rng().gen_range(RANDOM_SLEEP_MS),
            raw => raw.parse().unwrap_or(0),
        }
    }
}

#[async_trait]
impl Task for HeavyTask {
    async fn run(&self, payload: Payload) -> JobResult {
        let sleep_ms = Self::sleep_ms(&payload);
        tokio::time::sleep(Duration::from_millis(sleep_ms.max(0) as u64)).await;

        if sleep_ms % 10 == 0 {
            return Err(TaskError::Failed(
                "error occurred while executing heavy task".to_string(),
            ));
        }

        Ok(json!({ "task": "done", "time": sleep_ms.to_string() }))
    }
}
