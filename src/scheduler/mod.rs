pub mod dispatcher;
pub mod job;
pub mod queue;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use job::{result_channel, Job, JobResult, Payload, ResultReceiver, ResultSender, Task};
pub use queue::{JobQueue, JobReceiver};

use crate::config::PoolConfig;
use crate::error::Result;

/// Build the job queue and start a dispatcher draining it.
pub fn start_pool(config: &PoolConfig) -> Result<(JobQueue, Dispatcher)> {
    config.validate()?;
    let (queue, jobs) = JobQueue::bounded(config.max_queue_size)?;
    let dispatcher = Dispatcher::start(jobs, config.max_workers)?;
    Ok((queue, dispatcher))
}
