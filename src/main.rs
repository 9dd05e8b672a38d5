use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use workpool_lite::api::{run_api, ApiState};
use workpool_lite::config::{
    PoolConfig, DEFAULT_MAX_QUEUE_SIZE, DEFAULT_MAX_WORKERS, DEFAULT_PORT,
};
use workpool_lite::scheduler::start_pool;
use workpool_lite::shutdown::install_shutdown_handler;
use workpool_lite::stats;
use workpool_lite::tasks::{BigTask, HeavyTask};

#[derive(Parser, Debug)]
#[command(name = "workpool-lite")]
#[command(version)]
#[command(about = "Serve HTTP-submitted jobs on a bounded worker pool")]
struct Args {
    /// The number of workers to start
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: usize,

    /// The size of the job queue
    #[arg(long, default_value_t = DEFAULT_MAX_QUEUE_SIZE)]
    max_queue_size: usize,

    /// The HTTP server port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Milliseconds a request waits for its job result (0 waits forever)
    #[arg(long, default_value = "10000")]
    request_timeout_ms: u64,

    /// Milliseconds between periodic stats reports (0 disables them)
    #[arg(long, default_value = "0")]
    stats_interval_ms: u64,

    /// Endpoint the big task POSTs products to
    #[arg(long, default_value = "https://dummyjson.com/products/add")]
    big_task_url: String,
}

impl Args {
    fn into_config(self) -> PoolConfig {
        PoolConfig::new(self.max_workers, self.max_queue_size)
            .with_port(self.port)
            .with_request_timeout_ms(non_zero(self.request_timeout_ms))
            .with_stats_interval_ms(non_zero(self.stats_interval_ms))
            .with_big_task_url(self.big_task_url)
    }
}

fn non_zero(ms: u64) -> Option<u64> {
    (ms > 0).then_some(ms)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    config.validate()?;

    tracing::info!(
        max_workers = config.max_workers,
        max_queue_size = config.max_queue_size,
        port = config.port,
        "Starting worker pool"
    );

    let shutdown = install_shutdown_handler()?;
    let (queue, dispatcher) = start_pool(&config)?;
    stats::log_stats(&stats::global());

    let reporter = config.stats_interval_ms.map(|ms| {
        stats::spawn_reporter(
            stats::global(),
            Duration::from_millis(ms),
            shutdown.clone(),
        )
    });

    let state = ApiState {
        queue,
        heavy_task: Arc::new(HeavyTask::new()),
        big_task: Arc::new(BigTask::new(&config.big_task)?),
        request_timeout: config.request_timeout_ms.map(Duration::from_millis),
    };

    let served = run_api(config.listen_addr(), state, shutdown.clone()).await;

    shutdown.cancel();
    dispatcher.shutdown().await;
    if let Some(reporter) = reporter {
        if let Err(e) = reporter.await {
            tracing::error!(error = %e, "Stats reporter failed");
        }
    }

    served?;
    Ok(())
}
