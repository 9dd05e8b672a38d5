use std::net::SocketAddr;

use crate::error::{PoolError, Result};

pub const DEFAULT_MAX_WORKERS: usize = 5;
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;
pub const DEFAULT_PORT: u16 = 8080;

/// Settings for the sample `BigTask`.
#[derive(Debug, Clone)]
pub struct BigTaskConfig {
    /// Endpoint the product is POSTed to
    pub url: String,
    /// Whole-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl Default for BigTaskConfig {
    fn default() -> Self {
        Self {
            url: "https://dummyjson.com/products/add".to_string(),
            timeout_ms: 60_000,
            accept_invalid_certs: true,
        }
    }
}

/// Process configuration. Read once at start; nothing is reconfigured at runtime.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of workers, and so the maximum number of jobs executing at once
    pub max_workers: usize,
    /// Capacity of the job queue. Submitters wait once it is full.
    pub max_queue_size: usize,
    /// Port of the HTTP boundary layer
    pub port: u16,
    /// How long an HTTP handler waits for a job result before answering 504.
    /// `None` waits forever.
    pub request_timeout_ms: Option<u64>,
    /// Period of the background stats reporter. `None` disables it.
    pub stats_interval_ms: Option<u64>,
    pub big_task: BigTaskConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            port: DEFAULT_PORT,
            request_timeout_ms: Some(10_000),
            stats_interval_ms: None,
            big_task: BigTaskConfig::default(),
        }
    }
}

impl PoolConfig {
    pub fn new(max_workers: usize, max_queue_size: usize) -> Self {
        Self {
            max_workers,
            max_queue_size,
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_stats_interval_ms(mut self, interval_ms: Option<u64>) -> Self {
        self.stats_interval_ms = interval_ms;
        self
    }

    pub fn with_big_task_url(mut self, url: String) -> Self {
        self.big_task.url = url;
        self
    }

    /// Address the HTTP layer binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Reject sizes the channels cannot be built with.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(PoolError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.max_queue_size == 0 {
            return Err(PoolError::InvalidConfig(
                "max_queue_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
