//! In-flight job gauge and process statistics.
//!
//! The gauge is purely observational. Nothing in the pool reads it to make
//! scheduling decisions.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

static GLOBAL_GAUGE: OnceLock<Arc<InFlightGauge>> = OnceLock::new();

/// The process-wide gauge. Starts at zero.
pub fn global() -> Arc<InFlightGauge> {
    GLOBAL_GAUGE
        .get_or_init(|| Arc::new(InFlightGauge::new()))
        .clone()
}

/// Count of jobs currently executing.
#[derive(Debug, Default)]
pub struct InFlightGauge {
    count: AtomicI64,
}

impl InFlightGauge {
    pub const fn new() -> Self {
        Self {
            count: AtomicI64::new(0),
        }
    }

    /// Returns the new value.
    pub fn increment(&self) -> i64 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the new value.
    pub fn decrement(&self) -> i64 {
        self.count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn current(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }
}

/// Memory figures for this process, in KiB. Zero when the platform does not
/// expose them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub resident_kib: u64,
    pub peak_resident_kib: u64,
    pub virtual_kib: u64,
    pub threads: u64,
}

impl MemoryStats {
    pub fn read() -> Self {
        std::fs::read_to_string("/proc/self/status")
            .map(|status| Self::parse(&status))
            .unwrap_or_default()
    }

    /// Parse the `/proc/<pid>/status` format.
    pub fn parse(status: &str) -> Self {
        let mut stats = Self::default();
        for line in status.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let number = value
                .split_whitespace()
                .next()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            match key {
                "VmRSS" => stats.resident_kib = number,
                "VmHWM" => stats.peak_resident_kib = number,
                "VmSize" => stats.virtual_kib = number,
                "Threads" => stats.threads = number,
                _ => {}
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    pub in_flight: i64,
    pub memory: MemoryStats,
}

impl StatsSnapshot {
    pub fn capture(gauge: &InFlightGauge) -> Self {
        Self {
            in_flight: gauge.current(),
            memory: MemoryStats::read(),
        }
    }
}

/// Log a snapshot of the gauge and process memory.
pub fn log_stats(gauge: &InFlightGauge) {
    let snapshot = StatsSnapshot::capture(gauge);
    tracing::info!(
        in_flight = snapshot.in_flight,
        rss_mib = snapshot.memory.resident_kib / 1024,
        peak_rss_mib = snapshot.memory.peak_resident_kib / 1024,
        vm_mib = snapshot.memory.virtual_kib / 1024,
        threads = snapshot.memory.threads,
        "Stats"
    );
}

/// Log a snapshot every `interval` until `token` is cancelled.
pub fn spawn_reporter(
    gauge: Arc<InFlightGauge>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => log_stats(&gauge),
                _ = token.cancelled() => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "Name:\tworkpool-lite\n\
                          VmHWM:\t   20480 kB\n\
                          VmRSS:\t   10240 kB\n\
                          VmSize:\t  204800 kB\n\
                          Threads:\t9\n";

    #[test]
    fn gauge_counts_up_and_down() {
        let gauge = InFlightGauge::new();
        assert_eq!(gauge.increment(), 1);
        assert_eq!(gauge.increment(), 2);
        assert_eq!(gauge.decrement(), 1);
        assert_eq!(gauge.current(), 1);
    }

    #[test]
    fn global_gauge_is_shared() {
        assert!(Arc::ptr_eq(&global(), &global()));
    }

    #[test]
    fn parse_proc_status() {
        let stats = MemoryStats::parse(STATUS);
        assert_eq!(stats.resident_kib, 10240);
        assert_eq!(stats.peak_resident_kib, 20480);
        assert_eq!(stats.virtual_kib, 204800);
        assert_eq!(stats.threads, 9);
    }

    #[test]
    fn parse_ignores_garbage() {
        assert_eq!(MemoryStats::parse("nonsense\nVmRSS: lots\n"), MemoryStats::default());
    }

    #[tokio::test]
    async fn reporter_stops_on_cancel() {
        let token = CancellationToken::new();
        let handle = spawn_reporter(
            Arc::new(InFlightGauge::new()),
            Duration::from_millis(5),
            token.clone(),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        handle.await.unwrap();
    }
}
