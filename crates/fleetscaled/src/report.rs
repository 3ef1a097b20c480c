//! CPU reporter. Runs on each fleet member and posts its idle percentage.
//!
//! Idle percentage is sampled from the aggregate `cpu` line of `/proc/stat`
//! over a short window, matching what `vmstat` reports in its `id` column.

use std::time::Duration;

use anyhow::{Context, bail};
use fleetscale_core::epoch_secs;
use tracing::{info, warn};

use crate::intake::TelemetryReport;

const PROC_STAT: &str = "/proc/stat";
const PROC_HOSTNAME: &str = "/proc/sys/kernel/hostname";

/// Cumulative jiffies from the aggregate cpu line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

/// Parse the `cpu  user nice system idle iowait irq softirq steal ...` line.
pub fn parse_cpu_line(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let idle = *fields.get(3)?;
    // guest and guest_nice (fields 9 and 10) are already counted in user/nice.
    let total = fields.iter().take(8).sum();
    Some(CpuTimes { idle, total })
}

/// Idle percentage between two samples, rounded down.
pub fn idle_percent(before: CpuTimes, after: CpuTimes) -> i64 {
    let total = after.total.saturating_sub(before.total);
    if total == 0 {
        return 100;
    }
    let idle = after.idle.saturating_sub(before.idle);
    (idle * 100 / total) as i64
}

async fn read_cpu_times() -> anyhow::Result<CpuTimes> {
    let stat = tokio::fs::read_to_string(PROC_STAT)
        .await
        .with_context(|| format!("reading {PROC_STAT}"))?;
    match parse_cpu_line(&stat) {
        Some(times) => Ok(times),
        None => bail!("no aggregate cpu line in {PROC_STAT}"),
    }
}

/// Sample idle percentage over `window`.
pub async fn sample_idle(window: Duration) -> anyhow::Result<i64> {
    let before = read_cpu_times().await?;
    tokio::time::sleep(window).await;
    let after = read_cpu_times().await?;
    Ok(idle_percent(before, after))
}

/// This machine's hostname, as used for the telemetry routing key.
pub async fn local_hostname() -> anyhow::Result<String> {
    let name = tokio::fs::read_to_string(PROC_HOSTNAME)
        .await
        .with_context(|| format!("reading {PROC_HOSTNAME}"))?;
    Ok(name.trim().to_string())
}

pub struct Reporter {
    client: reqwest::Client,
    endpoint: String,
    host: String,
}

impl Reporter {
    pub fn new(endpoint: &str, host: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/v1/telemetry", endpoint.trim_end_matches('/')),
            host,
        })
    }

    /// Sample once and post the reading.
    pub async fn report_once(&self) -> anyhow::Result<i64> {
        let reading = sample_idle(Duration::from_secs(1)).await?;
        let report = TelemetryReport {
            host: self.host.clone(),
            reading,
            timestamp: Some(epoch_secs()),
        };
        self.client
            .post(&self.endpoint)
            .json(&report)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("posting to {}", self.endpoint))?;
        info!(host = %self.host, reading, "sent CPU idle reading");
        Ok(reading)
    }

    /// Report every `interval` until the process is stopped. Failed reports
    /// are logged and the loop continues.
    pub async fn run(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.report_once().await {
                warn!(error = %e, "telemetry report failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aggregate_line() {
        let stat = "cpu  100 0 50 800 20 0 30 0 0 0\ncpu0 50 0 25 400 10 0 15 0 0 0\n";
        let times = parse_cpu_line(stat).unwrap();
        assert_eq!(times.idle, 800);
        assert_eq!(times.total, 1000);
    }

    #[test]
    fn short_kernel_line_is_accepted() {
        // Older kernels report only four fields.
        let times = parse_cpu_line("cpu  10 0 10 80\n").unwrap();
        assert_eq!(times, CpuTimes { idle: 80, total: 100 });
    }

    #[test]
    fn missing_or_garbled_line_is_none() {
        assert!(parse_cpu_line("intr 12345\n").is_none());
        assert!(parse_cpu_line("cpu  a b c d\n").is_none());
    }

    #[test]
    fn idle_percent_over_window() {
        let before = CpuTimes { idle: 800, total: 1000 };
        let after = CpuTimes { idle: 867, total: 1100 };
        assert_eq!(idle_percent(before, after), 67);
    }

    #[test]
    fn idle_percent_without_progress_is_fully_idle() {
        let t = CpuTimes { idle: 5, total: 10 };
        assert_eq!(idle_percent(t, t), 100);
    }

    #[test]
    fn reporter_targets_telemetry_route() {
        let r = Reporter::new("http://balancer:9100/", "web01".to_string()).unwrap();
        assert_eq!(r.endpoint, "http://balancer:9100/v1/telemetry");
    }
}
