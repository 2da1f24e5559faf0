//! Daemon health reporting.
//!
//! The orchestrator periodically polls the pipeline's `health_check()` and
//! logs a [`DaemonHealth`] snapshot. Each snapshot also refreshes the uptime
//! gauge so Prometheus scrapes stay current.

use std::fmt;

use logtide_core::pipeline::HealthStatus;
use logtide_log_pipeline::PipelineStats;

/// Point-in-time health report for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonHealth {
    /// Pipeline health as reported by `Pipeline::health_check`.
    pub status: HealthStatus,
    /// Daemon uptime in seconds since start.
    pub uptime_secs: u64,
    /// Input streams that have not finished yet.
    pub active_streams: usize,
    /// Records read by streams that already finished.
    pub records_read: u64,
    /// Records dropped by streams that already finished.
    pub record_errors: u64,
}

impl DaemonHealth {
    /// Build a report from the pipeline status and the stats merged so far.
    pub fn new(
        status: HealthStatus,
        uptime_secs: u64,
        active_streams: usize,
        stats: &PipelineStats,
    ) -> Self {
        Self {
            status,
            uptime_secs,
            active_streams,
            records_read: stats.records_read,
            record_errors: stats.total_errors(),
        }
    }

    /// Share of finished records that were dropped, in `[0, 1]`.
    pub fn error_ratio(&self) -> f64 {
        if self.records_read == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.record_errors as f64 / self.records_read as f64;
        ratio.min(1.0)
    }

    /// Emit the report at a level matching its status.
    pub fn log(&self) {
        match &self.status {
            HealthStatus::Healthy => tracing::debug!(
                uptime_secs = self.uptime_secs,
                active_streams = self.active_streams,
                records_read = self.records_read,
                record_errors = self.record_errors,
                "daemon healthy"
            ),
            HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => tracing::warn!(
                uptime_secs = self.uptime_secs,
                active_streams = self.active_streams,
                status = %self.status,
                reason = %reason,
                "daemon health degraded"
            ),
        }
    }
}

impl fmt::Display for DaemonHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (uptime {}s, {} active streams, {}/{} records dropped)",
            self.status, self.uptime_secs, self.active_streams, self.record_errors, self.records_read
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(read: u64) -> PipelineStats {
        let mut stats = PipelineStats::default();
        stats.records_read = read;
        stats
    }

    #[test]
    fn error_ratio_is_zero_without_records() {
        let health = DaemonHealth::new(HealthStatus::Healthy, 3, 1, &stats(0));
        assert_eq!(health.error_ratio(), 0.0);
    }

    #[test]
    fn display_includes_status_and_counts() {
        let health = DaemonHealth::new(
            HealthStatus::Degraded("no active streams".to_owned()),
            42,
            0,
            &stats(10),
        );
        let text = health.to_string();
        assert!(text.starts_with("degraded: no active streams"));
        assert!(text.contains("uptime 42s"));
        assert!(text.contains("0/10 records dropped"));
    }
}
