//! Throttled download progress reporting.

use std::time::{Duration, Instant};

/// Progress snapshot during a download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected (if known from Content-Length header).
    pub total_bytes: Option<u64>,
    /// Progress percentage (0.0 to 100.0), or None if total is unknown.
    pub percent: Option<f64>,
    /// Time since the transfer started.
    pub elapsed: Duration,
    /// Throughput since the previous report.
    pub bytes_per_second: f64,
}

impl DownloadProgress {
    /// One-line human summary, e.g. `Progress: 42.0% (120MB) 3.5MB/s`
    pub fn summary(&self) -> String {
        let percent = self
            .percent
            .map_or_else(|| "unknown".to_string(), |p| format!("{p:.1}%"));
        format!(
            "Progress: {} ({}MB) {:.1}MB/s {}s",
            percent,
            self.bytes_downloaded / 1024 / 1024,
            self.bytes_per_second / 1024.0 / 1024.0,
            self.elapsed.as_secs()
        )
    }
}

/// Turns a stream of byte counts into at most one report per interval.
#[derive(Debug)]
pub struct ProgressTracker {
    total_bytes: Option<u64>,
    interval: Duration,
    started: Instant,
    last_report: Instant,
    last_bytes: u64,
}

impl ProgressTracker {
    /// Start tracking a transfer of `total_bytes` (if known) at `now`
    pub fn new(total_bytes: Option<u64>, interval: Duration, now: Instant) -> Self {
        Self {
            total_bytes,
            interval,
            started: now,
            last_report: now,
            last_bytes: 0,
        }
    }

    /// Record the running byte count; returns a report when the interval has elapsed.
    pub fn update(&mut self, bytes_downloaded: u64, now: Instant) -> Option<DownloadProgress> {
        if now.duration_since(self.last_report) < self.interval {
            return None;
        }
        Some(self.snapshot(bytes_downloaded, now))
    }

    /// Final report, emitted regardless of the interval
    pub fn finish(&mut self, bytes_downloaded: u64, now: Instant) -> DownloadProgress {
        self.snapshot(bytes_downloaded, now)
    }

    fn snapshot(&mut self, bytes_downloaded: u64, now: Instant) -> DownloadProgress {
        let window = now.duration_since(self.last_report).as_secs_f64();
        let delta = bytes_downloaded.saturating_sub(self.last_bytes) as f64;
        let bytes_per_second = if window > 0.0 { delta / window } else { 0.0 };

        self.last_report = now;
        self.last_bytes = bytes_downloaded;

        let percent = self.total_bytes.filter(|t| *t > 0).map(|total| {
            (bytes_downloaded as f64 / total as f64) * 100.0
        });

        DownloadProgress {
            bytes_downloaded,
            total_bytes: self.total_bytes,
            percent,
            elapsed: now.duration_since(self.started),
            bytes_per_second,
        }
    }
}
